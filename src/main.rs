//! Demo binary: a small scene driven through `lumen_core::Renderer` over a
//! real GL context, to exercise the culling/lighting/shadow-volume pipeline
//! end to end. Everything here — window, input, camera, shader programs,
//! vertex buffers — lives on the host side of the boundary; none of it
//! is part of the crate's public surface.

mod camera;
mod demo_shaders;
mod engine;

use camera::FlyCamera;
use clap::Parser;
use engine::time::FrameTimer;
use engine::window::GameWindow;
use glam::Vec3;

use lumen_core::{gl_backend::GlDriver, Attenuation, Object, ObjectFlags, ObjectId, RenderFlags, Renderer, Scene, ShadowMode};

use demo_shaders::DemoShaders;

#[derive(Parser)]
#[command(name = "lumen_demo", about = "lumen_core rendering demo")]
struct Args {
    /// Disable stencil shadow volumes (multi-pass, no shadows).
    #[arg(long)]
    no_shadows: bool,
    /// Render with the single-pass (one most-prominent light) path.
    #[arg(long)]
    single_pass: bool,
    /// Disable per-object geometry-scissors tightening.
    #[arg(long)]
    no_geometry_scissors: bool,
}

fn build_demo_scene(shaders: &mut DemoShaders) -> Scene {
    let mut scene = Scene::new(lumen_core::Aabb::new(Vec3::splat(-200.0), Vec3::splat(200.0)));

    let cube_model = scene.add_model(lumen_core::Model { lods: vec![lumen_core::unit_cube()] });
    shaders.upload_model(cube_model.0, &scene.models[cube_model.0 as usize]);

    let ground = Object::new(
        ObjectId(0),
        cube_model,
        glam::Mat4::from_scale_rotation_translation(Vec3::new(40.0, 0.2, 40.0), glam::Quat::IDENTITY, Vec3::new(0.0, -1.0, 0.0)),
        lumen_core::Sphere::new(Vec3::new(0.0, -1.0, 0.0), 40.0),
        lumen_core::Aabb::new(Vec3::new(-20.0, -1.1, -20.0), Vec3::new(20.0, -0.9, 20.0)),
        ObjectFlags::CAST_SHADOWS,
    );
    scene.add_object(ground);

    for i in 0..5u32 {
        let x = (i as f32 - 2.0) * 3.0;
        let id = ObjectId(i + 1);
        let center = Vec3::new(x, 0.5, 0.0);
        let object = Object::new(
            id,
            cube_model,
            glam::Mat4::from_translation(center),
            lumen_core::Sphere::new(center, 0.9),
            lumen_core::Aabb::new(center - Vec3::splat(0.5), center + Vec3::splat(0.5)),
            ObjectFlags::CAST_SHADOWS,
        );
        scene.add_object(object);
    }

    scene.add_directional_light(Vec3::new(1.0, 1.0, 0.95), Vec3::new(-0.4, -1.0, -0.3));
    scene.add_point_light(Vec3::new(0.9, 0.4, 0.2), Vec3::new(0.0, 4.0, -2.0), Attenuation { linear_range: 0.2, cutoff: 0.01, radial_range: 25.0 });

    scene.calculate_static_light_object_lists();
    scene
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let sdl = sdl2::init().expect("failed to init SDL2");
    let window = GameWindow::new(&sdl, "lumen_core demo", 1280, 720);

    let mut driver = GlDriver::new();
    let mut shaders = DemoShaders::new().expect("failed to build demo shader programs");
    let mut scene = build_demo_scene(&mut shaders);

    let mut camera = FlyCamera::new(Vec3::new(0.0, 3.0, 12.0));
    let flags = RenderFlags {
        multi_pass_rendering: !args.single_pass,
        shadows: if args.no_shadows { ShadowMode::None } else { ShadowMode::ShadowVolumes },
        geometry_scissors_active: !args.no_geometry_scissors,
        ..RenderFlags::default()
    };
    let mut renderer = Renderer::new(flags);

    let mut input = engine::input::InputState::new();
    let mut timer = FrameTimer::new();
    let mut event_pump = sdl.event_pump().expect("failed to get event pump");
    sdl.mouse().set_relative_mouse_mode(true);

    let mut frame: u64 = 0;
    loop {
        timer.tick();
        input.update(&mut event_pump);
        if input.should_quit() {
            break;
        }
        camera.look(input.mouse_dx, input.mouse_dy);
        camera.move_wasd(&input, timer.dt);

        let aspect = window.aspect_ratio();
        let view = camera.view_matrix();
        let proj = camera.projection_matrix(aspect);
        shaders.set_view_proj(proj * view);

        frame += 1;
        renderer.render(&mut scene, view, proj, 0.1, 1000.0, camera.position, frame, &mut driver, &mut shaders);

        window.swap();

        if frame % 120 == 0 {
            log::info!(
                "frame {frame}: object cache used={} hits={} misses={} ({:.0}% hit)",
                renderer.stats.object_cache.used_slots,
                renderer.stats.object_cache.hits,
                renderer.stats.object_cache.misses,
                renderer.stats.object_cache.hit_ratio() * 100.0,
            );
        }
    }
}
