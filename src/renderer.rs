//! Orchestrates the ambient/per-light/final pass structure,
//! active-light selection, per-light and per-object scissors, and the
//! stencil shadow-volume state machine that ties the culler, the shadow
//! volume builder and the two caches together.

use glam::{Mat4, Vec3, Vec4};

use crate::bounds::Sphere;
use crate::cache::{CacheEntry, IndexBufferHandle as CacheIndexHandle, ModelCacheKey, ModelShadowVolumeCache, ObjectCacheKey, ObjectShadowVolumeCache};
use crate::context::RenderContext;
use crate::culler::Culler;
use crate::frustum::{Frustum, ScissorsRect};
use crate::gpu::{BlendMode, DepthFunc, GpuDriver, IndexWidth, ShaderManager, StencilFace, StencilFunc, StencilOp};
use crate::light::{Light, LightId, LightKind};
use crate::scene::{Object, ObjectFlags, ObjectId, Scene};
use crate::shadow::builder::{build_shadow_volume, EncodingCapabilities, RenderType};
use crate::stats::RenderStats;

/// Ambient/final passes pull the far plane in slightly so stencil-volume
/// depth writes during lighting passes can win ties. Preserve the exact
/// ladder (0.99999, 0.99998, 1.0).
pub const DEPTH_RANGE_AMBIENT_FINAL: (f32, f32) = (0.0, 0.99999);
pub const DEPTH_RANGE_LIGHTING_DEPTHFAIL: (f32, f32) = (0.0, 0.99998);
pub const DEPTH_RANGE_DEFAULT: (f32, f32) = (0.0, 1.0);

/// Fraction of the viewport area below which per-object geometry scissors
/// are considered worth computing for a light.
pub const GEOMETRY_SCISSORS_LIGHT_AREA_THRESHOLD: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMode {
    None,
    ShadowVolumes,
    ShadowMapping,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderFlags {
    pub multi_pass_rendering: bool,
    pub shadows: ShadowMode,
    pub light_object_lists_enabled: bool,
    pub geometry_scissors_active: bool,
    pub force_depth_fail: bool,
    pub shadow_volume_visibility_test: bool,
    pub shadow_cache_enabled: bool,
    pub geometry_scissors_cache_enabled: bool,
    pub use_triangle_strips_for_shadow_volumes: bool,
    pub use_triangle_fans_for_shadow_volumes: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        RenderFlags {
            multi_pass_rendering: true,
            shadows: ShadowMode::ShadowVolumes,
            light_object_lists_enabled: true,
            geometry_scissors_active: true,
            force_depth_fail: false,
            shadow_volume_visibility_test: true,
            shadow_cache_enabled: true,
            geometry_scissors_cache_enabled: true,
            use_triangle_strips_for_shadow_volumes: true,
            use_triangle_fans_for_shadow_volumes: true,
        }
    }
}

/// Maximum number of lights that get their own per-light pass before
/// active-light selection kicks in.
pub const MAX_ACTIVE_LIGHTS: usize = 8;

pub struct Renderer {
    pub flags: RenderFlags,
    pub culler: Culler,
    pub object_cache: ObjectShadowVolumeCache,
    pub model_cache: ModelShadowVolumeCache,
    pub stats: RenderStats,
    ctx: RenderContext,
}

impl Renderer {
    pub fn new(flags: RenderFlags) -> Self {
        let mut stats = RenderStats::default();
        stats.object_cache.total_slots = crate::cache::OBJECT_CACHE_SIZE as u32;
        stats.model_cache.total_slots = crate::cache::MODEL_CACHE_SIZE as u32;
        Self {
            flags,
            culler: Culler::new(),
            object_cache: ObjectShadowVolumeCache::new(),
            model_cache: ModelShadowVolumeCache::new(),
            stats,
            ctx: RenderContext::new(0),
        }
    }

    /// Depending on global flags, selects one of: single-pass (one
    /// most-prominent light, no shadows), multi-pass no-shadow, multi-pass
    /// stencil shadow volumes, multi-pass shadow mapping. Shadow mapping
    /// itself is out of scope — selecting it degrades to the no-shadow
    /// multi-pass flow, since the map-rendering collaborator lives entirely
    /// on the host side of the GPU-driver boundary.
    pub fn render<D: GpuDriver, S: ShaderManager>(&mut self, scene: &mut Scene, view: Mat4, proj: Mat4, near: f32, far: f32, viewpoint: Vec3, current_frame: u64, driver: &mut D, shaders: &mut S) {
        self.ctx.current_frame = current_frame;
        let frustum = Frustum::from_matrices(view, proj, near, far, current_frame);
        self.culler.determine_visible_entities(scene, &frustum, viewpoint, current_frame);

        if !self.flags.multi_pass_rendering {
            self.render_single_pass(scene, viewpoint, driver, shaders);
            return;
        }

        self.render_ambient_pass(scene, driver, shaders);

        let active_lights = self.select_active_lights(scene, viewpoint);
        for light_id in active_lights {
            self.render_light_pass(scene, &frustum, light_id, driver, shaders);
        }

        self.render_final_pass(scene, viewpoint, driver, shaders);
    }

    fn render_single_pass<D: GpuDriver, S: ShaderManager>(&mut self, scene: &Scene, viewpoint: Vec3, driver: &mut D, shaders: &mut S) {
        let best_light = self.select_single_most_prominent_light(scene, viewpoint);
        driver.set_depth_test(true);
        driver.set_depth_mask(true);
        driver.set_depth_func(DepthFunc::Less);
        driver.set_depth_range(DEPTH_RANGE_DEFAULT.0, DEPTH_RANGE_DEFAULT.1);
        shaders.init_shaders_before_frame();
        if let Some(light_id) = best_light {
            shaders.init_shaders_before_light(&scene.lights[light_id.0 as usize]);
        }
        for &object_id in &self.culler.visible_object {
            let object = &scene.objects[object_id.0 as usize];
            if let Some(light_id) = best_light {
                shaders.draw_object_single_pass(object, &scene.lights[light_id.0 as usize]);
            } else {
                shaders.draw_object_ambient_pass(object);
            }
        }
    }

    fn render_ambient_pass<D: GpuDriver, S: ShaderManager>(&mut self, scene: &Scene, driver: &mut D, shaders: &mut S) {
        self.ctx.current_light_index = -1;
        driver.bind_framebuffer_default();
        driver.clear(true, true, true);
        driver.set_depth_test(true);
        driver.set_depth_mask(true);
        driver.set_depth_func(DepthFunc::Less);
        driver.set_depth_range(DEPTH_RANGE_AMBIENT_FINAL.0, DEPTH_RANGE_AMBIENT_FINAL.1);
        driver.set_blend(BlendMode::None);
        driver.set_stencil_test(false);
        driver.set_scissor_test(false);
        shaders.init_shaders_before_frame();
        for &object_id in &self.culler.visible_object {
            shaders.draw_object_ambient_pass(&scene.objects[object_id.0 as usize]);
        }
    }

    /// Active-light selection: full priority sort, except when only one
    /// slot is available, where a linear min-reduction replaces the sort.
    fn select_active_lights(&self, scene: &Scene, viewpoint: Vec3) -> Vec<LightId> {
        let mut candidates = self.culler.visible_light.clone();
        if candidates.len() <= MAX_ACTIVE_LIGHTS {
            return candidates;
        }
        if MAX_ACTIVE_LIGHTS == 1 {
            let best = candidates
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    let ka = crate::light::light_priority_key(&scene.lights[a.0 as usize], viewpoint);
                    let kb = crate::light::light_priority_key(&scene.lights[b.0 as usize], viewpoint);
                    // min_by picks smallest; priority is "higher is better" so reverse.
                    crate::light::compare_light_priority(&kb, &ka)
                })
                .unwrap();
            return vec![best];
        }
        candidates.sort_by(|&a, &b| {
            let ka = crate::light::light_priority_key(&scene.lights[a.0 as usize], viewpoint);
            let kb = crate::light::light_priority_key(&scene.lights[b.0 as usize], viewpoint);
            crate::light::compare_light_priority(&kb, &ka)
        });
        candidates.truncate(MAX_ACTIVE_LIGHTS);
        candidates
    }

    fn select_single_most_prominent_light(&self, scene: &Scene, viewpoint: Vec3) -> Option<LightId> {
        self.culler
            .visible_light
            .iter()
            .copied()
            .max_by(|&a, &b| {
                let ka = crate::light::light_priority_key(&scene.lights[a.0 as usize], viewpoint);
                let kb = crate::light::light_priority_key(&scene.lights[b.0 as usize], viewpoint);
                crate::light::compare_light_priority(&ka, &kb)
            })
    }

    fn render_light_pass<D: GpuDriver, S: ShaderManager>(&mut self, scene: &mut Scene, frustum: &Frustum, light_id: LightId, driver: &mut D, shaders: &mut S) {
        self.ctx.current_light_index = light_id.0 as i32;

        let light_scissors = self.compute_light_scissors(&scene.lights[light_id.0 as usize], frustum);
        if light_scissors.is_none() {
            self.advance_geometry_scissors_cursors_as_skipped(scene, light_id);
            return;
        }
        let light_scissors = light_scissors.unwrap();

        let area = (light_scissors.right - light_scissors.left) * (light_scissors.top - light_scissors.bottom);
        let use_geometry_scissors = self.flags.geometry_scissors_active && area < GEOMETRY_SCISSORS_LIGHT_AREA_THRESHOLD;

        shaders.init_shaders_before_light(&scene.lights[light_id.0 as usize]);
        driver.set_blend(BlendMode::Additive);
        driver.set_depth_mask(false);
        driver.set_scissor_test(true);
        driver.set_scissor(light_scissors);

        if matches!(self.flags.shadows, ShadowMode::ShadowVolumes) {
            self.render_shadow_volumes_for_light(scene, frustum, light_id, driver);
            driver.set_depth_func(DepthFunc::Equal);
        } else {
            driver.set_depth_func(DepthFunc::LessEqual);
        }

        let object_ids: Vec<ObjectId> = self.culler.visible_object.clone();
        for object_id in object_ids {
            let in_volume = {
                let object = &scene.objects[object_id.0 as usize];
                let light = &scene.lights[light_id.0 as usize];
                // A shrinking worst-case-bounded light reuses its static
                // `light_volume_object` list across frames; re-check against
                // its current tight sphere rather than the broad one.
                if light.worst_case_sphere.is_some() {
                    Culler::object_still_in_tight_light_volume(object, light)
                } else {
                    object_intersects_light_volume(object, light)
                }
            };
            if !in_volume {
                continue;
            }

            if use_geometry_scissors {
                let scissors = self.per_object_geometry_scissors(scene, frustum, object_id, light_id, &light_scissors);
                match scissors {
                    None => continue,
                    Some(rect) => driver.set_scissor(rect),
                }
            }

            let object = &scene.objects[object_id.0 as usize];
            shaders.draw_object_multi_pass_lighting_pass(object, &scene.lights[light_id.0 as usize]);
        }

        driver.set_scissor_test(false);
        driver.set_depth_func(DepthFunc::Less);
    }

    /// Projects the light's bounding hull into a scissors rectangle
    /// plus depth bounds; `None` means the light contributes nothing this
    /// frame and should be skipped.
    fn compute_light_scissors(&self, light: &Light, frustum: &Frustum) -> Option<ScissorsRect> {
        if light.is_directional() {
            return Some(ScissorsRect { left: 0.0, right: 1.0, bottom: 0.0, top: 1.0, depth_near: 0.0, depth_far: 1.0 });
        }
        let sphere = light.primary_bounds.sphere?;
        let rect = project_sphere_to_scissors(&sphere, frustum)?;
        if rect.is_empty_region() {
            None
        } else {
            Some(rect)
        }
    }

    /// Per-object lighting draw, geometry-scissors-active entry
    /// point: intersect the object's bounds with the light's bounds; skip on
    /// empty; tighten on proper subset; otherwise fall back to the light
    /// scissors. Cache the tightened result per (static light, static
    /// object) once the frustum has been stable, and reuse it verbatim on a
    /// later stable-frustum frame instead of recomputing.
    fn per_object_geometry_scissors(&mut self, scene: &mut Scene, frustum: &Frustum, object_id: ObjectId, light_id: LightId, light_scissors: &ScissorsRect) -> Option<ScissorsRect> {
        if self.flags.geometry_scissors_cache_enabled {
            let object = &scene.objects[object_id.0 as usize];
            if let Some(slot) = object.scissors_cache_slot(light_id) {
                let cached = object.geometry_scissors_cache[slot].scissors;
                let stable = object.geometry_scissors_cache_timestamp == frustum.most_recent_frame_changed;
                if stable && !cached.is_not_computed() {
                    return decode_cached_scissors(cached, light_scissors);
                }
            }
        }

        let object_rect = {
            let object = &scene.objects[object_id.0 as usize];
            bounding_sphere_to_scissors(&object.bounding_sphere, light_scissors)
        };

        let tightened = match object_rect.intersect(light_scissors) {
            None => ScissorsRect::OUTSIDE_LIGHT_VOLUME,
            Some(r) if r.is_proper_subset_of(light_scissors) => r,
            Some(_) => ScissorsRect::NO_TIGHTER_SCISSORS,
        };

        if self.flags.geometry_scissors_cache_enabled {
            let object = &mut scene.objects[object_id.0 as usize];
            if let Some(slot) = object.scissors_cache_slot(light_id) {
                object.geometry_scissors_cache[slot].scissors = tightened;
                object.geometry_scissors_cache_timestamp = frustum.most_recent_frame_changed;
            }
        }

        decode_cached_scissors(tightened, light_scissors)
    }

    /// When a static light is skipped for a frame after the frustum
    /// has just changed, the renderer still advances the per-object
    /// geometry-scissors-cache cursors by writing a "not yet computed"
    /// sentinel.
    fn advance_geometry_scissors_cursors_as_skipped(&mut self, scene: &mut Scene, light_id: LightId) {
        for object in &mut scene.objects {
            if let Some(slot) = object.scissors_cache_slot(light_id) {
                object.geometry_scissors_cache[slot].scissors = ScissorsRect::NOT_COMPUTED;
            }
        }
    }

    /// The stencil shadow-volume state machine: for each shadow caster, decide
    /// depth-pass/depth-fail by near-clip-volume containment, consult the
    /// caches, build on miss, and draw the two-sided stencil increments.
    /// Directional/beam lights amortize through the model-identity cache, so
    /// every instance of a shared mesh builds its shadow volume once;
    /// point/spot lights stay on the per-object cache.
    fn render_shadow_volumes_for_light<D: GpuDriver>(&mut self, scene: &mut Scene, frustum: &Frustum, light_id: LightId, driver: &mut D) {
        driver.set_depth_mask(false);
        driver.set_stencil_test(true);
        driver.set_stencil_func(StencilFace::FrontAndBack, StencilFunc::Always, 0, 0xFF);

        let (caster_ids, use_model_cache): (Vec<u32>, bool) = {
            let light = &scene.lights[light_id.0 as usize];
            let caster_ids = light.shadow_caster_object.iter().map(|e| e.index()).collect();
            let use_model_cache = matches!(light.kind, LightKind::Directional | LightKind::Beam);
            (caster_ids, use_model_cache)
        };

        for object_index in caster_ids {
            let (depth_fail, light_xyz, light_w, model_handle) = {
                let object = &scene.objects[object_index as usize];
                let light = &scene.lights[light_id.0 as usize];
                let depth_fail = self.flags.force_depth_fail || object_crosses_near_clip_volume(object, frustum);
                let (light_xyz, light_w) = model_space_light_vector(object, light);
                (depth_fail, light_xyz, light_w, object.model)
            };

            let render_type = if depth_fail {
                RenderType::DepthFail { skip_light_cap: false, skip_dark_cap: false }
            } else {
                RenderType::DepthPass
            };

            if depth_fail {
                driver.set_depth_range(DEPTH_RANGE_LIGHTING_DEPTHFAIL.0, DEPTH_RANGE_LIGHTING_DEPTHFAIL.1);
                driver.set_stencil_op_separate(StencilFace::Front, StencilOp::Keep, StencilOp::IncrWrap, StencilOp::Keep);
                driver.set_stencil_op_separate(StencilFace::Back, StencilOp::Keep, StencilOp::DecrWrap, StencilOp::Keep);
            } else {
                driver.set_depth_range(DEPTH_RANGE_DEFAULT.0, DEPTH_RANGE_DEFAULT.1);
                driver.set_stencil_op_separate(StencilFace::Front, StencilOp::Keep, StencilOp::Keep, StencilOp::IncrWrap);
                driver.set_stencil_op_separate(StencilFace::Back, StencilOp::Keep, StencilOp::Keep, StencilOp::DecrWrap);
            }

            let model_space_light = Vec4::new(light_xyz.x, light_xyz.y, light_xyz.z, light_w);
            let object_key = ObjectCacheKey { object_id: object_index, light_id: light_id.0, model_space_light, render_type };
            let model_key = ModelCacheKey { model: model_handle, light_id: light_id.0, model_space_light, render_type };

            let cache_hit = if self.flags.shadow_cache_enabled {
                if use_model_cache {
                    self.lookup_and_draw_cached_model(&model_key, driver).is_some()
                } else {
                    self.lookup_and_draw_cached(&object_key, driver).is_some()
                }
            } else {
                false
            };

            if self.flags.shadow_cache_enabled && matches!(render_type, RenderType::DepthFail { .. }) {
                if cache_hit {
                    self.stats.depth_fail_hits += 1;
                } else {
                    self.stats.depth_fail_misses += 1;
                }
            }

            if cache_hit {
                continue;
            }

            let model = &scene.models[model_handle.0 as usize];
            let lod = model.lod0();
            let caps = EncodingCapabilities {
                primitive_restart: self.flags.use_triangle_strips_for_shadow_volumes,
            };
            let geometry = build_shadow_volume(&mut self.ctx, lod, &scene.lights[light_id.0 as usize], light_xyz, light_w, render_type, &caps);
            if geometry.is_degenerate() {
                continue;
            }

            let width = if geometry.vertex_count < 0xFFFF { IndexWidth::U16 } else { IndexWidth::U32 };
            let handle = driver.create_index_buffer(&geometry.indices, width);
            driver.bind_index_buffer(handle);
            driver.draw_indexed(geometry.indices.len() as u32, geometry.encoding.contains(crate::shadow::builder::EncodingFlags::TRIANGLE_STRIP));

            if self.flags.shadow_cache_enabled {
                let cache_handle = CacheIndexHandle(handle.0);
                self.stats.total_cached_vertices += geometry.vertex_count as u64;
                let evicted = if use_model_cache {
                    self.model_cache.insert(model_key, cache_handle, &geometry, self.ctx.current_frame, &mut self.stats.model_cache)
                } else {
                    self.object_cache.insert(object_key, cache_handle, &geometry, self.ctx.current_frame, &mut self.stats.object_cache)
                };
                if let Some(evicted) = evicted {
                    self.stats.total_cached_vertices = self.stats.total_cached_vertices.saturating_sub(evicted.vertex_count as u64);
                    driver.destroy_index_buffer(crate::gpu::IndexBufferHandle(evicted.index_buffer.0));
                }
            } else {
                driver.destroy_index_buffer(handle);
            }
        }

        driver.set_depth_range(DEPTH_RANGE_DEFAULT.0, DEPTH_RANGE_DEFAULT.1);
    }

    fn lookup_and_draw_cached<D: GpuDriver>(&mut self, key: &ObjectCacheKey, driver: &mut D) -> Option<CacheEntry<ObjectCacheKey>> {
        let frame = self.ctx.current_frame;
        let entry = self.object_cache.lookup(key, frame, &mut self.stats.object_cache)?.clone();
        driver.bind_index_buffer(crate::gpu::IndexBufferHandle(entry.index_buffer.0));
        driver.draw_indexed(entry.vertex_count, entry.encoding.contains(crate::shadow::builder::EncodingFlags::TRIANGLE_STRIP));
        Some(entry)
    }

    fn lookup_and_draw_cached_model<D: GpuDriver>(&mut self, key: &ModelCacheKey, driver: &mut D) -> Option<CacheEntry<ModelCacheKey>> {
        let frame = self.ctx.current_frame;
        let entry = self.model_cache.lookup(key, frame, &mut self.stats.model_cache)?.clone();
        driver.bind_index_buffer(crate::gpu::IndexBufferHandle(entry.index_buffer.0));
        driver.draw_indexed(entry.vertex_count, entry.encoding.contains(crate::shadow::builder::EncodingFlags::TRIANGLE_STRIP));
        Some(entry)
    }

    fn render_final_pass<D: GpuDriver, S: ShaderManager>(&mut self, scene: &Scene, viewpoint: Vec3, driver: &mut D, shaders: &mut S) {
        driver.set_blend(BlendMode::Additive);
        driver.set_depth_mask(false);
        driver.set_depth_range(DEPTH_RANGE_AMBIENT_FINAL.0, DEPTH_RANGE_AMBIENT_FINAL.1);
        driver.set_stencil_test(false);
        driver.set_scissor_test(false);

        let mut ordered: Vec<ObjectId> = self.culler.final_pass_object.clone();
        // Equal-distance order is left undefined on purpose: ties fall back
        // to whatever `partial_cmp` happens to produce.
        ordered.sort_by(|&a, &b| {
            let sqrdist_a = scene.objects[a.0 as usize].bounding_sphere.center.distance_squared(viewpoint);
            let sqrdist_b = scene.objects[b.0 as usize].bounding_sphere.center.distance_squared(viewpoint);
            sqrdist_b.partial_cmp(&sqrdist_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        for object_id in ordered {
            shaders.draw_object_final_pass(&scene.objects[object_id.0 as usize]);
        }
        driver.set_depth_mask(true);
    }
}

fn object_intersects_light_volume(object: &Object, light: &Light) -> bool {
    match light.primary_bounds.sphere {
        Some(sphere) => crate::bounds::sphere_intersects_aabb(&sphere, &object.aabb) || crate::bounds::sphere_intersects_sphere(&sphere, &object.bounding_sphere),
        None => true,
    }
}

fn object_crosses_near_clip_volume(object: &Object, frustum: &Frustum) -> bool {
    !matches!(frustum.near_clip_volume.test_sphere(&object.bounding_sphere), crate::bounds::Verdict::CompletelyOutside)
}

/// Model-space light vector: `w=0` for directional,
/// `w=1` for point/spot positions, `w=0` with the beam's extrusion vector.
fn model_space_light_vector(object: &Object, light: &Light) -> (Vec3, f32) {
    let world = light.position_or_direction;
    let local = if light.w != 0.0 {
        object.inv_model_matrix.transform_point3(world)
    } else {
        object.inv_model_matrix.transform_vector3(world)
    };
    (local, light.w)
}

/// Conservative screen-space projection of a bounding sphere into a scissors
/// rectangle normalized to `[0,1]` in both axes — the exact viewport mapping
/// is a host/window-integration concern, so the rectangle is
/// expressed in the unit square and the host scales it to pixels.
fn project_sphere_to_scissors(sphere: &Sphere, frustum: &Frustum) -> Option<ScissorsRect> {
    if frustum.near_clip_volume.test_sphere(sphere) == crate::bounds::Verdict::CompletelyOutside {
        return None;
    }
    let center_ndc = frustum.view_proj.project_point3(sphere.center);
    let angular = (sphere.radius / sphere.center.length().max(1e-3)).clamp(0.0, 1.0);
    Some(ScissorsRect {
        left: ((center_ndc.x * 0.5 + 0.5) - angular).clamp(0.0, 1.0),
        right: ((center_ndc.x * 0.5 + 0.5) + angular).clamp(0.0, 1.0),
        bottom: ((center_ndc.y * 0.5 + 0.5) - angular).clamp(0.0, 1.0),
        top: ((center_ndc.y * 0.5 + 0.5) + angular).clamp(0.0, 1.0),
        depth_near: 0.0,
        depth_far: 1.0,
    })
}

/// Maps a geometry-scissors cache slot's sentinel-or-regular value back to
/// the `per_object_geometry_scissors` return convention.
fn decode_cached_scissors(cached: ScissorsRect, light_scissors: &ScissorsRect) -> Option<ScissorsRect> {
    if cached.is_outside_light_volume() {
        None
    } else if cached.is_no_tighter_scissors() {
        Some(*light_scissors)
    } else {
        Some(cached)
    }
}

fn bounding_sphere_to_scissors(sphere: &Sphere, like: &ScissorsRect) -> ScissorsRect {
    let angular = (sphere.radius / sphere.center.length().max(1e-3)).clamp(0.0, 1.0);
    ScissorsRect {
        left: ((sphere.center.x * 0.5 + 0.5) - angular).clamp(0.0, 1.0),
        right: ((sphere.center.x * 0.5 + 0.5) + angular).clamp(0.0, 1.0),
        bottom: ((sphere.center.y * 0.5 + 0.5) - angular).clamp(0.0, 1.0),
        top: ((sphere.center.y * 0.5 + 0.5) + angular).clamp(0.0, 1.0),
        depth_near: like.depth_near,
        depth_far: like.depth_far,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;
    use crate::gpu::test_support::RecordingDriver;
    use crate::light::Attenuation;
    use crate::mesh::{unit_cube, Model};
    use crate::scene::ObjectId;

    struct NullShaders;
    impl ShaderManager for NullShaders {
        fn init_shaders_before_frame(&mut self) {}
        fn init_shaders_before_light(&mut self, _light: &Light) {}
        fn init_shadow_volume_shader(&mut self) {}
        fn draw_object_ambient_pass(&mut self, _object: &Object) {}
        fn draw_object_single_pass(&mut self, _object: &Object, _light: &Light) {}
        fn draw_object_multi_pass_lighting_pass(&mut self, _object: &Object, _light: &Light) {}
        fn draw_object_final_pass(&mut self, _object: &Object) {}
    }

    fn empty_scene_with_directional_light() -> Scene {
        let mut scene = Scene::new(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0)));
        scene.add_directional_light(Vec3::ONE, Vec3::NEG_Y);
        scene.calculate_static_light_object_lists();
        scene
    }

    #[test]
    fn empty_scene_renders_with_no_cache_entries_created() {
        let mut scene = empty_scene_with_directional_light();
        let mut renderer = Renderer::new(RenderFlags::default());
        let mut driver = RecordingDriver::new();
        let mut shaders = NullShaders;
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        renderer.render(&mut scene, view, proj, 0.1, 100.0, Vec3::new(0.0, 0.0, -10.0), 1, &mut driver, &mut shaders);
        assert_eq!(renderer.stats.object_cache.used_slots, 0);
    }

    #[test]
    fn directional_light_shadow_volume_goes_through_model_cache() {
        let mut scene = Scene::new(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0)));
        let model = scene.add_model(Model { lods: vec![unit_cube()] });
        scene.add_object(Object::new(ObjectId(0), model, Mat4::IDENTITY, Sphere::new(Vec3::ZERO, 1.0), Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)), ObjectFlags::CAST_SHADOWS));
        scene.add_directional_light(Vec3::ONE, Vec3::new(0.0, -1.0, 0.0));
        scene.calculate_static_light_object_lists();

        let mut renderer = Renderer::new(RenderFlags::default());
        let mut driver = RecordingDriver::new();
        let mut shaders = NullShaders;
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        renderer.render(&mut scene, view, proj, 0.1, 100.0, Vec3::new(0.0, 0.0, -10.0), 1, &mut driver, &mut shaders);

        assert_eq!(renderer.stats.object_cache.used_slots, 0);
        assert_eq!(renderer.stats.model_cache.used_slots, 1);
        assert_eq!(renderer.stats.depth_fail_hits + renderer.stats.depth_fail_misses, 1);
    }

    #[test]
    fn object_fully_inside_light_sphere_counts_as_intersecting() {
        let model_handle = {
            let mut scene = Scene::new(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0)));
            scene.add_model(Model { lods: vec![unit_cube()] })
        };
        let object = Object::new(
            ObjectId(0),
            model_handle,
            Mat4::IDENTITY,
            Sphere::new(Vec3::ZERO, 1.0),
            Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
            ObjectFlags::CAST_SHADOWS,
        );
        let light = Light::new_point(LightId(0), Vec3::ONE, Vec3::ZERO, Attenuation { linear_range: 1.0, cutoff: 0.01, radial_range: 20.0 });
        assert!(object_intersects_light_volume(&object, &light));
    }
}
