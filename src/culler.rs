//! Traverses the scene's octrees against the view frustum and produces
//! `visible_object`, `visible_light` and `final_pass_object` lists,
//! with incremental recomputation when the frustum hasn't changed.

use crate::bounds::{sphere_intersects_aabb, sphere_intersects_sphere, Sphere, Verdict};
use crate::frustum::Frustum;
use crate::octree::projected_size;
use crate::scene::{Object, ObjectFlags, ObjectId, Scene};
use crate::light::{Light, LightId};

/// Below this projected size an object is culled regardless of frustum
/// containment.
pub const OBJECT_SIZE_CUTOFF: f32 = 0.002;
pub const LIGHT_VOLUME_SIZE_CUTOFF: f32 = 0.0005;

#[derive(Debug, Default, Clone, Copy)]
pub struct CullCounts {
    pub nu_static_visible_objects: usize,
    pub nu_static_final_pass_objects: usize,
    pub nu_static_visible_lights: usize,
}

#[derive(Default)]
pub struct Culler {
    pub visible_object: Vec<ObjectId>,
    pub final_pass_object: Vec<ObjectId>,
    pub visible_light: Vec<LightId>,

    static_counts: CullCounts,
    last_processed_frustum_frame: u64,
}

impl Culler {
    pub fn new() -> Self {
        Self::default()
    }

    /// If the frustum hasn't changed since the last full traversal,
    /// keep the static-prefix lists (truncated to the counts captured during
    /// the last full run) and only re-walk the dynamic/infinite-distance
    /// octrees' root nodes.
    pub fn determine_visible_entities(&mut self, scene: &mut Scene, frustum: &Frustum, viewpoint: glam::Vec3, current_frame: u64) {
        let reuse_static_prefix = frustum.most_recent_frame_changed < current_frame && self.last_processed_frustum_frame != 0;

        if reuse_static_prefix {
            self.visible_object.truncate(self.static_counts.nu_static_visible_objects);
            self.final_pass_object.truncate(self.static_counts.nu_static_final_pass_objects);
            self.visible_light.truncate(self.static_counts.nu_static_visible_lights);
        } else {
            self.visible_object.clear();
            self.final_pass_object.clear();
            self.visible_light.clear();

            let hull = frustum.hull();
            {
                let static_octree = &scene.static_octree;
                let objects = &mut scene.objects;
                static_octree.traverse(&hull, viewpoint, false, |entity, verdict| {
                    if entity.is_object() {
                        self.classify_object(&mut objects[entity.index() as usize], verdict, viewpoint, current_frame);
                    }
                });
            }
            {
                let infinite_static_octree = &scene.infinite_static_octree;
                let objects = &mut scene.objects;
                infinite_static_octree.root_entities(|entity| {
                    if entity.is_object() {
                        self.classify_object(&mut objects[entity.index() as usize], Verdict::PartiallyInside, viewpoint, current_frame);
                    }
                });
            }
            self.cull_lights_root(&scene.lights, &hull, viewpoint, false);

            self.static_counts = CullCounts {
                nu_static_visible_objects: self.visible_object.len(),
                nu_static_final_pass_objects: self.final_pass_object.len(),
                nu_static_visible_lights: self.visible_light.len(),
            };
        }

        let hull = frustum.hull();
        {
            let dynamic_octree = &scene.dynamic_octree;
            let objects = &mut scene.objects;
            dynamic_octree.root_entities(|entity| {
                if entity.is_object() {
                    let index = entity.index() as usize;
                    let verdict = hull.test_aabb(&objects[index].aabb);
                    self.classify_object(&mut objects[index], verdict, viewpoint, current_frame);
                }
            });
        }
        {
            let infinite_dynamic_octree = &scene.infinite_dynamic_octree;
            let objects = &mut scene.objects;
            infinite_dynamic_octree.root_entities(|entity| {
                if entity.is_object() {
                    self.classify_object(&mut objects[entity.index() as usize], Verdict::PartiallyInside, viewpoint, current_frame);
                }
            });
        }
        self.cull_lights_root(&scene.lights, &hull, viewpoint, true);

        self.last_processed_frustum_frame = current_frame;
    }

    fn classify_object(&mut self, object: &mut Object, verdict: Verdict, viewpoint: glam::Vec3, current_frame: u64) {
        if verdict.is_outside() {
            return;
        }
        if object.flags.contains(ObjectFlags::HIDDEN) {
            return;
        }
        let size = projected_size(object.bounding_sphere.center, object.bounding_sphere.radius, viewpoint);
        if size < OBJECT_SIZE_CUTOFF {
            return;
        }

        let final_pass = object.flags.intersects(ObjectFlags::EMISSION_ONLY | ObjectFlags::LIGHT_HALO | ObjectFlags::PARTICLE_SYSTEM);
        if final_pass {
            // Final-pass-only objects never update most_recent_frame_visible.
            self.final_pass_object.push(object.id);
        } else {
            object.most_recent_frame_visible = current_frame;
            self.visible_object.push(object.id);
        }
    }

    /// Dynamic/root-only lights still go through the shared size-cutoff and
    /// worst-case/tight ordering rule, just without octree descent.
    fn cull_lights_root(&mut self, lights: &[Light], hull: &crate::bounds::ConvexHull, viewpoint: glam::Vec3, dynamic_only: bool) {
        for light in lights {
            if dynamic_only && !light.dynamic.contains(crate::light::DynamicLightFlags::DYNAMIC_POSITION) {
                continue;
            }
            if !dynamic_only && light.dynamic.contains(crate::light::DynamicLightFlags::DYNAMIC_POSITION) {
                continue;
            }
            self.classify_light(light, hull, viewpoint);
        }
    }

    fn classify_light(&mut self, light: &Light, hull: &crate::bounds::ConvexHull, viewpoint: glam::Vec3) {
        let primary_sphere = match light.primary_bounds.sphere {
            Some(s) => s,
            None => Sphere::new(light.position_or_direction, f32::MAX),
        };

        let size = projected_size(primary_sphere.center, primary_sphere.radius, viewpoint);
        if size < LIGHT_VOLUME_SIZE_CUTOFF {
            return;
        }

        // For non-directional lights with worst-case bounds, intersect with
        // the worst-case sphere first, then with the tight volume.
        if let Some(worst_case) = light.worst_case_sphere {
            if !light.is_directional() {
                if hull.test_sphere(&worst_case).is_outside() {
                    return;
                }
                if !sphere_intersects_sphere(&worst_case, &primary_sphere) {
                    return;
                }
            }
        }

        if hull.test_sphere(&primary_sphere).is_outside() {
            return;
        }

        self.visible_light.push(light.id);
    }

    /// Re-checks an object already on `light_volume_object[]` against a
    /// shrinking worst-case-bounded light's current tight AABB: rejects
    /// objects whose AABB no longer intersects the current sphere.
    pub fn object_still_in_tight_light_volume(object: &Object, light: &Light) -> bool {
        match light.primary_bounds.sphere {
            Some(sphere) => sphere_intersects_aabb(&sphere, &object.aabb),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;
    use crate::light::Attenuation;
    use crate::mesh::{unit_cube, Model};
    use glam::{Mat4, Vec3};

    fn test_scene() -> Scene {
        let mut scene = Scene::new(Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0)));
        let model = scene.add_model(Model { lods: vec![unit_cube()] });
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let aabb = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        scene.add_object(Object::new(ObjectId(0), model, Mat4::IDENTITY, sphere, aabb, ObjectFlags::CAST_SHADOWS));

        let halo_sphere = Sphere::new(Vec3::new(5.0, 0.0, 0.0), 0.2);
        let halo_aabb = Aabb::new(halo_sphere.center - Vec3::splat(0.2), halo_sphere.center + Vec3::splat(0.2));
        scene.add_object(Object::new(ObjectId(1), model, Mat4::from_translation(halo_sphere.center), halo_sphere, halo_aabb, ObjectFlags::LIGHT_HALO));
        scene
    }

    fn frustum_looking_down_z() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::from_matrices(view, proj, 0.1, 100.0, 0)
    }

    #[test]
    fn light_halo_objects_route_to_final_pass() {
        let mut scene = test_scene();
        let frustum = frustum_looking_down_z();
        let mut culler = Culler::new();
        culler.determine_visible_entities(&mut scene, &frustum, Vec3::new(0.0, 0.0, -10.0), 1);
        assert!(culler.visible_object.contains(&ObjectId(0)));
        assert!(culler.final_pass_object.contains(&ObjectId(1)));
        assert!(!culler.visible_object.contains(&ObjectId(1)));
    }

    #[test]
    fn visible_object_gets_frame_timestamp_stamped() {
        let mut scene = test_scene();
        let frustum = frustum_looking_down_z();
        let mut culler = Culler::new();
        culler.determine_visible_entities(&mut scene, &frustum, Vec3::new(0.0, 0.0, -10.0), 7);
        assert_eq!(scene.objects[0].most_recent_frame_visible, 7);
    }

    #[test]
    fn point_light_outside_frustum_is_not_visible() {
        let mut scene = test_scene();
        scene.add_point_light(Vec3::ONE, Vec3::new(1000.0, 1000.0, 1000.0), Attenuation { linear_range: 1.0, cutoff: 0.01, radial_range: 1.0 });
        let frustum = frustum_looking_down_z();
        let mut culler = Culler::new();
        culler.determine_visible_entities(&mut scene, &frustum, Vec3::new(0.0, 0.0, -10.0), 1);
        assert!(culler.visible_light.is_empty());
    }

    #[test]
    fn static_prefix_is_reused_when_frustum_unchanged() {
        let mut scene = test_scene();
        let frustum = frustum_looking_down_z();
        let mut culler = Culler::new();
        culler.determine_visible_entities(&mut scene, &frustum, Vec3::new(0.0, 0.0, -10.0), 1);
        let first_run_visible = culler.visible_object.clone();
        // Same frustum.most_recent_frame_changed (0) but a later current_frame:
        // the static prefix must be reused verbatim.
        culler.determine_visible_entities(&mut scene, &frustum, Vec3::new(0.0, 0.0, -10.0), 2);
        assert_eq!(culler.visible_object, first_run_visible);
    }
}
