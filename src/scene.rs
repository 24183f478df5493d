//! Scene data model: object/light/model tables, and the one-time
//! static-light/object-list precompute.

use bitflags::bitflags;
use glam::{Mat4, Vec3};

use crate::bounds::{aabb_contains_aabb, Aabb, OrientedBox, Sphere};
use crate::frustum::ScissorsRect;
use crate::light::{Attenuation, Light, LightId, LightKind};
use crate::mesh::Model;
use crate::octree::{projected_size, strict_child_aabb, EntityRef, FastOctree};
use crate::shadow::builder::ShadowVolumePrimitive;
use crate::stats::RenderStats;

/// Recursion limit for the static-octree build pass: deep enough to
/// separate clustered geometry, shallow enough that the per-node
/// bookkeeping never dominates over a handful of objects per leaf.
const MAX_STATIC_OCTREE_DEPTH: u32 = 6;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObjectFlags: u32 {
        const HIDDEN                    = 1 << 0;
        const EMISSION_ONLY              = 1 << 1;
        const CAST_SHADOWS                = 1 << 2;
        const DYNAMIC_POSITION            = 1 << 3;
        const INFINITE_DISTANCE           = 1 << 4;
        const PARTICLE_SYSTEM             = 1 << 5;
        const LIGHT_HALO                  = 1 << 6;
        const BILLBOARD                   = 1 << 7;
        const NOT_OCCLUDING               = 1 << 8;
        const USE_OBJECT_SHADOW_CACHE     = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(pub u32);

/// A cache slot owned by the object, one per static light for which the
/// object is partially inside. Cursor-addressed by `static_light_order`.
#[derive(Debug, Clone, Copy)]
pub struct GeometryScissorsCacheEntry {
    pub light_id: LightId,
    pub scissors: ScissorsRect,
}

pub struct Object {
    pub id: ObjectId,
    pub flags: ObjectFlags,
    pub bounding_sphere: Sphere,
    pub obb: Option<OrientedBox>,
    pub aabb: Aabb,
    pub model_matrix: Mat4,
    pub inv_model_matrix: Mat4,
    pub model: ModelHandle,

    pub most_recent_frame_visible: u64,
    pub projected_size: f32,
    pub geometry_scissors_cache: Vec<GeometryScissorsCacheEntry>,
    pub static_light_order: usize,
    pub geometry_scissors_cache_timestamp: u64,
    pub static_shadow_volumes: Vec<(LightId, ShadowVolumePrimitive)>,
}

impl Object {
    pub fn new(id: ObjectId, model: ModelHandle, model_matrix: Mat4, bounding_sphere: Sphere, aabb: Aabb, flags: ObjectFlags) -> Self {
        Self {
            id,
            flags,
            bounding_sphere,
            obb: None,
            aabb,
            model_matrix,
            inv_model_matrix: model_matrix.inverse(),
            model,
            most_recent_frame_visible: 0,
            projected_size: 0.0,
            geometry_scissors_cache: Vec::new(),
            static_light_order: 0,
            geometry_scissors_cache_timestamp: 0,
            static_shadow_volumes: Vec::new(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.flags.contains(ObjectFlags::DYNAMIC_POSITION)
    }

    pub fn casts_shadows(&self) -> bool {
        self.flags.contains(ObjectFlags::CAST_SHADOWS)
    }

    /// The cache slot for `light_id`, if one was allocated for this
    /// object, identifies the same light across frames provided the frustum
    /// has been stable.
    pub fn scissors_cache_slot(&self, light_id: LightId) -> Option<usize> {
        self.geometry_scissors_cache.iter().position(|e| e.light_id == light_id)
    }

    /// Model-space light vector for a static precomputed shadow volume.
    pub fn static_shadow_primitive(&self, light_id: LightId) -> Option<&ShadowVolumePrimitive> {
        self.static_shadow_volumes.iter().find(|(id, _)| *id == light_id).map(|(_, p)| p)
    }
}

pub struct Scene {
    pub objects: Vec<Object>,
    pub lights: Vec<Light>,
    pub models: Vec<Model>,

    pub static_octree: FastOctree,
    pub dynamic_octree: FastOctree,
    pub infinite_static_octree: FastOctree,
    pub infinite_dynamic_octree: FastOctree,

    pub stats: RenderStats,
    world_bounds: Aabb,
    finalized: bool,
}

impl Scene {
    pub fn new(world_bounds: Aabb) -> Self {
        Self {
            objects: Vec::new(),
            lights: Vec::new(),
            models: Vec::new(),
            static_octree: FastOctree::empty_strict(world_bounds),
            dynamic_octree: FastOctree::empty_explicit(),
            infinite_static_octree: FastOctree::empty_explicit(),
            infinite_dynamic_octree: FastOctree::empty_explicit(),
            stats: RenderStats::default(),
            world_bounds,
            finalized: false,
        }
    }

    pub fn add_model(&mut self, model: Model) -> ModelHandle {
        let handle = ModelHandle(self.models.len() as u32);
        self.models.push(model);
        handle
    }

    /// Appends an object and places it into exactly one octree,
    /// following the partition rules: infinite-distance objects go
    /// into the infinite-distance octrees; dynamic-position objects go into
    /// the dynamic octree (root only); everything else goes into the
    /// static octree.
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        debug_assert!(!self.finalized, "scene is immutable after calculate_static_light_object_lists");
        let id = object.id;
        let entity = EntityRef::object(self.objects.len() as u32);
        let infinite = object.flags.contains(ObjectFlags::INFINITE_DISTANCE);
        let dynamic = object.is_dynamic();
        self.objects.push(object);

        match (infinite, dynamic) {
            (true, true) => self.infinite_dynamic_octree.insert_at_root(entity),
            (true, false) => self.infinite_static_octree.insert_at_root(entity),
            (false, true) => self.dynamic_octree.insert_at_root(entity),
            (false, false) => self.static_octree.insert_at_root(entity),
        }
        id
    }

    pub fn add_directional_light(&mut self, color: Vec3, direction: Vec3) -> LightId {
        let id = LightId(self.lights.len() as u32);
        let light = Light::new_directional(id, color, direction);
        self.push_light(light)
    }

    pub fn add_point_light(&mut self, color: Vec3, position: Vec3, attenuation: Attenuation) -> LightId {
        let id = LightId(self.lights.len() as u32);
        let light = Light::new_point(id, color, position, attenuation);
        self.push_light(light)
    }

    pub fn add_spot_light(&mut self, color: Vec3, position: Vec3, axis: Vec3, exponent: f32, attenuation: Attenuation) -> LightId {
        let id = LightId(self.lights.len() as u32);
        let light = Light::new_spot(id, color, position, axis, exponent, attenuation);
        self.push_light(light)
    }

    pub fn add_beam_light(&mut self, color: Vec3, direction: Vec3, radius: f32, half_length: f32, origin: Vec3) -> LightId {
        let id = LightId(self.lights.len() as u32);
        let light = Light::new_beam(id, color, direction, radius, half_length, origin);
        self.push_light(light)
    }

    fn push_light(&mut self, light: Light) -> LightId {
        debug_assert!(!self.finalized, "scene is immutable after calculate_static_light_object_lists");
        let id = light.id;
        let entity = EntityRef::light(self.lights.len() as u32);
        let dynamic = light.dynamic.contains(crate::light::DynamicLightFlags::DYNAMIC_POSITION);
        self.lights.push(light);
        if dynamic {
            self.dynamic_octree.insert_at_root(entity);
        } else {
            self.static_octree.insert_at_root(entity);
        }
        id
    }

    pub fn change_light_position(&mut self, id: LightId, position: Vec3) {
        self.lights[id.0 as usize].mark_position_changed(position);
    }

    pub fn change_light_color(&mut self, id: LightId, color: Vec3) {
        self.lights[id.0 as usize].color = color;
    }

    pub fn change_light_direction(&mut self, id: LightId, direction: Vec3) {
        self.lights[id.0 as usize].mark_direction_changed(direction);
    }

    pub fn set_light_worst_case_bounds(&mut self, id: LightId, sphere: Sphere) {
        self.lights[id.0 as usize].set_worst_case_bounds(sphere);
    }

    /// Static-list preprocessing, called once after scene finalization.
    ///
    /// For every light whose shadow volume is not dynamic, OR whose light
    /// volume is not dynamic, OR which has worst-case sphere bounds: walk
    /// the static octree and (a) append static shadow casters whose bounds
    /// intersect the light volume, precomputing their shadow-volume bounding
    /// primitive where the light's shadow volume is also static; (b)
    /// partition the objects inside the light volume into a
    /// partially-inside prefix and completely-inside suffix; (c) allocate
    /// each object a geometry-scissors-cache slot per static light it is
    /// partially inside.
    pub fn calculate_static_light_object_lists(&mut self) {
        self.finalized = true;
        self.build_static_octree();

        for light_index in 0..self.lights.len() {
            if !self.light_participates_in_static_lists(light_index) {
                continue;
            }
            self.build_static_lists_for_light(light_index);
        }

        self.allocate_geometry_scissors_caches();
    }

    /// One-time build pass: every entity `add_object`/`push_light` parked at
    /// the static octree's root gets pushed down into the regular
    /// half-subdivision the strict octree computes on the fly, so that
    /// `FastOctree::traverse`'s `CompletelyOutside`/`CompletelyInside`
    /// pruning actually has subtrees to prune. An entity that doesn't fit
    /// wholly inside any single child octant (or one with no derivable AABB,
    /// e.g. a directional light) stays at the node it was pushed to.
    fn build_static_octree(&mut self) {
        let mut root_entities = Vec::new();
        self.static_octree.root_entities(|e| root_entities.push(e));
        self.static_octree.node_entities_mut(self.static_octree.root_index()).clear();

        let root = self.static_octree.root_index();
        let root_bounds = self.world_bounds;
        for entity in root_entities {
            match self.entity_aabb(entity) {
                Some(aabb) => Self::insert_into_static_octree(&mut self.static_octree, root, root_bounds, entity, aabb, 0),
                None => self.static_octree.insert_at_root(entity),
            }
        }
    }

    fn entity_aabb(&self, entity: EntityRef) -> Option<Aabb> {
        if entity.is_object() {
            Some(self.objects[entity.index() as usize].aabb)
        } else {
            self.lights[entity.index() as usize].primary_bounds.aabb
        }
    }

    fn insert_into_static_octree(tree: &mut FastOctree, node: u32, node_bounds: Aabb, entity: EntityRef, entity_aabb: Aabb, depth: u32) {
        if depth < MAX_STATIC_OCTREE_DEPTH {
            for octant in 0..8u8 {
                let child_bounds = strict_child_aabb(&node_bounds, octant);
                if aabb_contains_aabb(&child_bounds, &entity_aabb) {
                    let child = tree.ensure_child(node, octant);
                    Self::insert_into_static_octree(tree, child, child_bounds, entity, entity_aabb, depth + 1);
                    return;
                }
            }
        }
        tree.node_entities_mut(node).push(entity);
    }

    fn light_participates_in_static_lists(&self, light_index: usize) -> bool {
        use crate::light::DynamicLightFlags as F;
        let light = &self.lights[light_index];
        !light.dynamic.contains(F::DYNAMIC_SHADOW_VOLUME)
            || !light.dynamic.contains(F::DYNAMIC_LIGHT_VOLUME)
            || light.worst_case_sphere.is_some()
    }

    fn build_static_lists_for_light(&mut self, light_index: usize) {
        use crate::light::DynamicLightFlags as F;

        let light_bounds_sphere = self.lights[light_index].primary_bounds.sphere;
        let light_static_shadow_volume = !self.lights[light_index].dynamic.contains(F::DYNAMIC_SHADOW_VOLUME);
        let light_kind = self.lights[light_index].kind;
        let light_position = self.lights[light_index].position_or_direction;

        let mut shadow_casters: Vec<EntityRef> = Vec::new();
        let mut light_volume_partial: Vec<EntityRef> = Vec::new();
        let mut light_volume_inside: Vec<EntityRef> = Vec::new();

        let sphere = match light_bounds_sphere {
            Some(s) => s,
            None => Sphere::new(light_position, f32::MAX),
        };

        let mut object_entities: Vec<u32> = Vec::new();
        self.static_octree.traverse_sphere(&sphere, |entity| {
            if entity.is_object() {
                object_entities.push(entity.index());
            }
        });

        for obj_index in object_entities {
            let object = &self.objects[obj_index as usize];
            let entity = EntityRef::object(obj_index);

            let intersects_light_volume = crate::bounds::sphere_intersects_aabb(&sphere, &object.aabb)
                || crate::bounds::sphere_intersects_sphere(&sphere, &object.bounding_sphere);

            if object.casts_shadows() && intersects_light_volume {
                shadow_casters.push(entity);
            }

            if !intersects_light_volume {
                continue;
            }

            let completely_inside = aabb_contains_aabb(
                &Aabb::new(sphere.center - Vec3::splat(sphere.radius), sphere.center + Vec3::splat(sphere.radius)),
                &object.aabb,
            );
            if completely_inside {
                light_volume_inside.push(entity);
            } else {
                light_volume_partial.push(entity);
            }
        }

        if light_static_shadow_volume && matches!(light_kind, LightKind::Directional | LightKind::Beam | LightKind::Point | LightKind::Spot) {
            for &entity in &shadow_casters {
                let object = &mut self.objects[entity.index() as usize];
                let primitive = ShadowVolumePrimitive::for_light(&self.lights[light_index], object.bounding_sphere.center, object.bounding_sphere.radius);
                object.static_shadow_volumes.push((LightId(light_index as u32), primitive));
            }
        }

        let light = &mut self.lights[light_index];
        light.partially_inside_count = light_volume_partial.len();
        light_volume_partial.extend(light_volume_inside);
        light.light_volume_object = light_volume_partial;
        light.shadow_caster_object = shadow_casters;
        light.dynamic |= F::STATIC_OBJECTS_LIST | F::STATIC_SHADOW_CASTER_LIST;
    }

    /// Each object gets a geometry-scissors-cache array sized by the
    /// number of static lights for which it is partially inside.
    fn allocate_geometry_scissors_caches(&mut self) {
        use std::collections::HashMap;

        let mut per_object_lights: HashMap<u32, Vec<LightId>> = HashMap::new();
        for light in &self.lights {
            for &entity in &light.light_volume_object[..light.partially_inside_count] {
                per_object_lights.entry(entity.index()).or_default().push(light.id);
            }
        }

        for (obj_index, light_ids) in per_object_lights {
            let object = &mut self.objects[obj_index as usize];
            object.geometry_scissors_cache = light_ids
                .into_iter()
                .map(|light_id| GeometryScissorsCacheEntry { light_id, scissors: ScissorsRect::NOT_COMPUTED })
                .collect();
        }
    }

    pub fn object_projected_size(&self, object: &Object, viewpoint: Vec3) -> f32 {
        projected_size(object.bounding_sphere.center, object.bounding_sphere.radius, viewpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::unit_cube;

    fn make_scene() -> Scene {
        let mut scene = Scene::new(Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0)));
        let model = scene.add_model(Model { lods: vec![unit_cube()] });
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let aabb = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        scene.add_object(Object::new(ObjectId(0), model, Mat4::IDENTITY, sphere, aabb, ObjectFlags::CAST_SHADOWS));
        scene
    }

    #[test]
    fn static_light_lists_partition_by_containment() {
        let mut scene = make_scene();
        scene.add_point_light(Vec3::ONE, Vec3::new(0.0, 5.0, 0.0), Attenuation { linear_range: 1.0, cutoff: 0.01, radial_range: 20.0 });
        scene.calculate_static_light_object_lists();

        let light = &scene.lights[0];
        assert!(light.dynamic.contains(crate::light::DynamicLightFlags::STATIC_OBJECTS_LIST));
        // The single object's AABB is small relative to the light's huge
        // radial range, so it should land in the "completely inside" suffix.
        assert!(light.light_volume_object.len() >= light.partially_inside_count);
    }

    #[test]
    fn object_appears_in_exactly_one_octree() {
        let scene = make_scene();
        let mut seen = 0;
        scene.static_octree.root_entities(|_| seen += 1);
        assert_eq!(seen, 1);
    }

    #[test]
    fn finalization_pushes_objects_out_of_the_root_node() {
        let mut scene = Scene::new(Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0)));
        let model = scene.add_model(Model { lods: vec![unit_cube()] });
        scene.add_object(Object::new(ObjectId(0), model, Mat4::from_translation(Vec3::splat(60.0)), Sphere::new(Vec3::splat(60.0), 1.0), Aabb::new(Vec3::splat(59.5), Vec3::splat(60.5)), ObjectFlags::CAST_SHADOWS));
        scene.add_object(Object::new(ObjectId(1), model, Mat4::from_translation(Vec3::splat(-60.0)), Sphere::new(Vec3::splat(-60.0), 1.0), Aabb::new(Vec3::splat(-60.5), Vec3::splat(-59.5)), ObjectFlags::CAST_SHADOWS));
        scene.calculate_static_light_object_lists();

        let mut at_root = 0;
        scene.static_octree.root_entities(|_| at_root += 1);
        assert_eq!(at_root, 0, "both objects fit wholly inside a child octant and should have descended");

        let mut found = 0;
        let whole_scene = Sphere::new(Vec3::ZERO, 200.0);
        scene.static_octree.traverse_sphere(&whole_scene, |_| found += 1);
        assert_eq!(found, 2);
    }
}
