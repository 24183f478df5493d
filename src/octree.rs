//! A compressed, mixed-entity spatial index with two storage encodings
//! sharing one traversal algorithm. Entities are tagged 31-bit indices
//! (high bit selects object vs. light) rather than a polymorphic base
//! type, resolved against the scene's two parallel tables by the caller's
//! visitor.

use glam::Vec3;
use smallvec::SmallVec;

use crate::bounds::{sphere_intersects_aabb, Aabb, ConvexHull, Sphere, Verdict};

/// A tagged index into the scene's object or light table: high bit selects
/// object/light, low 31 bits index into the scene's object or light table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef(u32);

const LIGHT_TAG: u32 = 1 << 31;
const INDEX_MASK: u32 = !LIGHT_TAG;

impl EntityRef {
    pub fn object(index: u32) -> Self {
        debug_assert!(index & LIGHT_TAG == 0, "object index exceeds 31 bits");
        EntityRef(index)
    }

    pub fn light(index: u32) -> Self {
        debug_assert!(index & LIGHT_TAG == 0, "light index exceeds 31 bits");
        EntityRef(index | LIGHT_TAG)
    }

    pub fn is_light(self) -> bool {
        self.0 & LIGHT_TAG != 0
    }

    pub fn is_object(self) -> bool {
        !self.is_light()
    }

    pub fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }
}

/// Screen-size cutoff below which a whole octree subtree is pruned without
/// per-entity tests, when no far plane is in play and the viewpoint is
/// outside the node's AABB.
pub const OCTREE_SIZE_CUTOFF: f32 = 0.001;

/// Conservative proxy for on-screen angular size: bounding-sphere radius
/// over distance to the viewpoint. Shared by the octree traversal, the
/// culler and light-model classification wherever a "projected size"
/// cutoff test is required.
pub fn projected_size(center: Vec3, radius: f32, viewpoint: Vec3) -> f32 {
    let dist = center.distance(viewpoint);
    if dist <= radius {
        // Viewpoint is inside the bounding sphere: treat as maximal size,
        // never prune.
        f32::MAX
    } else {
        radius / dist
    }
}

#[derive(Debug, Default, Clone)]
pub struct OctreeNode {
    /// Most leaves hold only a handful of entities; inline storage avoids a
    /// heap allocation per node for the common case.
    pub entities: SmallVec<[EntityRef; 4]>,
    /// Child node index into the owning octree's `nodes` arena, one slot per
    /// octant (`0..8`), `None` where the octant bitfield has no child.
    pub children: [Option<u32>; 8],
}

impl OctreeNode {
    fn octant_bitfield(&self) -> u8 {
        let mut bits = 0u8;
        for (i, c) in self.children.iter().enumerate() {
            if c.is_some() {
                bits |= 1 << i;
            }
        }
        bits
    }
}

/// Explicit-bounds variant: each node's AABB/sphere is looked up by node
/// index in a parallel table, allowing arbitrary (non-regularly-subdivided)
/// bounds for the irregular clustering that an entity-packing build
/// produces.
#[derive(Debug, Default)]
pub struct ExplicitOctree {
    pub nodes: Vec<OctreeNode>,
    pub bounds: Vec<Aabb>,
    pub root: u32,
}

/// Strict-optimized variant: octants follow a regular half-subdivision of
/// the parent AABB, so bounds are synthesized recursively instead of
/// stored, trading a little traversal arithmetic for a much smaller node
/// representation.
#[derive(Debug, Default)]
pub struct StrictOctree {
    pub nodes: Vec<OctreeNode>,
    pub root_bounds: Aabb,
    pub root: u32,
}

/// Picks the `{0.25|0.75}` octant fraction vector relative to the parent
/// min and half-dimension and returns the reconstructed child AABB.
pub fn strict_child_aabb(parent: &Aabb, octant: u8) -> Aabb {
    let half = parent.half_extent();
    let full = half * 2.0;
    let frac = |bit: u8| if bit != 0 { 0.75 } else { 0.25 };
    let center = Vec3::new(
        parent.min.x + full.x * frac(octant & 1),
        parent.min.y + full.y * frac((octant >> 1) & 1),
        parent.min.z + full.z * frac((octant >> 2) & 1),
    );
    Aabb::new(center - half * 0.5, center + half * 0.5)
}

pub enum FastOctree {
    Explicit(ExplicitOctree),
    Strict(StrictOctree),
}

impl FastOctree {
    pub fn empty_explicit() -> Self {
        FastOctree::Explicit(ExplicitOctree {
            nodes: vec![OctreeNode::default()],
            bounds: vec![Aabb::new(Vec3::ZERO, Vec3::ZERO)],
            root: 0,
        })
    }

    pub fn empty_strict(root_bounds: Aabb) -> Self {
        FastOctree::Strict(StrictOctree {
            nodes: vec![OctreeNode::default()],
            root_bounds,
            root: 0,
        })
    }

    fn nodes(&self) -> &[OctreeNode] {
        match self {
            FastOctree::Explicit(o) => &o.nodes,
            FastOctree::Strict(o) => &o.nodes,
        }
    }

    fn nodes_mut(&mut self) -> &mut Vec<OctreeNode> {
        match self {
            FastOctree::Explicit(o) => &mut o.nodes,
            FastOctree::Strict(o) => &mut o.nodes,
        }
    }

    fn root(&self) -> u32 {
        match self {
            FastOctree::Explicit(o) => o.root,
            FastOctree::Strict(o) => o.root,
        }
    }

    fn root_bounds(&self) -> Aabb {
        match self {
            FastOctree::Explicit(o) => o.bounds[o.root as usize],
            FastOctree::Strict(o) => o.root_bounds,
        }
    }

    fn bounds_of(&self, node_index: u32, parent_bounds: Aabb, octant: u8) -> Aabb {
        match self {
            FastOctree::Explicit(o) => o.bounds[node_index as usize],
            FastOctree::Strict(_) => strict_child_aabb(&parent_bounds, octant),
        }
    }

    /// Visits only the root node: used for dynamic octrees (which only ever
    /// populate the root) and infinite-distance octrees.
    pub fn root_entities(&self, mut visitor: impl FnMut(EntityRef)) {
        let root = self.root() as usize;
        for &e in &self.nodes()[root].entities {
            visitor(e);
        }
    }

    /// Depth-first traversal threading the containment verdict downward:
    /// `CompletelyOutside` prunes the subtree; `CompletelyInside` propagates
    /// to all descendants, which then skip their own boundary test.
    ///
    /// `viewpoint` and `has_far_plane` drive the screen-size subtree pruning
    /// rule: a node is pruned when no far plane is used, the viewpoint is
    /// outside the node AABB, and `projected_size(...) < OCTREE_SIZE_CUTOFF`.
    pub fn traverse(
        &self,
        hull: &ConvexHull,
        viewpoint: Vec3,
        has_far_plane: bool,
        mut visitor: impl FnMut(EntityRef, Verdict),
    ) {
        let root = self.root();
        let root_bounds = self.root_bounds();
        self.traverse_node(root, root_bounds, root_bounds, 0, hull, viewpoint, has_far_plane, Verdict::PartiallyInside, &mut visitor);
    }

    #[allow(clippy::too_many_arguments)]
    fn traverse_node(
        &self,
        node_index: u32,
        node_bounds: Aabb,
        parent_bounds: Aabb,
        octant: u8,
        hull: &ConvexHull,
        viewpoint: Vec3,
        has_far_plane: bool,
        inherited: Verdict,
        visitor: &mut impl FnMut(EntityRef, Verdict),
    ) {
        let _ = (parent_bounds, octant);

        let verdict = if inherited.is_completely_inside() {
            Verdict::CompletelyInside
        } else {
            let v = hull.test_aabb(&node_bounds);
            if v.is_outside() {
                return;
            }
            v
        };

        if !has_far_plane && !verdict.is_completely_inside() {
            let center = node_bounds.center();
            let radius = node_bounds.half_extent().length();
            let viewpoint_outside = viewpoint.clamp(node_bounds.min, node_bounds.max) != viewpoint;
            if viewpoint_outside && projected_size(center, radius, viewpoint) < OCTREE_SIZE_CUTOFF {
                return;
            }
        }

        let node = &self.nodes()[node_index as usize];
        for &e in &node.entities {
            visitor(e, verdict);
        }

        for (octant_index, child) in node.children.iter().enumerate() {
            if let Some(child_index) = child {
                let child_bounds = self.bounds_of(*child_index, node_bounds, octant_index as u8);
                self.traverse_node(
                    *child_index,
                    child_bounds,
                    node_bounds,
                    octant_index as u8,
                    hull,
                    viewpoint,
                    has_far_plane,
                    verdict,
                    visitor,
                );
            }
        }
    }

    /// Visits every entity whose containing node's AABB intersects `sphere`,
    /// pruning subtrees whose AABB doesn't. Used by the scene's static
    /// per-light list precompute to avoid a linear scan over every static
    /// object and light.
    pub fn traverse_sphere(&self, sphere: &Sphere, mut visitor: impl FnMut(EntityRef)) {
        let root = self.root();
        let root_bounds = self.root_bounds();
        self.traverse_sphere_node(root, root_bounds, sphere, &mut visitor);
    }

    fn traverse_sphere_node(&self, node_index: u32, node_bounds: Aabb, sphere: &Sphere, visitor: &mut impl FnMut(EntityRef)) {
        if !sphere_intersects_aabb(sphere, &node_bounds) {
            return;
        }

        let node = &self.nodes()[node_index as usize];
        for &e in &node.entities {
            visitor(e);
        }

        for (octant_index, child) in node.children.iter().enumerate() {
            if let Some(child_index) = child {
                let child_bounds = self.bounds_of(*child_index, node_bounds, octant_index as u8);
                self.traverse_sphere_node(*child_index, child_bounds, sphere, visitor);
            }
        }
    }

    /// Inserts an entity at the root node. Building a fully subdivided tree
    /// from a scene's object/light lists belongs to scene finalization
    /// (`Scene::calculate_static_light_object_lists` and its siblings); this
    /// primitive is the one the octree itself must expose.
    pub fn insert_at_root(&mut self, entity: EntityRef) {
        let root = self.root() as usize;
        self.nodes_mut()[root].entities.push(entity);
    }

    /// Subdivides `node_index` into up to 8 children, creating any octant
    /// whose `make_child` callback decides should exist. Used by a one-time
    /// scene-building pass; entities are not automatically redistributed —
    /// the caller decides placement (Invariant I2: immutable after
    /// finalization).
    pub fn ensure_child(&mut self, node_index: u32, octant: u8) -> u32 {
        debug_assert!(octant < 8);
        if let Some(existing) = self.nodes()[node_index as usize].children[octant as usize] {
            return existing;
        }
        let new_index = self.nodes().len() as u32;
        self.nodes_mut().push(OctreeNode::default());
        self.nodes_mut()[node_index as usize].children[octant as usize] = Some(new_index);
        new_index
    }

    pub fn root_index(&self) -> u32 {
        self.root()
    }

    pub fn node_entities_mut(&mut self, node_index: u32) -> &mut SmallVec<[EntityRef; 4]> {
        &mut self.nodes_mut()[node_index as usize].entities
    }

    pub fn octant_bitfield(&self, node_index: u32) -> u8 {
        self.nodes()[node_index as usize].octant_bitfield()
    }

    pub fn set_explicit_bounds(&mut self, node_index: u32, bounds: Aabb) {
        if let FastOctree::Explicit(o) = self {
            if node_index as usize >= o.bounds.len() {
                o.bounds.resize(node_index as usize + 1, bounds);
            }
            o.bounds[node_index as usize] = bounds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Plane;

    fn hull_containing(min: Vec3, max: Vec3) -> ConvexHull {
        ConvexHull::new(vec![
            Plane { normal: Vec3::X, d: -min.x },
            Plane { normal: -Vec3::X, d: max.x },
            Plane { normal: Vec3::Y, d: -min.y },
            Plane { normal: -Vec3::Y, d: max.y },
            Plane { normal: Vec3::Z, d: -min.z },
            Plane { normal: -Vec3::Z, d: max.z },
        ])
    }

    #[test]
    fn entity_ref_round_trips_tag_and_index() {
        let obj = EntityRef::object(42);
        assert!(obj.is_object());
        assert_eq!(obj.index(), 42);

        let light = EntityRef::light(7);
        assert!(light.is_light());
        assert_eq!(light.index(), 7);
    }

    #[test]
    fn strict_child_aabb_quadrants_parent() {
        let parent = Aabb::new(Vec3::splat(-4.0), Vec3::splat(4.0));
        let child = strict_child_aabb(&parent, 0b000);
        assert!((child.center() - Vec3::splat(-2.0)).length() < 1e-5);
        let child_far = strict_child_aabb(&parent, 0b111);
        assert!((child_far.center() - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn traverse_prunes_outside_subtree_and_propagates_inside() {
        let mut tree = FastOctree::empty_explicit();
        tree.set_explicit_bounds(0, Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0)));
        let child_in = tree.ensure_child(0, 0);
        tree.set_explicit_bounds(child_in, Aabb::new(Vec3::splat(-10.0), Vec3::splat(-5.0)));
        tree.node_entities_mut(child_in).push(EntityRef::object(1));

        let child_out = tree.ensure_child(0, 7);
        tree.set_explicit_bounds(child_out, Aabb::new(Vec3::splat(100.0), Vec3::splat(110.0)));
        tree.node_entities_mut(child_out).push(EntityRef::object(2));

        let hull = hull_containing(Vec3::splat(-20.0), Vec3::splat(20.0));
        let mut visited = Vec::new();
        tree.traverse(&hull, Vec3::ZERO, true, |e, v| visited.push((e, v)));

        assert!(visited.iter().any(|(e, _)| e.index() == 1));
        assert!(!visited.iter().any(|(e, _)| e.index() == 2));
    }
}
