//! View frustum plus the two derived convex volumes shadow rendering needs:
//! the near-clip volume (determines depth-pass eligibility) and the
//! shadow-caster volume (bounds everything capable of casting a visible
//! shadow). See GLOSSARY.

use glam::{Mat4, Vec3, Vec4};

use crate::bounds::{ConvexHull, Plane};

/// A scissors rectangle in viewport pixels plus the depth-bounds range for
/// this light, or one of the sentinel states used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScissorsRect {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub depth_near: f32,
    pub depth_far: f32,
}

impl ScissorsRect {
    /// "not yet computed" sentinel: `left > 2.5`.
    pub const NOT_COMPUTED: ScissorsRect = ScissorsRect {
        left: 3.0,
        right: 0.0,
        bottom: 0.0,
        top: 0.0,
        depth_near: 0.0,
        depth_far: 0.0,
    };

    /// "object outside light volume" sentinel: `left > 1.5`.
    pub const OUTSIDE_LIGHT_VOLUME: ScissorsRect = ScissorsRect {
        left: 2.0,
        right: 0.0,
        bottom: 0.0,
        top: 0.0,
        depth_near: 0.0,
        depth_far: 0.0,
    };

    /// "no usable tighter scissors" sentinel: `left < -1.5`.
    pub const NO_TIGHTER_SCISSORS: ScissorsRect = ScissorsRect {
        left: -2.0,
        right: 0.0,
        bottom: 0.0,
        top: 0.0,
        depth_near: 0.0,
        depth_far: 0.0,
    };

    pub fn is_not_computed(&self) -> bool {
        self.left > 2.5
    }

    pub fn is_outside_light_volume(&self) -> bool {
        self.left > 1.5 && self.left <= 2.5
    }

    pub fn is_no_tighter_scissors(&self) -> bool {
        self.left < -1.5
    }

    pub fn is_regular(&self) -> bool {
        !self.is_not_computed() && !self.is_outside_light_volume() && !self.is_no_tighter_scissors()
    }

    /// A region emitted to the GPU must be non-empty.
    pub fn is_empty_region(&self) -> bool {
        !(self.right > self.left && self.top > self.bottom && self.depth_far > self.depth_near)
    }

    /// Intersect two regular scissors rectangles. Returns `None` if the
    /// result is empty.
    pub fn intersect(&self, other: &ScissorsRect) -> Option<ScissorsRect> {
        let r = ScissorsRect {
            left: self.left.max(other.left),
            right: self.right.min(other.right),
            bottom: self.bottom.max(other.bottom),
            top: self.top.min(other.top),
            depth_near: self.depth_near.max(other.depth_near),
            depth_far: self.depth_far.min(other.depth_far),
        };
        if r.is_empty_region() {
            None
        } else {
            Some(r)
        }
    }

    /// True iff `self` is a strict subset of `other`: the renderer only
    /// tightens both the scissors rectangle and depth bounds when this holds.
    pub fn is_proper_subset_of(&self, other: &ScissorsRect) -> bool {
        let subset = self.left >= other.left
            && self.right <= other.right
            && self.bottom >= other.bottom
            && self.top <= other.top
            && self.depth_near >= other.depth_near
            && self.depth_far <= other.depth_far;
        let strictly_smaller = self.left > other.left
            || self.right < other.right
            || self.bottom > other.bottom
            || self.top < other.top;
        subset && strictly_smaller
    }
}

pub struct Frustum {
    pub planes: [Plane; 6],
    pub near_clip_volume: ConvexHull,
    /// Recomputed per active light: convex hull of the viewport and the
    /// light position (GLOSSARY: "Shadow-caster volume").
    pub shadow_caster_volume: Option<ConvexHull>,
    pub view_proj: Mat4,
    pub near: f32,
    pub far: f32,
    pub most_recent_frame_changed: u64,
}

impl Frustum {
    pub fn from_matrices(view: Mat4, proj: Mat4, near: f32, far: f32, frame: u64) -> Self {
        let vp = proj * view;
        let planes = extract_planes(&vp);
        let near_clip_volume = near_clip_hull(&view, &proj, near);
        Self {
            planes,
            near_clip_volume,
            shadow_caster_volume: None,
            view_proj: vp,
            near,
            far,
            most_recent_frame_changed: frame,
        }
    }

    pub fn hull(&self) -> ConvexHull {
        ConvexHull::new(self.planes.to_vec())
    }

    /// Shadow-caster volume: the convex hull of the view frustum extended
    /// toward the light position so objects outside the view but between
    /// it and the light still cast shadows into view.
    pub fn compute_shadow_caster_volume(&mut self, light_position: Vec3, light_is_directional: bool) {
        let mut planes = self.planes.to_vec();
        if !light_is_directional {
            // Conservative extra half-space: the plane through the light
            // position parallel to the far plane, facing toward the scene.
            let far_plane = self.planes[5];
            let d = far_plane.normal.dot(light_position);
            planes.push(Plane { normal: far_plane.normal, d: -d });
        }
        self.shadow_caster_volume = Some(ConvexHull::new(planes));
    }
}

fn extract_planes(vp: &Mat4) -> [Plane; 6] {
    let row = |i: usize| Vec4::new(vp.col(0)[i], vp.col(1)[i], vp.col(2)[i], vp.col(3)[i]);
    let r0 = row(0);
    let r1 = row(1);
    let r2 = row(2);
    let r3 = row(3);
    [
        Plane::from_row(r3 + r0),
        Plane::from_row(r3 - r0),
        Plane::from_row(r3 + r1),
        Plane::from_row(r3 - r1),
        Plane::from_row(r3 + r2),
        Plane::from_row(r3 - r2),
    ]
}

/// Convex hull of the near rectangle and effectively the whole frustum side
/// planes, used to decide depth-pass vs depth-fail for shadow volumes
/// (GLOSSARY: "Near-clip volume").
fn near_clip_hull(view: &Mat4, proj: &Mat4, near: f32) -> ConvexHull {
    let vp = *proj * *view;
    let mut planes = extract_planes(&vp).to_vec();
    // Replace the near plane with one offset slightly to account for
    // floating point slop at the clip boundary itself.
    let inv_view = view.inverse();
    let forward = -inv_view.z_axis.truncate().normalize();
    let eye = inv_view.w_axis.truncate();
    let near_point = eye + forward * near;
    planes[4] = Plane { normal: forward, d: -forward.dot(near_point) };
    ConvexHull::new(planes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scissors_intersection_empty_when_disjoint() {
        let a = ScissorsRect { left: 0.0, right: 1.0, bottom: 0.0, top: 1.0, depth_near: 0.0, depth_far: 1.0 };
        let b = ScissorsRect { left: 2.0, right: 3.0, bottom: 0.0, top: 1.0, depth_near: 0.0, depth_far: 1.0 };
        assert!(a.intersect(&b).is_none());
    }

    #[test]
    fn proper_subset_detection() {
        let outer = ScissorsRect { left: 0.0, right: 10.0, bottom: 0.0, top: 10.0, depth_near: 0.0, depth_far: 1.0 };
        let inner = ScissorsRect { left: 2.0, right: 8.0, bottom: 2.0, top: 8.0, depth_near: 0.0, depth_far: 1.0 };
        assert!(inner.is_proper_subset_of(&outer));
        assert!(!outer.is_proper_subset_of(&inner));
        assert!(!outer.is_proper_subset_of(&outer));
    }

    #[test]
    fn sentinel_values_are_distinguishable() {
        assert!(ScissorsRect::NOT_COMPUTED.is_not_computed());
        assert!(ScissorsRect::OUTSIDE_LIGHT_VOLUME.is_outside_light_volume());
        assert!(ScissorsRect::NO_TIGHTER_SCISSORS.is_no_tighter_scissors());
    }
}
