//! Total intersection/containment predicates between AABB, sphere,
//! oriented box, cylinder, spherical sector, convex hull and
//! frustum. Every test here is conservative — false positives (reporting an
//! intersection or containment that isn't quite there) are acceptable, false
//! negatives are not, since callers use the verdict to prune whole octree
//! subtrees.

use glam::{Vec3, Vec4};

/// Three-valued containment result used to short-circuit octree recursion:
/// `CompletelyOutside` prunes the subtree, `CompletelyInside` propagates to
/// every descendant so they skip their own boundary test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    CompletelyOutside,
    PartiallyInside,
    CompletelyInside,
}

impl Verdict {
    pub fn is_outside(self) -> bool {
        matches!(self, Verdict::CompletelyOutside)
    }

    pub fn is_completely_inside(self) -> bool {
        matches!(self, Verdict::CompletelyInside)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let Aabb { min, max } = *self;
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Cylinder {
    /// World-space position of the base center.
    pub center: Vec3,
    pub axis: Vec3,
    pub radius: f32,
    pub half_height: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct SphericalSector {
    pub apex: Vec3,
    pub axis: Vec3,
    pub radius: f32,
    /// Half-angle of the cone, radians.
    pub half_angle: f32,
}

/// Arbitrary oriented box, for objects whose local axes aren't world-aligned.
#[derive(Debug, Clone, Copy)]
pub struct OrientedBox {
    pub center: Vec3,
    pub axes: [Vec3; 3],
    pub half_extent: Vec3,
}

/// A plane with `dot(normal, p) + d >= 0` meaning "inside".
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }

    /// Unnormalized plane from a row of a combined view-projection matrix,
    /// Gribb-Hartmann extraction.
    pub fn from_row(row: Vec4) -> Self {
        let normal = Vec3::new(row.x, row.y, row.z);
        let len = normal.length();
        if len > 1e-8 {
            Plane { normal: normal / len, d: row.w / len }
        } else {
            Plane { normal, d: row.w }
        }
    }
}

/// Convex hull as an arbitrary set of inward-facing planes. Used for the
/// near-clip volume, shadow-caster volume and general frustums.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    pub planes: Vec<Plane>,
}

impl ConvexHull {
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes }
    }

    /// Conservative sphere-vs-hull verdict: per plane, compare the signed
    /// distance of the center against the radius.
    pub fn test_sphere(&self, s: &Sphere) -> Verdict {
        let mut completely_inside = true;
        for plane in &self.planes {
            let dist = plane.distance(s.center);
            if dist < -s.radius {
                return Verdict::CompletelyOutside;
            }
            if dist < s.radius {
                completely_inside = false;
            }
        }
        if completely_inside {
            Verdict::CompletelyInside
        } else {
            Verdict::PartiallyInside
        }
    }

    /// Conservative AABB-vs-hull verdict using the standard positive/negative
    /// vertex trick per plane.
    pub fn test_aabb(&self, b: &Aabb) -> Verdict {
        let mut completely_inside = true;
        for plane in &self.planes {
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { b.max.x } else { b.min.x },
                if plane.normal.y >= 0.0 { b.max.y } else { b.min.y },
                if plane.normal.z >= 0.0 { b.max.z } else { b.min.z },
            );
            if plane.distance(p) < 0.0 {
                return Verdict::CompletelyOutside;
            }
            let n = Vec3::new(
                if plane.normal.x >= 0.0 { b.min.x } else { b.max.x },
                if plane.normal.y >= 0.0 { b.min.y } else { b.max.y },
                if plane.normal.z >= 0.0 { b.min.z } else { b.max.z },
            );
            if plane.distance(n) < 0.0 {
                completely_inside = false;
            }
        }
        if completely_inside {
            Verdict::CompletelyInside
        } else {
            Verdict::PartiallyInside
        }
    }

    pub fn intersects_sphere(&self, s: &Sphere) -> bool {
        !self.test_sphere(s).is_outside()
    }

    pub fn intersects_aabb(&self, b: &Aabb) -> bool {
        !self.test_aabb(b).is_outside()
    }
}

pub fn sphere_intersects_sphere(a: &Sphere, b: &Sphere) -> bool {
    let r = a.radius + b.radius;
    a.center.distance_squared(b.center) <= r * r
}

pub fn sphere_intersects_aabb(s: &Sphere, b: &Aabb) -> bool {
    let closest = s.center.clamp(b.min, b.max);
    s.center.distance_squared(closest) <= s.radius * s.radius
}

pub fn aabb_intersects_aabb(a: &Aabb, b: &Aabb) -> bool {
    a.min.x <= b.max.x
        && a.max.x >= b.min.x
        && a.min.y <= b.max.y
        && a.max.y >= b.min.y
        && a.min.z <= b.max.z
        && a.max.z >= b.min.z
}

/// Conservative verdict of `inner` against `outer`: used to decide whether a
/// child octree node AABB is wholly inside its parent's already-resolved
/// containment, without recomputing the tight test.
pub fn aabb_contains_aabb(outer: &Aabb, inner: &Aabb) -> bool {
    outer.min.x <= inner.min.x
        && outer.min.y <= inner.min.y
        && outer.min.z <= inner.min.z
        && outer.max.x >= inner.max.x
        && outer.max.y >= inner.max.y
        && outer.max.z >= inner.max.z
}

pub fn sphere_intersects_cylinder(s: &Sphere, c: &Cylinder) -> bool {
    let axis = c.axis.normalize_or_zero();
    let rel = s.center - c.center;
    let along = rel.dot(axis);
    let radial = rel - axis * along;
    let radial_dist = radial.length();
    if along < -c.half_height - s.radius || along > c.half_height + s.radius {
        return false;
    }
    radial_dist <= c.radius + s.radius
}

pub fn sphere_intersects_sector(s: &Sphere, sector: &SphericalSector) -> bool {
    if !sphere_intersects_sphere(s, &Sphere::new(sector.apex, sector.radius + s.radius)) {
        return false;
    }
    let axis = sector.axis.normalize_or_zero();
    let to_center = s.center - sector.apex;
    let dist = to_center.length();
    if dist <= s.radius {
        // Sphere straddles the apex: conservatively report an intersection.
        return true;
    }
    let angle_to_center = (to_center.dot(axis) / dist).clamp(-1.0, 1.0).acos();
    // Angular margin contributed by the sphere's own radius, conservative
    // (small-angle) approximation of the true angular half-width it subtends.
    let angular_margin = (s.radius / dist).asin();
    angle_to_center - angular_margin <= sector.half_angle
}

/// Callers prefer the fast bounding-sphere test first and only fall back to
/// a tighter box/cylinder test if the sphere test doesn't resolve the query.
pub fn sphere_then_aabb_verdict(sphere_hull: &Sphere, tight: &Aabb, hull: &ConvexHull) -> Verdict {
    let sphere_verdict = hull.test_sphere(sphere_hull);
    if !matches!(sphere_verdict, Verdict::PartiallyInside) {
        return sphere_verdict;
    }
    hull.test_aabb(tight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_union_contains_both() {
        let a = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let b = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let u = a.union(&b);
        assert!(aabb_contains_aabb(&u, &a));
        assert!(aabb_contains_aabb(&u, &b));
    }

    #[test]
    fn hull_test_sphere_outside_is_conservative_not_false_negative() {
        let planes = vec![
            Plane { normal: Vec3::X, d: 0.0 },
            Plane { normal: -Vec3::X, d: 10.0 },
        ];
        let hull = ConvexHull::new(planes);
        // Center far outside on the -X side: must be CompletelyOutside.
        let outside = Sphere::new(Vec3::new(-20.0, 0.0, 0.0), 1.0);
        assert_eq!(hull.test_sphere(&outside), Verdict::CompletelyOutside);
        // Center inside, radius small: CompletelyInside.
        let inside = Sphere::new(Vec3::new(5.0, 0.0, 0.0), 0.1);
        assert_eq!(hull.test_sphere(&inside), Verdict::CompletelyInside);
        // Straddling a plane: PartiallyInside.
        let straddle = Sphere::new(Vec3::new(0.0, 0.0, 0.0), 1.0);
        assert_eq!(hull.test_sphere(&straddle), Verdict::PartiallyInside);
    }

    #[test]
    fn cylinder_intersection_respects_height() {
        let cyl = Cylinder { center: Vec3::ZERO, axis: Vec3::Y, radius: 1.0, half_height: 2.0 };
        let above = Sphere::new(Vec3::new(0.0, 10.0, 0.0), 0.5);
        assert!(!sphere_intersects_cylinder(&above, &cyl));
        let inside = Sphere::new(Vec3::new(0.2, 1.0, 0.0), 0.5);
        assert!(sphere_intersects_cylinder(&inside, &cyl));
    }
}
