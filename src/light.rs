//! Light classification, bounding-volume derivation, and the static
//! per-light object/shadow-caster list precompute.

use bitflags::bitflags;
use glam::Vec3;

use crate::bounds::{Aabb, Cylinder, Sphere, SphericalSector};
use crate::octree::EntityRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
    Beam,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DynamicLightFlags: u32 {
        const DYNAMIC_POSITION       = 1 << 0;
        const DYNAMIC_DIRECTION      = 1 << 1;
        const DYNAMIC_ATTENUATION    = 1 << 2;
        const DYNAMIC_SPOT_EXPONENT  = 1 << 3;
        const DYNAMIC_SHADOW_VOLUME  = 1 << 4;
        const DYNAMIC_LIGHT_VOLUME   = 1 << 5;
        const WORST_CASE_BOUNDS_SPHERE = 1 << 6;
        const STATIC_OBJECTS_LIST      = 1 << 7;
        const STATIC_SHADOW_CASTER_LIST = 1 << 8;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Attenuation {
    pub linear_range: f32,
    pub cutoff: f32,
    pub radial_range: f32,
}

/// Spotlight cone or beam-extrusion parameters: axis plus either an
/// exponent (spot) or a radius (beam).
#[derive(Debug, Clone, Copy)]
pub enum ConeOrBeam {
    Spot { axis: Vec3, exponent: f32 },
    Beam { axis: Vec3, radius: f32 },
}

/// Primary bounding volumes, computed once per dynamic change.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightBounds {
    pub sphere: Option<Sphere>,
    pub cylinder: Option<Cylinder>,
    pub sector: Option<SphericalSector>,
    pub aabb: Option<Aabb>,
}

pub struct Light {
    pub id: LightId,
    pub kind: LightKind,
    pub color: Vec3,
    /// Packed with w=0 for directional, w=1 for point/spot, w=0 with the
    /// negated beam direction used as the vector for beam lights.
    pub position_or_direction: Vec3,
    pub w: f32,
    pub attenuation: Attenuation,
    pub cone_or_beam: Option<ConeOrBeam>,
    pub primary_bounds: LightBounds,
    pub worst_case_sphere: Option<Sphere>,
    pub dynamic: DynamicLightFlags,

    pub projected_size: f32,
    pub most_recent_shadow_volume_change: u64,
    pub changing_every_frame: bool,
    pub shadow_map_required: bool,

    /// Partition: `[0, partially_inside_count)` boundary-intersect the light
    /// volume, `[partially_inside_count, len)` lie strictly inside.
    pub light_volume_object: Vec<EntityRef>,
    pub partially_inside_count: usize,
    pub shadow_caster_object: Vec<EntityRef>,
}

impl Light {
    pub fn new_directional(id: LightId, color: Vec3, direction: Vec3) -> Self {
        Light {
            id,
            kind: LightKind::Directional,
            color,
            position_or_direction: direction.normalize(),
            w: 0.0,
            attenuation: Attenuation { linear_range: f32::MAX, cutoff: 0.0, radial_range: f32::MAX },
            cone_or_beam: None,
            primary_bounds: LightBounds::default(),
            worst_case_sphere: None,
            dynamic: DynamicLightFlags::empty(),
            projected_size: f32::MAX,
            most_recent_shadow_volume_change: 0,
            changing_every_frame: false,
            shadow_map_required: false,
            light_volume_object: Vec::new(),
            partially_inside_count: 0,
            shadow_caster_object: Vec::new(),
        }
    }

    pub fn new_point(id: LightId, color: Vec3, position: Vec3, attenuation: Attenuation) -> Self {
        let sphere = Sphere::new(position, attenuation.radial_range);
        Light {
            id,
            kind: LightKind::Point,
            color,
            position_or_direction: position,
            w: 1.0,
            attenuation,
            cone_or_beam: None,
            primary_bounds: LightBounds { sphere: Some(sphere), aabb: Some(sphere_aabb(&sphere)), ..Default::default() },
            worst_case_sphere: None,
            dynamic: DynamicLightFlags::empty(),
            projected_size: f32::MAX,
            most_recent_shadow_volume_change: 0,
            changing_every_frame: false,
            shadow_map_required: false,
            light_volume_object: Vec::new(),
            partially_inside_count: 0,
            shadow_caster_object: Vec::new(),
        }
    }

    pub fn new_spot(
        id: LightId,
        color: Vec3,
        position: Vec3,
        axis: Vec3,
        exponent: f32,
        attenuation: Attenuation,
    ) -> Self {
        let half_angle = spot_bounding_half_angle(exponent);
        let sector = SphericalSector { apex: position, axis: axis.normalize(), radius: attenuation.radial_range, half_angle };
        let cylinder = cylinder_from_sector(&sector);
        let sphere = sphere_from_cylinder(&cylinder);
        Light {
            id,
            kind: LightKind::Spot,
            color,
            position_or_direction: position,
            w: 1.0,
            attenuation,
            cone_or_beam: Some(ConeOrBeam::Spot { axis: axis.normalize(), exponent }),
            primary_bounds: LightBounds {
                sphere: Some(sphere),
                cylinder: Some(cylinder),
                sector: Some(sector),
                aabb: Some(sphere_aabb(&sphere)),
            },
            worst_case_sphere: None,
            dynamic: DynamicLightFlags::empty(),
            projected_size: f32::MAX,
            most_recent_shadow_volume_change: 0,
            changing_every_frame: false,
            shadow_map_required: false,
            light_volume_object: Vec::new(),
            partially_inside_count: 0,
            shadow_caster_object: Vec::new(),
        }
    }

    pub fn new_beam(
        id: LightId,
        color: Vec3,
        direction: Vec3,
        radius: f32,
        half_length: f32,
        origin: Vec3,
    ) -> Self {
        let axis = direction.normalize();
        let cylinder = Cylinder { center: origin, axis, radius, half_height: half_length };
        let sphere = sphere_from_cylinder(&cylinder);
        Light {
            id,
            kind: LightKind::Beam,
            color,
            // Beam sides extrude to infinity along the negated direction.
            position_or_direction: -axis,
            w: 0.0,
            attenuation: Attenuation { linear_range: f32::MAX, cutoff: 0.0, radial_range: f32::MAX },
            cone_or_beam: Some(ConeOrBeam::Beam { axis, radius }),
            primary_bounds: LightBounds {
                sphere: Some(sphere),
                cylinder: Some(cylinder),
                aabb: Some(sphere_aabb(&sphere)),
                ..Default::default()
            },
            worst_case_sphere: None,
            dynamic: DynamicLightFlags::empty(),
            projected_size: f32::MAX,
            most_recent_shadow_volume_change: 0,
            changing_every_frame: false,
            shadow_map_required: false,
            light_volume_object: Vec::new(),
            partially_inside_count: 0,
            shadow_caster_object: Vec::new(),
        }
    }

    pub fn is_directional(&self) -> bool {
        self.kind == LightKind::Directional
    }

    pub fn set_worst_case_bounds(&mut self, sphere: Sphere) {
        self.worst_case_sphere = Some(sphere);
        self.dynamic |= DynamicLightFlags::WORST_CASE_BOUNDS_SPHERE;
    }

    pub fn mark_position_changed(&mut self, new_position: Vec3) {
        self.position_or_direction = new_position;
        self.dynamic |= DynamicLightFlags::DYNAMIC_POSITION;
        self.recompute_bounds_if_possible();
    }

    pub fn mark_direction_changed(&mut self, new_direction: Vec3) {
        self.position_or_direction = new_direction.normalize();
        self.dynamic |= DynamicLightFlags::DYNAMIC_DIRECTION;
        self.recompute_bounds_if_possible();
    }

    pub fn mark_attenuation_changed(&mut self, attenuation: Attenuation) {
        self.attenuation = attenuation;
        self.dynamic |= DynamicLightFlags::DYNAMIC_ATTENUATION;
        self.recompute_bounds_if_possible();
    }

    /// Re-derives the primary bounds after a dynamic change, and — where the
    /// geometry still admits a computable worst case — also sets
    /// `WORST_CASE_BOUNDS_SPHERE`.
    fn recompute_bounds_if_possible(&mut self) {
        match self.kind {
            LightKind::Directional => {}
            LightKind::Point => {
                let sphere = Sphere::new(self.position_or_direction, self.attenuation.radial_range);
                self.primary_bounds.sphere = Some(sphere);
                self.primary_bounds.aabb = Some(sphere_aabb(&sphere));
            }
            LightKind::Spot => {
                if let Some(ConeOrBeam::Spot { axis, exponent }) = self.cone_or_beam {
                    let half_angle = spot_bounding_half_angle(exponent);
                    let sector = SphericalSector {
                        apex: self.position_or_direction,
                        axis,
                        radius: self.attenuation.radial_range,
                        half_angle,
                    };
                    let cylinder = cylinder_from_sector(&sector);
                    let sphere = sphere_from_cylinder(&cylinder);
                    self.primary_bounds = LightBounds {
                        sphere: Some(sphere),
                        cylinder: Some(cylinder),
                        sector: Some(sector),
                        aabb: Some(sphere_aabb(&sphere)),
                    };
                }
            }
            LightKind::Beam => {}
        }
    }
}

fn sphere_aabb(s: &Sphere) -> Aabb {
    Aabb::new(s.center - Vec3::splat(s.radius), s.center + Vec3::splat(s.radius))
}

/// The angular half-width at which spotlight angular attenuation falls below
/// 0.01: `acos(exp(ln(0.01) / exponent))`.
pub fn spot_bounding_half_angle(exponent: f32) -> f32 {
    let exponent = exponent.max(1e-4);
    (((0.01_f32).ln() / exponent).exp()).acos()
}

/// A spotlight's bounding cylinder is derived from its spherical sector: the
/// cylinder spans the sector's axial extent with a radius equal to the
/// sector's widest cross-section.
pub fn cylinder_from_sector(sector: &SphericalSector) -> Cylinder {
    let half_height = sector.radius * 0.5;
    let center = sector.apex + sector.axis * half_height;
    let radius = sector.radius * sector.half_angle.sin();
    Cylinder { center, axis: sector.axis, radius, half_height }
}

/// A spot light's bounding sphere derives from its sector; a beam light's
/// derives from its cylinder.
pub fn sphere_from_cylinder(cylinder: &Cylinder) -> Sphere {
    let radius = (cylinder.radius * cylinder.radius + cylinder.half_height * cylinder.half_height).sqrt();
    Sphere::new(cylinder.center, radius)
}

/// Priority used by active-light selection: directional beats
/// non-directional; among directional, higher luminance wins; among
/// point-with-linear-attenuation, estimated attenuated intensity at the
/// point of interest wins; otherwise squared distance (smaller wins).
pub fn light_priority_key(light: &Light, point_of_interest: Vec3) -> LightPriority {
    match light.kind {
        LightKind::Directional => {
            let luminance = light.color.dot(Vec3::new(0.2126, 0.7152, 0.0722));
            LightPriority::Directional { luminance }
        }
        LightKind::Point if light.attenuation.linear_range > 0.0 => {
            let dist = light.position_or_direction.distance(point_of_interest).max(1e-4);
            let attenuation = 1.0 / (1.0 + light.attenuation.linear_range * dist);
            let luminance = light.color.dot(Vec3::new(0.2126, 0.7152, 0.0722));
            LightPriority::AttenuatedIntensity { intensity: luminance * attenuation }
        }
        _ => {
            let sqr_dist = light.position_or_direction.distance_squared(point_of_interest);
            LightPriority::Distance { sqr_dist }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightPriority {
    Directional { luminance: f32 },
    AttenuatedIntensity { intensity: f32 },
    Distance { sqr_dist: f32 },
}

impl LightPriority {
    fn rank(&self) -> u8 {
        match self {
            LightPriority::Directional { .. } => 2,
            LightPriority::AttenuatedIntensity { .. } => 1,
            LightPriority::Distance { .. } => 0,
        }
    }

    /// Higher is better.
    fn score(&self) -> f32 {
        match self {
            LightPriority::Directional { luminance } => *luminance,
            LightPriority::AttenuatedIntensity { intensity } => *intensity,
            // Smaller squared distance wins, so invert for a "higher is better" score.
            LightPriority::Distance { sqr_dist } => -*sqr_dist,
        }
    }
}

/// Total order for sorting the active-light candidate list: rank (kind)
/// first, then the within-kind score.
pub fn compare_light_priority(a: &LightPriority, b: &LightPriority) -> std::cmp::Ordering {
    a.rank()
        .cmp(&b.rank())
        .then_with(|| a.score().partial_cmp(&b.score()).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_half_angle_matches_definition() {
        let exponent = 8.0;
        let half_angle = spot_bounding_half_angle(exponent);
        // exp(ln(0.01)/exponent) re-derives the cutoff cosine; acos of that is the angle.
        let expected = ((0.01_f32.ln() / exponent).exp()).acos();
        assert!((half_angle - expected).abs() < 1e-6);
    }

    #[test]
    fn directional_light_always_outranks_point_light() {
        let dir = Light::new_directional(LightId(0), Vec3::ONE, Vec3::NEG_Y);
        let point = Light::new_point(
            LightId(1),
            Vec3::ONE * 100.0,
            Vec3::ZERO,
            Attenuation { linear_range: 1.0, cutoff: 0.01, radial_range: 20.0 },
        );
        let poi = Vec3::ZERO;
        let a = light_priority_key(&dir, poi);
        let b = light_priority_key(&point, poi);
        assert_eq!(compare_light_priority(&a, &b), std::cmp::Ordering::Greater);
    }

    #[test]
    fn worst_case_bounds_flag_set_on_assignment() {
        let mut light = Light::new_point(
            LightId(0),
            Vec3::ONE,
            Vec3::ZERO,
            Attenuation { linear_range: 1.0, cutoff: 0.01, radial_range: 5.0 },
        );
        assert!(!light.dynamic.contains(DynamicLightFlags::WORST_CASE_BOUNDS_SPHERE));
        light.set_worst_case_bounds(Sphere::new(Vec3::ZERO, 10.0));
        assert!(light.dynamic.contains(DynamicLightFlags::WORST_CASE_BOUNDS_SPHERE));
    }
}
