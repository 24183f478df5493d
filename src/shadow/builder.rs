//! Cap/side assembly and index-encoding selection, plus the per-object
//! precomputed shadow-volume bounding primitives used for
//! `SHADOW_VOLUME_VISIBILITY_TEST`.

use glam::Vec3;

use crate::bounds::{Cylinder, Sphere};
use crate::context::RenderContext;
use crate::light::{ConeOrBeam, Light, LightKind};
use crate::mesh::Lod;

use super::silhouette::{classify_faces, extract_silhouette, SilhouetteEdge};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EncodingFlags: u8 {
        const SHORT_INDICES   = 1 << 0;
        const TRIANGLE_STRIP  = 1 << 1;
        const TRIANGLE_FAN    = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderType {
    DepthPass,
    DepthFail { skip_light_cap: bool, skip_dark_cap: bool },
}

/// Sentinel index value the strip encoding needs to mark a restart.
pub const RESTART_16: u32 = 0xFFFF;
pub const RESTART_32: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone)]
pub struct ShadowVolumeGeometry {
    pub indices: Vec<u32>,
    pub vertex_count: u32,
    pub render_type: RenderType,
    pub encoding: EncodingFlags,
}

impl ShadowVolumeGeometry {
    pub fn empty(render_type: RenderType) -> Self {
        ShadowVolumeGeometry { indices: Vec::new(), vertex_count: 0, render_type, encoding: EncodingFlags::empty() }
    }

    pub fn is_degenerate(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Conservative per-object shadow volume bounds, attached to an object for
/// static lights and consulted by `SHADOW_VOLUME_VISIBILITY_TEST`
/// without rebuilding the actual geometry.
#[derive(Debug, Clone, Copy)]
pub enum ShadowVolumePrimitive {
    /// Point/spot: the volume swept from the light through the object,
    /// bounded to the light's radial range.
    PyramidCone { apex: Vec3, axis: Vec3, half_angle: f32, length: f32 },
    /// Directional: a half-infinite extrusion bounded to a finite length for
    /// the purpose of a conservative bounding test.
    HalfCylinder { center: Vec3, axis: Vec3, radius: f32, length: f32 },
    /// Beam: bounded at both ends.
    Cylinder(Cylinder),
}

impl ShadowVolumePrimitive {
    pub fn bounding_sphere(&self) -> Sphere {
        match self {
            ShadowVolumePrimitive::PyramidCone { apex, axis, half_angle, length } => {
                let far_radius = length * half_angle.tan();
                let center = *apex + *axis * (*length * 0.5);
                let radius = ((*length * 0.5).powi(2) + far_radius.powi(2)).sqrt();
                Sphere::new(center, radius)
            }
            ShadowVolumePrimitive::HalfCylinder { center, axis, radius, length } => {
                let mid = *center + *axis * (*length * 0.5);
                Sphere::new(mid, (radius.powi(2) + (*length * 0.5).powi(2)).sqrt())
            }
            ShadowVolumePrimitive::Cylinder(c) => Sphere::new(c.center, (c.radius.powi(2) + c.half_height.powi(2)).sqrt()),
        }
    }

    pub fn for_light(light: &Light, object_center: Vec3, object_radius: f32) -> Self {
        match light.kind {
            LightKind::Point => {
                let apex = light.position_or_direction;
                let axis = (object_center - apex).normalize_or_zero();
                let dist = object_center.distance(apex);
                let half_angle = (object_radius / dist.max(1e-4)).atan().max(0.05);
                ShadowVolumePrimitive::PyramidCone { apex, axis, half_angle, length: light.attenuation.radial_range }
            }
            LightKind::Spot => {
                let apex = light.position_or_direction;
                let axis = match light.cone_or_beam {
                    Some(ConeOrBeam::Spot { axis, .. }) => axis,
                    _ => Vec3::NEG_Y,
                };
                let half_angle = (object_radius / apex.distance(object_center).max(1e-4)).atan().max(0.05);
                ShadowVolumePrimitive::PyramidCone { apex, axis, half_angle, length: light.attenuation.radial_range }
            }
            LightKind::Directional => ShadowVolumePrimitive::HalfCylinder {
                center: object_center,
                axis: light.position_or_direction,
                radius: object_radius,
                length: object_radius * 4.0,
            },
            LightKind::Beam => {
                let axis = -light.position_or_direction;
                ShadowVolumePrimitive::Cylinder(Cylinder { center: object_center, axis, radius: object_radius, half_height: object_radius * 2.0 })
            }
        }
    }
}

/// Whether primitive-restart strips are available and whether the backend
/// can link silhouette edges into a triangle fan are properties of the GPU
/// backend / mesh topology passed in by the caller.
pub struct EncodingCapabilities {
    pub primitive_restart: bool,
}

/// Builds the full shadow-volume geometry for one (mesh, light, render
/// type) combination. `light_xyz`/`light_w` are the packed model-space
/// light vector.
pub fn build_shadow_volume(
    ctx: &mut RenderContext,
    lod: &Lod,
    light: &Light,
    light_xyz: Vec3,
    light_w: f32,
    render_type: RenderType,
    caps: &EncodingCapabilities,
) -> ShadowVolumeGeometry {
    ctx.scratch.ensure_face_type_capacity(lod.triangles.len());
    classify_faces(lod, light_xyz, light_w, &mut ctx.scratch.face_type);
    ctx.scratch.reset_for_mesh();
    let mut silhouette: Vec<SilhouetteEdge> = Vec::new();
    extract_silhouette(lod, &ctx.scratch.face_type, &mut silhouette);

    if silhouette.is_empty() && matches!(render_type, RenderType::DepthPass) {
        // Degenerate: still return a zero-vertex entry so future identical
        // lookups short-circuit with no draw call.
        return ShadowVolumeGeometry::empty(render_type);
    }

    let is_point_like = matches!(light.kind, LightKind::Point | LightKind::Spot);
    let sentinel_index = lod.positions.len() as u32;
    let extruded_base = lod.positions.len() as u32; // host duplicates positions [0..n) into [n..2n) as extruded copies

    let mut indices = Vec::new();

    // --- sides ---
    let mut fan_ok = is_point_like == false && lod.closed;
    if is_point_like {
        for (i, edge) in silhouette.iter().enumerate() {
            let e = &lod.edges[edge.edge_index as usize];
            let (v0, v1) = oriented_vertices(e, edge.reversed);
            let extr_v0 = extruded_base + v0;
            let extr_v1 = extruded_base + v1;
            indices.extend_from_slice(&[v0, v1, extr_v1, v0, extr_v1, extr_v0]);
            let _ = i;
        }
    } else {
        // Directional/beam: try to link silhouette edges by shared vertex
        // into a single fan rooted at the sentinel.
        if fan_ok {
            match link_into_fan(lod, &silhouette) {
                Some(loop_verts) => {
                    indices.push(sentinel_index);
                    indices.extend(loop_verts.iter().copied());
                    indices.push(loop_verts[0]);
                }
                None => {
                    fan_ok = false;
                }
            }
        }
        if !fan_ok {
            for edge in &silhouette {
                let e = &lod.edges[edge.edge_index as usize];
                let (v0, v1) = oriented_vertices(e, edge.reversed);
                indices.extend_from_slice(&[v0, v1, sentinel_index]);
            }
        }
    }

    let nu_side_indices = indices.len();

    // --- caps (depth-fail only) ---
    if let RenderType::DepthFail { skip_light_cap, skip_dark_cap } = render_type {
        if !skip_light_cap {
            for (ti, tri) in lod.triangles.iter().enumerate() {
                if face_is_light_facing(&ctx.scratch.face_type, ti as u32) {
                    indices.extend_from_slice(&tri.vertex_index);
                }
            }
        }
        if !skip_dark_cap {
            for (ti, tri) in lod.triangles.iter().enumerate() {
                if !face_is_light_facing(&ctx.scratch.face_type, ti as u32) {
                    // Reversed winding, vertex indices offset into the
                    // extruded half.
                    let [a, b, c] = tri.vertex_index;
                    indices.extend_from_slice(&[extruded_base + a, extruded_base + c, extruded_base + b]);
                }
            }
        }
    }

    let max_vertex_index = indices.iter().copied().max().unwrap_or(0);
    let mut encoding = EncodingFlags::empty();
    if max_vertex_index < 0xFFFF {
        encoding |= EncodingFlags::SHORT_INDICES;
    }
    if is_point_like && caps.primitive_restart && nu_side_indices > 0 {
        encoding |= EncodingFlags::TRIANGLE_STRIP;
        indices = restripe_quads_with_restart(&indices[..nu_side_indices], encoding.contains(EncodingFlags::SHORT_INDICES))
            .into_iter()
            .chain(indices[nu_side_indices..].iter().copied())
            .collect();
    } else if !is_point_like && fan_ok {
        encoding |= EncodingFlags::TRIANGLE_FAN;
    }

    ShadowVolumeGeometry {
        vertex_count: max_vertex_index + 1,
        indices,
        render_type,
        encoding,
    }
}

fn oriented_vertices(e: &crate::mesh::Edge, reversed: bool) -> (u32, u32) {
    if reversed {
        (e.vertex_index[1], e.vertex_index[0])
    } else {
        (e.vertex_index[0], e.vertex_index[1])
    }
}

fn face_is_light_facing(face_type: &[u8], triangle: u32) -> bool {
    super::silhouette::FaceType::from_bits_truncate(face_type[triangle as usize])
        .contains(super::silhouette::FaceType::LIGHT_FACING)
}

/// Attempts to link silhouette edges by shared vertex into one closed
/// vertex loop, returning `None` (triggering the triangle-list fallback,
/// logged at debug level) when the edges don't form a single loop —
/// i.e. the model isn't closed/hole-free for this light.
fn link_into_fan(lod: &Lod, silhouette: &[SilhouetteEdge]) -> Option<Vec<u32>> {
    use std::collections::HashMap;

    if silhouette.is_empty() {
        return None;
    }
    let mut next: HashMap<u32, u32> = HashMap::new();
    for edge in silhouette {
        let e = &lod.edges[edge.edge_index as usize];
        let (v0, v1) = oriented_vertices(e, edge.reversed);
        if next.insert(v0, v1).is_some() {
            log::debug!("triangle-fan construction failed: vertex {v0} has multiple successors");
            return None;
        }
    }

    let start = silhouette[0].edge_index;
    let (mut current, _) = oriented_vertices(&lod.edges[start as usize], silhouette[0].reversed);
    let mut loop_verts = Vec::with_capacity(silhouette.len());
    for _ in 0..silhouette.len() {
        loop_verts.push(current);
        current = match next.get(&current) {
            Some(&v) => v,
            None => {
                log::debug!("triangle-fan construction failed: silhouette edges don't form a single loop");
                return None;
            }
        };
    }
    if current != loop_verts[0] {
        log::debug!("triangle-fan construction failed: loop doesn't close");
        return None;
    }
    Some(loop_verts)
}

/// Reassembles the per-quad triangle-list side indices (6 per silhouette
/// edge: two triangles) into a single strip with a restart index inserted
/// between quads.
fn restripe_quads_with_restart(list_indices: &[u32], short: bool) -> Vec<u32> {
    let restart = if short { RESTART_16 } else { RESTART_32 };
    let mut strip = Vec::with_capacity(list_indices.len() / 6 * 5);
    for quad in list_indices.chunks(6) {
        // quad = [v0, v1, extr_v1, v0, extr_v1, extr_v0]
        if quad.len() < 6 {
            continue;
        }
        if !strip.is_empty() {
            strip.push(restart);
        }
        strip.extend_from_slice(&[quad[0], quad[1], quad[5], quad[2]]);
    }
    strip
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{Attenuation, LightId};
    use crate::mesh::unit_cube;

    fn caps() -> EncodingCapabilities {
        EncodingCapabilities { primitive_restart: true }
    }

    #[test]
    fn point_light_inside_cube_yields_depth_fail_all_light_cap() {
        let cube = unit_cube();
        let mut ctx = RenderContext::new(0);
        let light = Light::new_point(LightId(0), Vec3::ONE, Vec3::ZERO, Attenuation { linear_range: 1.0, cutoff: 0.01, radial_range: 10.0 });
        let render_type = RenderType::DepthFail { skip_light_cap: false, skip_dark_cap: false };
        let geom = build_shadow_volume(&mut ctx, &cube, &light, Vec3::ZERO, 1.0, render_type, &caps());
        // No silhouette edges (all faces see the light as behind their
        // plane uniformly, scenario 2), so sides contribute nothing, but
        // the light cap still covers every triangle.
        assert!(!geom.is_degenerate());
    }

    #[test]
    fn directional_light_along_z_emits_fan_with_six_indices() {
        let cube = unit_cube();
        let mut ctx = RenderContext::new(0);
        let light = Light::new_directional(LightId(0), Vec3::ONE, Vec3::new(0.0, 0.0, -1.0));
        let geom = build_shadow_volume(&mut ctx, &cube, &light, Vec3::new(0.0, 0.0, 1.0), 0.0, RenderType::DepthPass, &caps());
        assert!(geom.encoding.contains(EncodingFlags::TRIANGLE_FAN));
        // fan start (sentinel) + 4 edge endpoints + close = 6.
        assert_eq!(geom.indices.len(), 6);
    }

    #[test]
    fn degenerate_silhouette_with_no_caps_is_zero_vertex() {
        let cube = unit_cube();
        let mut ctx = RenderContext::new(0);
        let light = Light::new_point(LightId(0), Vec3::ONE, Vec3::ZERO, Attenuation { linear_range: 1.0, cutoff: 0.01, radial_range: 10.0 });
        let geom = build_shadow_volume(&mut ctx, &cube, &light, Vec3::ZERO, 1.0, RenderType::DepthPass, &caps());
        assert!(geom.is_degenerate());
    }
}
