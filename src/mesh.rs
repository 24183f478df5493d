//! Host-side mesh representation carrying the edge data the shadow-volume
//! builder needs. Full mesh I/O, model preprocessing (T-junction
//! elimination, vertex welding, LOD generation) is explicitly out of scope
//! and assumed to be supplied by the host application; this module only
//! defines the shape that `ShadowVolumeBuilder` consumes, plus a couple of
//! small primitive builders used by the demo binary and tests.

use glam::Vec3;

/// A mesh edge links two adjacent triangles, or one triangle and a sentinel
/// (`None`) for an open boundary edge. Open edges (single-triangle) are
/// always emitted as silhouette edges.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub vertex_index: [u32; 2],
    pub triangle: [Option<u32>; 2],
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub vertex_index: [u32; 3],
}

/// A single LOD's geometry. Only LOD 0 needs edge data — the shadow volume
/// builder always draws silhouettes from the most detailed level: an
/// ordered list of LODs with edge data on LOD 0.
#[derive(Debug, Clone)]
pub struct Lod {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
    pub edges: Vec<Edge>,
    /// True iff every edge has two adjacent triangles (no open boundary).
    pub closed: bool,
}

impl Lod {
    pub fn triangle_normal(&self, t: &Triangle) -> Vec3 {
        let [a, b, c] = t.vertex_index.map(|i| self.positions[i as usize]);
        (b - a).cross(c - a).normalize_or_zero()
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub lods: Vec<Lod>,
}

impl Model {
    pub fn lod0(&self) -> &Lod {
        &self.lods[0]
    }
}

/// Builds edges for a triangle list by pairing shared undirected vertex
/// pairs; a pair seen by exactly one triangle becomes an open edge.
pub fn build_edges(triangles: &[Triangle]) -> Vec<Edge> {
    use std::collections::HashMap;

    let mut map: HashMap<(u32, u32), Edge> = HashMap::new();
    for (ti, tri) in triangles.iter().enumerate() {
        let ti = ti as u32;
        for k in 0..3 {
            let a = tri.vertex_index[k];
            let b = tri.vertex_index[(k + 1) % 3];
            let key = (a.min(b), a.max(b));
            map.entry(key)
                .and_modify(|e| {
                    e.triangle[1] = Some(ti);
                })
                .or_insert(Edge { vertex_index: [a, b], triangle: [Some(ti), None] });
        }
    }
    map.into_values().collect()
}

/// Axis-aligned unit cube (12 triangles, closed, hole-free) — used by tests
/// and the demo scene as a simple watertight silhouette source.
pub fn unit_cube() -> Lod {
    let p = [
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, 0.5, 0.5),
    ];
    let quad = |a: u32, b: u32, c: u32, d: u32, tris: &mut Vec<Triangle>| {
        tris.push(Triangle { vertex_index: [a, b, c] });
        tris.push(Triangle { vertex_index: [a, c, d] });
    };
    let mut triangles = Vec::with_capacity(12);
    quad(0, 1, 2, 3, &mut triangles); // -Z
    quad(5, 4, 7, 6, &mut triangles); // +Z
    quad(4, 0, 3, 7, &mut triangles); // -X
    quad(1, 5, 6, 2, &mut triangles); // +X
    quad(3, 2, 6, 7, &mut triangles); // +Y
    quad(4, 5, 1, 0, &mut triangles); // -Y

    let edges = build_edges(&triangles);
    let closed = edges.iter().all(|e| e.triangle[1].is_some());
    Lod { positions: p.to_vec(), triangles, edges, closed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cube_is_closed_with_twelve_triangles() {
        let cube = unit_cube();
        assert_eq!(cube.triangles.len(), 12);
        assert!(cube.closed);
        assert_eq!(cube.edges.len(), 18);
    }
}
