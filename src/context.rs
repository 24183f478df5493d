//! `RenderContext` replaces ambient mutable `current_frame`,
//! `current_light_index` and scene-pointer globals with explicit
//! frame-scoped state. Its lifetime is exactly one
//! [`crate::renderer::Renderer::render`] call: it is built at frame start
//! and threaded by reference into every pass and cache operation.

/// Frame-scoped state plus the scratch buffers that are grown
/// monotonically and reused across all objects and lights within a frame.
pub struct RenderContext {
    pub current_frame: u64,
    /// -1 while in the ambient or final pass; the index of the light
    /// currently being rendered during the per-light loop otherwise.
    pub current_light_index: i32,
    pub(crate) scratch: FrameScratch,
}

impl RenderContext {
    pub fn new(current_frame: u64) -> Self {
        Self {
            current_frame,
            current_light_index: -1,
            scratch: FrameScratch::default(),
        }
    }

    pub fn is_ambient_or_final_pass(&self) -> bool {
        self.current_light_index < 0
    }
}

/// Scratch buffers reused across the whole frame: grown monotonically and
/// reused across all objects and lights within a frame.
#[derive(Default)]
pub(crate) struct FrameScratch {
    pub face_type: Vec<u8>,
    pub silhouette_edges: Vec<u32>,
    pub shadow_indices: Vec<u32>,
}

impl FrameScratch {
    pub fn reset_for_mesh(&mut self) {
        self.silhouette_edges.clear();
        self.shadow_indices.clear();
    }

    /// Grow `face_type` to at least `nu_faces` bytes (one byte per triangle —
    /// simpler than packing tighter, and memory isn't the constraint here),
    /// with headroom to avoid repeated reallocation thrash.
    pub fn ensure_face_type_capacity(&mut self, nu_faces: usize) {
        if self.face_type.len() < nu_faces {
            let new_len = (nu_faces * 3 / 2).max(64);
            self.face_type.resize(new_len, 0);
        }
    }
}
