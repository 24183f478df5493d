//! External interface boundary: everything the renderer needs from a
//! GPU abstraction and a shader manager, expressed as traits so the core
//! stays backend-agnostic. GPU command issuance, shader compilation/linking,
//! HDR tone-mapping and shadow-map rendering are explicitly out of scope —
//! they live behind these two traits, implemented by the host.

use crate::frustum::ScissorsRect;
use crate::light::Light;
use crate::scene::Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DepthFunc {
    Less,
    LessEqual,
    Equal,
    Greater,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilFace {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrWrap,
    DecrWrap,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilFunc {
    Always,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    None,
    Additive,
}

/// Opaque handle to a GPU-resident index buffer, returned by
/// `create_index_buffer` and handed back on draw/destroy calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

/// The fixed-function and framebuffer-state surface a stencil shadow volume
/// renderer drives every frame. Command batching/queuing is left to the
/// implementation; this trait only fixes the vocabulary.
pub trait GpuDriver {
    fn set_depth_test(&mut self, enabled: bool);
    fn set_depth_mask(&mut self, enabled: bool);
    fn set_depth_func(&mut self, func: DepthFunc);
    /// Depth range ladder: ambient/final passes use a slightly pulled-in far
    /// value to leave room for stencil-volume depth writes to win ties
    /// during the lighting passes.
    fn set_depth_range(&mut self, near: f32, far: f32);
    fn set_blend(&mut self, mode: BlendMode);

    fn set_stencil_test(&mut self, enabled: bool);
    fn set_stencil_func(&mut self, face: StencilFace, func: StencilFunc, reference: i32, mask: u32);
    fn set_stencil_op_separate(&mut self, face: StencilFace, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp);

    fn set_scissor_test(&mut self, enabled: bool);
    fn set_scissor(&mut self, rect: ScissorsRect);
    /// Hardware depth-bounds test, where the backend supports it: where
    /// available, depth bounds narrow the per-light pass further.
    fn set_depth_bounds(&mut self, near: f32, far: f32) -> bool {
        let _ = (near, far);
        false
    }

    fn bind_framebuffer_default(&mut self);
    fn clear(&mut self, color: bool, depth: bool, stencil: bool);

    fn create_index_buffer(&mut self, indices: &[u32], width: IndexWidth) -> IndexBufferHandle;
    fn upload_index_buffer(&mut self, handle: IndexBufferHandle, indices: &[u32]);
    fn destroy_index_buffer(&mut self, handle: IndexBufferHandle);

    fn bind_index_buffer(&mut self, handle: IndexBufferHandle);
    fn draw_indexed(&mut self, vertex_count: u32, primitive_restart: bool);
}

/// Shader program selection and uniform upload for each of the render
/// passes the multi-pass lighting pipeline threads through. Shader
/// compilation/linking itself is out of scope; this trait only fixes when
/// each program is selected and what per-call state it needs.
pub trait ShaderManager {
    fn init_shaders_before_frame(&mut self);
    fn init_shaders_before_light(&mut self, light: &Light);
    fn init_shadow_volume_shader(&mut self);

    fn draw_object_ambient_pass(&mut self, object: &Object);
    fn draw_object_single_pass(&mut self, object: &Object, light: &Light);
    fn draw_object_multi_pass_lighting_pass(&mut self, object: &Object, light: &Light);
    fn draw_object_final_pass(&mut self, object: &Object);
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Records every call instead of touching a real GPU; used to assert the
    /// renderer's state-machine sequencing in unit tests without a context.
    #[derive(Debug, Default)]
    pub struct RecordingDriver {
        pub calls: Vec<String>,
        next_handle: u64,
    }

    impl RecordingDriver {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl GpuDriver for RecordingDriver {
        fn set_depth_test(&mut self, enabled: bool) {
            self.calls.push(format!("depth_test({enabled})"));
        }
        fn set_depth_mask(&mut self, enabled: bool) {
            self.calls.push(format!("depth_mask({enabled})"));
        }
        fn set_depth_func(&mut self, func: DepthFunc) {
            self.calls.push(format!("depth_func({func:?})"));
        }
        fn set_depth_range(&mut self, near: f32, far: f32) {
            self.calls.push(format!("depth_range({near}, {far})"));
        }
        fn set_blend(&mut self, mode: BlendMode) {
            self.calls.push(format!("blend({mode:?})"));
        }
        fn set_stencil_test(&mut self, enabled: bool) {
            self.calls.push(format!("stencil_test({enabled})"));
        }
        fn set_stencil_func(&mut self, face: StencilFace, func: StencilFunc, reference: i32, mask: u32) {
            self.calls.push(format!("stencil_func({face:?}, {func:?}, {reference}, {mask})"));
        }
        fn set_stencil_op_separate(&mut self, face: StencilFace, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
            self.calls.push(format!("stencil_op({face:?}, {fail:?}, {depth_fail:?}, {depth_pass:?})"));
        }
        fn set_scissor_test(&mut self, enabled: bool) {
            self.calls.push(format!("scissor_test({enabled})"));
        }
        fn set_scissor(&mut self, rect: ScissorsRect) {
            self.calls.push(format!("scissor({rect:?})"));
        }
        fn bind_framebuffer_default(&mut self) {
            self.calls.push("bind_framebuffer_default".to_string());
        }
        fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
            self.calls.push(format!("clear({color}, {depth}, {stencil})"));
        }
        fn create_index_buffer(&mut self, indices: &[u32], width: IndexWidth) -> IndexBufferHandle {
            self.next_handle += 1;
            self.calls.push(format!("create_index_buffer(len={}, {width:?})", indices.len()));
            IndexBufferHandle(self.next_handle)
        }
        fn upload_index_buffer(&mut self, handle: IndexBufferHandle, indices: &[u32]) {
            self.calls.push(format!("upload_index_buffer({handle:?}, len={})", indices.len()));
        }
        fn destroy_index_buffer(&mut self, handle: IndexBufferHandle) {
            self.calls.push(format!("destroy_index_buffer({handle:?})"));
        }
        fn bind_index_buffer(&mut self, handle: IndexBufferHandle) {
            self.calls.push(format!("bind_index_buffer({handle:?})"));
        }
        fn draw_indexed(&mut self, vertex_count: u32, primitive_restart: bool) {
            self.calls.push(format!("draw_indexed({vertex_count}, {primitive_restart})"));
        }
    }

    #[test]
    fn recording_driver_captures_call_sequence() {
        let mut driver = RecordingDriver::new();
        driver.set_depth_test(true);
        let handle = driver.create_index_buffer(&[0, 1, 2], IndexWidth::U16);
        driver.bind_index_buffer(handle);
        driver.draw_indexed(3, false);
        assert_eq!(driver.calls.len(), 4);
        assert!(driver.calls[0].starts_with("depth_test"));
    }
}
