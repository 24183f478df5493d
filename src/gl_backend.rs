//! Reference `GpuDriver` implementation over raw `gl` calls, in a direct
//! immediate-mode style. Shader compilation/linking and uniform upload for
//! materials stays host-owned behind `ShaderManager`; this module only
//! implements the fixed-function/framebuffer surface handed to the core.

use gl::types::*;

use crate::frustum::ScissorsRect;
use crate::gpu::{BlendMode, DepthFunc, GpuDriver, IndexBufferHandle, IndexWidth, StencilFace, StencilFunc, StencilOp};

pub struct GlDriver {
    next_handle: u64,
    buffers: std::collections::HashMap<u64, GLuint>,
}

impl GlDriver {
    /// Safety: must be called with a current GL context established by the
    /// host before the renderer runs.
    pub fn new() -> Self {
        Self { next_handle: 0, buffers: std::collections::HashMap::new() }
    }

    fn gl_buffer(&self, handle: IndexBufferHandle) -> GLuint {
        *self.buffers.get(&handle.0).expect("unknown index buffer handle")
    }
}

impl Default for GlDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn gl_depth_func(f: DepthFunc) -> GLenum {
    match f {
        DepthFunc::Less => gl::LESS,
        DepthFunc::LessEqual => gl::LEQUAL,
        DepthFunc::Equal => gl::EQUAL,
        DepthFunc::Greater => gl::GREATER,
        DepthFunc::Always => gl::ALWAYS,
    }
}

fn gl_stencil_face(f: StencilFace) -> GLenum {
    match f {
        StencilFace::Front => gl::FRONT,
        StencilFace::Back => gl::BACK,
        StencilFace::FrontAndBack => gl::FRONT_AND_BACK,
    }
}

fn gl_stencil_func(f: StencilFunc) -> GLenum {
    match f {
        StencilFunc::Always => gl::ALWAYS,
        StencilFunc::Equal => gl::EQUAL,
        StencilFunc::NotEqual => gl::NOTEQUAL,
    }
}

fn gl_stencil_op(op: StencilOp) -> GLenum {
    match op {
        StencilOp::Keep => gl::KEEP,
        StencilOp::Zero => gl::ZERO,
        StencilOp::Replace => gl::REPLACE,
        StencilOp::IncrWrap => gl::INCR_WRAP,
        StencilOp::DecrWrap => gl::DECR_WRAP,
        StencilOp::Invert => gl::INVERT,
    }
}

impl GpuDriver for GlDriver {
    fn set_depth_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::DEPTH_TEST);
            } else {
                gl::Disable(gl::DEPTH_TEST);
            }
        }
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        unsafe { gl::DepthMask(enabled as GLboolean) }
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        unsafe { gl::DepthFunc(gl_depth_func(func)) }
    }

    fn set_depth_range(&mut self, near: f32, far: f32) {
        unsafe { gl::DepthRangef(near, far) }
    }

    fn set_blend(&mut self, mode: BlendMode) {
        unsafe {
            match mode {
                BlendMode::None => gl::Disable(gl::BLEND),
                BlendMode::Additive => {
                    gl::Enable(gl::BLEND);
                    gl::BlendFunc(gl::ONE, gl::ONE);
                }
            }
        }
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::STENCIL_TEST);
            } else {
                gl::Disable(gl::STENCIL_TEST);
            }
        }
    }

    fn set_stencil_func(&mut self, face: StencilFace, func: StencilFunc, reference: i32, mask: u32) {
        unsafe { gl::StencilFuncSeparate(gl_stencil_face(face), gl_stencil_func(func), reference, mask) }
    }

    fn set_stencil_op_separate(&mut self, face: StencilFace, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        unsafe { gl::StencilOpSeparate(gl_stencil_face(face), gl_stencil_op(fail), gl_stencil_op(depth_fail), gl_stencil_op(depth_pass)) }
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::SCISSOR_TEST);
            } else {
                gl::Disable(gl::SCISSOR_TEST);
            }
        }
    }

    fn set_scissor(&mut self, rect: ScissorsRect) {
        unsafe {
            gl::Scissor(rect.left as GLint, rect.bottom as GLint, (rect.right - rect.left) as GLsizei, (rect.top - rect.bottom) as GLsizei);
        }
    }

    fn bind_framebuffer_default(&mut self) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, 0) }
    }

    fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        let mut mask = 0;
        if color {
            mask |= gl::COLOR_BUFFER_BIT;
        }
        if depth {
            mask |= gl::DEPTH_BUFFER_BIT;
        }
        if stencil {
            mask |= gl::STENCIL_BUFFER_BIT;
        }
        unsafe { gl::Clear(mask) }
    }

    fn create_index_buffer(&mut self, indices: &[u32], width: IndexWidth) -> IndexBufferHandle {
        self.next_handle += 1;
        let mut buffer = 0;
        unsafe {
            gl::GenBuffers(1, &mut buffer);
        }
        self.buffers.insert(self.next_handle, buffer);
        let handle = IndexBufferHandle(self.next_handle);
        self.upload_index_buffer(handle, indices);
        let _ = width;
        handle
    }

    fn upload_index_buffer(&mut self, handle: IndexBufferHandle, indices: &[u32]) {
        let buffer = self.gl_buffer(handle);
        unsafe {
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, buffer);
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                (indices.len() * std::mem::size_of::<u32>()) as GLsizeiptr,
                indices.as_ptr() as *const _,
                gl::DYNAMIC_DRAW,
            );
        }
    }

    fn destroy_index_buffer(&mut self, handle: IndexBufferHandle) {
        if let Some(buffer) = self.buffers.remove(&handle.0) {
            unsafe { gl::DeleteBuffers(1, &buffer) }
        }
    }

    fn bind_index_buffer(&mut self, handle: IndexBufferHandle) {
        let buffer = self.gl_buffer(handle);
        unsafe { gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, buffer) }
    }

    fn draw_indexed(&mut self, vertex_count: u32, primitive_restart: bool) {
        unsafe {
            if primitive_restart {
                gl::Enable(gl::PRIMITIVE_RESTART);
            }
            gl::DrawElements(gl::TRIANGLES, vertex_count as GLsizei, gl::UNSIGNED_INT, std::ptr::null());
            if primitive_restart {
                gl::Disable(gl::PRIMITIVE_RESTART);
            }
        }
    }
}
