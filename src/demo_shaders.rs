//! Minimal `ShaderManager` + `GpuDriver` vertex-geometry glue for the demo
//! binary. Shader compilation/linking and per-model vertex buffers are host
//! concerns the core only reaches through traits; this is one concrete,
//! deliberately small implementation of that boundary, in a direct
//! `ShaderProgram` style (raw `gl` calls, a uniform-location cache, no
//! builder abstraction).

use std::collections::HashMap;
use std::ffi::CString;
use std::ptr;

use gl::types::*;
use glam::{Mat4, Vec3};

use lumen_core::{CoreError, CoreResult, Light, LightKind, Object, ShaderManager};

pub struct ShaderProgram {
    id: GLuint,
    uniform_cache: HashMap<String, GLint>,
}

impl ShaderProgram {
    pub fn from_sources(vert_src: &str, frag_src: &str) -> CoreResult<Self> {
        unsafe {
            let vert = compile_shader(vert_src, gl::VERTEX_SHADER)?;
            let frag = compile_shader(frag_src, gl::FRAGMENT_SHADER)?;

            let program = gl::CreateProgram();
            gl::AttachShader(program, vert);
            gl::AttachShader(program, frag);
            gl::LinkProgram(program);

            let mut success = 0;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut success);
            if success == 0 {
                let mut len = 0;
                gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
                let mut buf = vec![0u8; len as usize];
                gl::GetProgramInfoLog(program, len, ptr::null_mut(), buf.as_mut_ptr() as *mut _);
                buf.pop();
                let msg = String::from_utf8_lossy(&buf).to_string();
                gl::DeleteProgram(program);
                gl::DeleteShader(vert);
                gl::DeleteShader(frag);
                return Err(CoreError::ShaderLink(msg));
            }

            gl::DeleteShader(vert);
            gl::DeleteShader(frag);
            Ok(Self { id: program, uniform_cache: HashMap::new() })
        }
    }

    pub fn bind(&self) {
        unsafe { gl::UseProgram(self.id) }
    }

    fn uniform(&mut self, name: &str) -> GLint {
        if let Some(&loc) = self.uniform_cache.get(name) {
            return loc;
        }
        let cname = CString::new(name).unwrap();
        let loc = unsafe { gl::GetUniformLocation(self.id, cname.as_ptr()) };
        self.uniform_cache.insert(name.to_string(), loc);
        loc
    }

    pub fn set_mat4(&mut self, name: &str, mat: &Mat4) {
        let loc = self.uniform(name);
        unsafe { gl::UniformMatrix4fv(loc, 1, gl::FALSE, mat.to_cols_array().as_ptr()) }
    }

    pub fn set_vec3(&mut self, name: &str, v: Vec3) {
        let loc = self.uniform(name);
        unsafe { gl::Uniform3f(loc, v.x, v.y, v.z) }
    }

    pub fn set_float(&mut self, name: &str, val: f32) {
        let loc = self.uniform(name);
        unsafe { gl::Uniform1f(loc, val) }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        unsafe { gl::DeleteProgram(self.id) }
    }
}

unsafe fn compile_shader(src: &str, shader_type: GLenum) -> CoreResult<GLuint> {
    let shader = gl::CreateShader(shader_type);
    let c_src = CString::new(src).unwrap();
    gl::ShaderSource(shader, 1, &c_src.as_ptr(), ptr::null());
    gl::CompileShader(shader);

    let mut success = 0;
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success);
    if success == 0 {
        let mut len = 0;
        gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
        let mut buf = vec![0u8; len as usize];
        gl::GetShaderInfoLog(shader, len, ptr::null_mut(), buf.as_mut_ptr() as *mut _);
        buf.pop();
        let stage = if shader_type == gl::VERTEX_SHADER { "vertex" } else { "fragment" };
        let msg = String::from_utf8_lossy(&buf).to_string();
        gl::DeleteShader(shader);
        return Err(CoreError::ShaderCompile { stage, message: msg });
    }
    Ok(shader)
}

const AMBIENT_VERT: &str = r#"
#version 330 core
layout (location = 0) in vec3 in_pos;
layout (location = 1) in vec3 in_normal;
uniform mat4 u_model;
uniform mat4 u_view_proj;
out vec3 v_normal;
void main() {
    v_normal = mat3(u_model) * in_normal;
    gl_Position = u_view_proj * u_model * vec4(in_pos, 1.0);
}
"#;

const AMBIENT_FRAG: &str = r#"
#version 330 core
in vec3 v_normal;
uniform vec3 u_ambient;
out vec4 frag_color;
void main() {
    frag_color = vec4(u_ambient, 1.0);
}
"#;

const LIT_FRAG: &str = r#"
#version 330 core
in vec3 v_normal;
uniform vec3 u_light_color;
uniform vec3 u_light_dir;
out vec4 frag_color;
void main() {
    float ndotl = max(dot(normalize(v_normal), -normalize(u_light_dir)), 0.0);
    frag_color = vec4(u_light_color * ndotl, 1.0);
}
"#;

struct ModelBuffers {
    vao: GLuint,
    vbo: GLuint,
    vertex_count: i32,
}

/// Builds a flat-shaded, non-indexed (position, normal) vertex buffer per
/// model up front; the core's own index buffers (via [`GpuDriver`]) are only
/// used for shadow-volume geometry, never for the object's own surface.
pub struct DemoShaders {
    ambient: ShaderProgram,
    lit: ShaderProgram,
    models: HashMap<u32, ModelBuffers>,
    view_proj: Mat4,
}

impl DemoShaders {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            ambient: ShaderProgram::from_sources(AMBIENT_VERT, AMBIENT_FRAG)?,
            lit: ShaderProgram::from_sources(AMBIENT_VERT, LIT_FRAG)?,
            models: HashMap::new(),
            view_proj: Mat4::IDENTITY,
        })
    }

    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.view_proj = view_proj;
    }

    pub fn upload_model(&mut self, model_id: u32, model: &lumen_core::Model) {
        let lod = model.lod0();
        let mut data: Vec<f32> = Vec::with_capacity(lod.triangles.len() * 3 * 6);
        for tri in &lod.triangles {
            let normal = lod.triangle_normal(tri);
            for &vi in &tri.vertex_index {
                let p = lod.positions[vi as usize];
                data.extend_from_slice(&[p.x, p.y, p.z, normal.x, normal.y, normal.z]);
            }
        }
        unsafe {
            let mut vao = 0;
            let mut vbo = 0;
            gl::GenVertexArrays(1, &mut vao);
            gl::GenBuffers(1, &mut vbo);
            gl::BindVertexArray(vao);
            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            gl::BufferData(gl::ARRAY_BUFFER, (data.len() * std::mem::size_of::<f32>()) as GLsizeiptr, data.as_ptr() as *const _, gl::STATIC_DRAW);
            let stride = 6 * std::mem::size_of::<f32>() as GLsizei;
            gl::VertexAttribPointer(0, 3, gl::FLOAT, gl::FALSE, stride, ptr::null());
            gl::EnableVertexAttribArray(0);
            gl::VertexAttribPointer(1, 3, gl::FLOAT, gl::FALSE, stride, (3 * std::mem::size_of::<f32>()) as *const _);
            gl::EnableVertexAttribArray(1);
            gl::BindVertexArray(0);
            self.models.insert(model_id, ModelBuffers { vao, vbo, vertex_count: (lod.triangles.len() * 3) as i32 });
        }
    }

    fn draw_model(&self, model_id: u32) {
        if let Some(buffers) = self.models.get(&model_id) {
            unsafe {
                gl::BindVertexArray(buffers.vao);
                gl::DrawArrays(gl::TRIANGLES, 0, buffers.vertex_count);
                gl::BindVertexArray(0);
            }
        }
    }
}

impl Drop for DemoShaders {
    fn drop(&mut self) {
        unsafe {
            for buffers in self.models.values() {
                gl::DeleteBuffers(1, &buffers.vbo);
                gl::DeleteVertexArrays(1, &buffers.vao);
            }
        }
    }
}

fn light_direction_and_color(light: &Light) -> (Vec3, Vec3) {
    match light.kind {
        LightKind::Directional => (light.position_or_direction, light.color),
        _ => ((-light.position_or_direction).normalize_or_zero(), light.color),
    }
}

impl ShaderManager for DemoShaders {
    fn init_shaders_before_frame(&mut self) {
        self.ambient.bind();
        self.ambient.set_mat4("u_view_proj", &self.view_proj);
        self.ambient.set_vec3("u_ambient", Vec3::splat(0.08));
    }

    fn init_shaders_before_light(&mut self, light: &Light) {
        let (direction, color) = light_direction_and_color(light);
        self.lit.bind();
        self.lit.set_mat4("u_view_proj", &self.view_proj);
        self.lit.set_vec3("u_light_dir", direction);
        self.lit.set_vec3("u_light_color", color);
    }

    fn init_shadow_volume_shader(&mut self) {
        // Stencil-only passes write no color; the ambient program's vertex
        // stage is reused with color writes disabled by the driver.
        self.ambient.bind();
        self.ambient.set_mat4("u_view_proj", &self.view_proj);
    }

    fn draw_object_ambient_pass(&mut self, object: &Object) {
        self.ambient.bind();
        self.ambient.set_mat4("u_model", &object.model_matrix);
        self.draw_model(object.model.0);
    }

    fn draw_object_single_pass(&mut self, object: &Object, light: &Light) {
        let (direction, color) = light_direction_and_color(light);
        self.lit.bind();
        self.lit.set_mat4("u_model", &object.model_matrix);
        self.lit.set_vec3("u_light_dir", direction);
        self.lit.set_vec3("u_light_color", color);
        self.draw_model(object.model.0);
    }

    fn draw_object_multi_pass_lighting_pass(&mut self, object: &Object, _light: &Light) {
        self.lit.bind();
        self.lit.set_mat4("u_model", &object.model_matrix);
        self.draw_model(object.model.0);
    }

    fn draw_object_final_pass(&mut self, object: &Object) {
        self.ambient.bind();
        self.ambient.set_mat4("u_model", &object.model_matrix);
        self.draw_model(object.model.0);
    }
}
