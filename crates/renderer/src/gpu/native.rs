use glow::HasContext;

use crate::types::{ActiveUniform, ShaderStage, UniformShape, UniformType};

use super::{check_shape, Gpu, UploadError};

/// Clip-space corners in triangle-strip order.
const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// A lost context reports errors forever; stop draining after this many.
const MAX_STALE_ERRORS: usize = 16;

/// Vertex array plus the buffer backing its single attribute.
#[derive(Debug)]
pub struct QuadGeometry {
    vertex_array: <glow::Context as HasContext>::VertexArray,
    buffer: <glow::Context as HasContext>::Buffer,
}

impl Gpu for glow::Context {
    type Program = <glow::Context as HasContext>::Program;
    type Shader = <glow::Context as HasContext>::Shader;
    type Geometry = QuadGeometry;
    type Location = <glow::Context as HasContext>::UniformLocation;

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.create_shader(kind)?;
            self.shader_source(shader, source);
            self.compile_shader(shader);
            if self.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = self.get_shader_info_log(shader);
                self.delete_shader(shader);
                Err(log)
            }
        }
    }

    fn release_stage(&self, shader: Self::Shader) {
        unsafe { self.delete_shader(shader) }
    }

    fn link(&self, vertex: Self::Shader, fragment: Self::Shader) -> Result<Self::Program, String> {
        unsafe {
            let program = self.create_program()?;
            self.attach_shader(program, vertex);
            self.attach_shader(program, fragment);
            self.link_program(program);
            if !self.get_program_link_status(program) {
                let log = self.get_program_info_log(program);
                self.delete_program(program);
                return Err(log);
            }
            self.detach_shader(program, vertex);
            self.detach_shader(program, fragment);
            Ok(program)
        }
    }

    fn release_program(&self, program: Self::Program) {
        unsafe { self.delete_program(program) }
    }

    fn use_program(&self, program: Self::Program) {
        unsafe { HasContext::use_program(self, Some(program)) }
    }

    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform> {
        unsafe {
            let count = self.get_active_uniforms(program);
            (0..count)
                .filter_map(|index| self.get_active_uniform(program, index))
                .map(|info| ActiveUniform {
                    ty: uniform_type(info.utype),
                    size: info.size,
                    name: info.name,
                })
                .collect()
        }
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::Location> {
        unsafe { self.get_uniform_location(program, name) }
    }

    fn upload(
        &self,
        location: &Self::Location,
        shape: UniformShape,
        values: &[f32],
    ) -> Result<(), UploadError> {
        check_shape(shape, values)?;
        unsafe {
            // Drain stale errors so the check below reflects this call only.
            for _ in 0..MAX_STALE_ERRORS {
                if self.get_error() == glow::NO_ERROR {
                    break;
                }
            }
            match shape {
                UniformShape::Scalar => self.uniform_1_f32_slice(Some(location), values),
                UniformShape::Vec2 => self.uniform_2_f32_slice(Some(location), values),
                UniformShape::Vec3 => self.uniform_3_f32_slice(Some(location), values),
                UniformShape::Vec4 => self.uniform_4_f32_slice(Some(location), values),
            }
            match self.get_error() {
                glow::NO_ERROR => Ok(()),
                code => Err(UploadError::Driver { code }),
            }
        }
    }

    fn create_quad(&self) -> Result<Self::Geometry, String> {
        unsafe {
            let buffer = self.create_buffer()?;
            self.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD_VERTICES),
                glow::STATIC_DRAW,
            );
            let vertex_array = match self.create_vertex_array() {
                Ok(vertex_array) => vertex_array,
                Err(err) => {
                    self.delete_buffer(buffer);
                    return Err(err);
                }
            };
            self.bind_vertex_array(Some(vertex_array));
            self.enable_vertex_attrib_array(0);
            self.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 0, 0);
            Ok(QuadGeometry {
                vertex_array,
                buffer,
            })
        }
    }

    fn release_quad(&self, geometry: Self::Geometry) {
        unsafe {
            self.delete_vertex_array(geometry.vertex_array);
            self.delete_buffer(geometry.buffer);
        }
    }

    fn set_viewport(&self, width: u32, height: u32) {
        unsafe { self.viewport(0, 0, width as i32, height as i32) }
    }

    fn begin_frame(&self, program: Self::Program, geometry: &Self::Geometry) {
        unsafe {
            self.clear_color(0.0, 0.0, 0.0, 0.0);
            self.clear(glow::COLOR_BUFFER_BIT);
            HasContext::use_program(self, Some(program));
            self.bind_vertex_array(Some(geometry.vertex_array));
        }
    }

    fn draw_quad(&self) {
        unsafe { self.draw_arrays(glow::TRIANGLE_STRIP, 0, 4) }
    }
}

fn uniform_type(gl_type: u32) -> UniformType {
    match gl_type {
        glow::FLOAT => UniformType::Float,
        glow::FLOAT_VEC2 => UniformType::Vec2,
        glow::FLOAT_VEC3 => UniformType::Vec3,
        glow::FLOAT_VEC4 => UniformType::Vec4,
        other => UniformType::Other(other),
    }
}
