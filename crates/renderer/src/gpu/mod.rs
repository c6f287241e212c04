//! Thin seam over the graphics driver.
//!
//! Everything above this module talks to the GPU through [`Gpu`]:
//! - `native` implements it for `glow::Context`, the path used by the
//!   desktop host (OpenGL ES 3.0 or desktop GL 3.3).
//! - `recording` (tests only) keeps programs and uploads in memory so the
//!   reload, registry, and loop logic can be exercised without a driver.
//!
//! Compilation and linking stay opaque: the driver answers pass/fail and a
//! diagnostic log, nothing more.

mod native;
pub use native::QuadGeometry;
#[cfg(test)]
pub(crate) mod recording;

use std::fmt::Debug;

use crate::types::{ActiveUniform, ShaderStage, UniformShape};

/// A single slot's upload was rejected. Never fatal for the frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("expected a multiple of {components} values, got {len}")]
    ShapeMismatch { components: usize, len: usize },
    #[error("driver rejected upload (GL error 0x{code:04x})")]
    Driver { code: u32 },
}

/// Driver operations the runtime needs. All calls happen on the thread that
/// owns the context.
pub trait Gpu {
    type Program: Copy + Debug + PartialEq;
    type Shader: Copy + Debug;
    type Geometry: Debug;
    type Location: Clone + Debug;

    /// Compiles one stage. On failure the stage object is already released
    /// and the driver log is returned.
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;

    fn release_stage(&self, shader: Self::Shader);

    /// Links two compiled stages. On failure the program object is already
    /// released and the driver log is returned.
    fn link(&self, vertex: Self::Shader, fragment: Self::Shader) -> Result<Self::Program, String>;

    fn release_program(&self, program: Self::Program);

    fn use_program(&self, program: Self::Program);

    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform>;

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::Location>;

    fn upload(
        &self,
        location: &Self::Location,
        shape: UniformShape,
        values: &[f32],
    ) -> Result<(), UploadError>;

    /// Creates the 4-vertex triangle strip covering clip space.
    fn create_quad(&self) -> Result<Self::Geometry, String>;

    fn release_quad(&self, geometry: Self::Geometry);

    fn set_viewport(&self, width: u32, height: u32);

    /// Clears the frame buffer and binds `program` and `geometry`.
    fn begin_frame(&self, program: Self::Program, geometry: &Self::Geometry);

    fn draw_quad(&self);
}

/// Rejects slices that are not a whole number of elements.
pub(crate) fn check_shape(shape: UniformShape, values: &[f32]) -> Result<(), UploadError> {
    let components = shape.components();
    if values.is_empty() || values.len() % components != 0 {
        return Err(UploadError::ShapeMismatch {
            components,
            len: values.len(),
        });
    }
    Ok(())
}
