use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Uniform names the runtime computes itself every frame.
pub const RESERVED_UNIFORMS: [&str; 2] = [TIME_UNIFORM, RESOLUTION_UNIFORM];

/// Seconds since the session started.
pub const TIME_UNIFORM: &str = "iTime";

/// Drawable surface size in physical pixels.
pub const RESOLUTION_UNIFORM: &str = "iResolution";

/// Default number of frames a shader without `iTime` keeps animating after
/// its last change.
pub const DEFAULT_IDLE_FRAMES: u32 = 100;

/// Returns true when `name` is computed internally and hidden from hosts.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_UNIFORMS.contains(&name)
}

/// Programmable stage of the fixed two-stage pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Declared type of an active uniform as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    /// Any other GL type enum (ints, matrices, samplers, ...).
    Other(u32),
}

/// How a slot's values are pushed to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformShape {
    /// Floats per element.
    pub fn components(self) -> usize {
        match self {
            UniformShape::Scalar => 1,
            UniformShape::Vec2 => 2,
            UniformShape::Vec3 => 3,
            UniformShape::Vec4 => 4,
        }
    }
}

impl From<UniformType> for UniformShape {
    fn from(value: UniformType) -> Self {
        match value {
            UniformType::Vec2 => UniformShape::Vec2,
            UniformType::Vec3 => UniformShape::Vec3,
            UniformType::Vec4 => UniformShape::Vec4,
            UniformType::Float | UniformType::Other(_) => UniformShape::Scalar,
        }
    }
}

/// Active uniform reported by program introspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUniform {
    /// Name exactly as the driver reports it (arrays carry a `[0]` suffix).
    pub name: String,
    pub ty: UniformType,
    /// Declared array length, 1 for non-arrays.
    pub size: i32,
}

/// How the canvas is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    #[default]
    Fullscreen,
    Small,
}

/// GLSL flavour used for the version line of both shader stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderDialect {
    /// `#version 300 es`, matching WebGL2 sources.
    #[default]
    Gles300,
    /// `#version 330 core` for desktop contexts without ES support.
    Glsl330,
}

impl ShaderDialect {
    pub(crate) fn version_line(self) -> &'static str {
        match self {
            ShaderDialect::Gles300 => "#version 300 es",
            ShaderDialect::Glsl330 => "#version 330 core",
        }
    }
}

/// Which GL flavour the desktop host asks the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPreference {
    /// OpenGL ES 3.0 first, desktop GL 3.3 core as fallback.
    #[default]
    Auto,
    Gles,
    Desktop,
}

/// Identifier of the document a source came from, echoed back with errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Tunables for a [`ShaderSession`](crate::ShaderSession).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Frames a shader without `iTime` keeps ticking after its last change.
    pub idle_frames: u32,
    /// Version line used when wrapping sources.
    pub dialect: ShaderDialect,
    /// Initial values for uniforms that first appear after an eval.
    pub defaults: BTreeMap<String, Vec<f32>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            idle_frames: DEFAULT_IDLE_FRAMES,
            dialect: ShaderDialect::default(),
            defaults: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_float_types_fall_back_to_scalar() {
        assert_eq!(UniformShape::from(UniformType::Other(0x1404)), UniformShape::Scalar);
        assert_eq!(UniformShape::from(UniformType::Vec3).components(), 3);
    }

    #[test]
    fn reserved_names_cover_time_and_resolution() {
        assert!(is_reserved("iTime"));
        assert!(is_reserved("iResolution"));
        assert!(!is_reserved("iTimeDelta"));
    }
}
