//! In-memory driver used by unit tests.
//!
//! "Compiling" scans `uniform <type> <name>[N];` declarations. Like an
//! optimising driver, only uniforms some other line reads stay active. A line
//! containing `#error` fails compilation with an ANGLE-style log, and a
//! `// link-error` marker fails the link step. [`RecordingCanvas`] plays the
//! same role for the presentation surface.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::session::Canvas;
use crate::types::{ActiveUniform, PresentationMode, ShaderStage, UniformShape, UniformType};

use super::{check_shape, Gpu, UploadError};

const GL_INT: u32 = 0x1404;
const GL_FLOAT_MAT4: u32 = 0x8B5C;
const GL_SAMPLER_2D: u32 = 0x8B5E;
const GL_INVALID_OPERATION: u32 = 0x0502;

#[derive(Debug, Clone)]
struct Stage {
    uniforms: Vec<ActiveUniform>,
    link_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Upload {
    pub name: String,
    pub shape: UniformShape,
    pub values: Vec<f32>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    stages: HashMap<u32, Stage>,
    programs: HashMap<u32, Vec<ActiveUniform>>,
    current: Option<u32>,
    geometries: usize,
    uploads: Vec<Upload>,
    rejected: HashSet<String>,
    viewport: (u32, u32),
    clears: usize,
    draws: usize,
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingGpu {
    state: RefCell<State>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upload to `name` fail as if the driver raised an error.
    pub fn reject_uploads_to(&self, name: &str) {
        self.state.borrow_mut().rejected.insert(name.to_string());
    }

    pub fn uploads_to(&self, name: &str) -> Vec<Vec<f32>> {
        self.state
            .borrow()
            .uploads
            .iter()
            .filter(|upload| upload.name == name)
            .map(|upload| upload.values.clone())
            .collect()
    }

    pub fn last_upload(&self, name: &str) -> Option<Upload> {
        self.state
            .borrow()
            .uploads
            .iter()
            .rev()
            .find(|upload| upload.name == name)
            .cloned()
    }

    pub fn clear_uploads(&self) {
        self.state.borrow_mut().uploads.clear();
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_stages(&self) -> usize {
        self.state.borrow().stages.len()
    }

    pub fn live_geometries(&self) -> usize {
        self.state.borrow().geometries
    }

    pub fn current_program(&self) -> Option<u32> {
        self.state.borrow().current
    }

    pub fn draws(&self) -> usize {
        self.state.borrow().draws
    }

    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.state.borrow().viewport
    }
}

impl Gpu for RecordingGpu {
    type Program = u32;
    type Shader = u32;
    type Geometry = u32;
    type Location = String;

    fn compile_stage(&self, _stage: ShaderStage, source: &str) -> Result<Self::Shader, String> {
        if let Some((index, line)) = source
            .lines()
            .enumerate()
            .find(|(_, line)| line.contains("#error"))
        {
            let message = line.trim().trim_start_matches("#error").trim();
            return Err(format!(
                "ERROR: 0:{}: '#error' : {message}\nERROR: 0:{}: '' : compilation terminated\n",
                index + 1,
                index + 1
            ));
        }
        let stage = Stage {
            uniforms: source
                .lines()
                .filter_map(parse_declaration)
                .filter(|uniform| is_read(source, &uniform.name))
                .collect(),
            link_error: source.contains("// link-error"),
        };
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.stages.insert(id, stage);
        Ok(id)
    }

    fn release_stage(&self, shader: Self::Shader) {
        self.state.borrow_mut().stages.remove(&shader);
    }

    fn link(&self, vertex: Self::Shader, fragment: Self::Shader) -> Result<Self::Program, String> {
        let mut state = self.state.borrow_mut();
        let (Some(vs), Some(fs)) = (state.stages.get(&vertex), state.stages.get(&fragment)) else {
            return Err("error: attempt to link a released shader".to_string());
        };
        if vs.link_error || fs.link_error {
            return Err("error: fragment shader output not consumed".to_string());
        }
        let mut uniforms = vs.uniforms.clone();
        for uniform in &fs.uniforms {
            if !uniforms.iter().any(|known| known.name == uniform.name) {
                uniforms.push(uniform.clone());
            }
        }
        let id = state.allocate();
        state.programs.insert(id, uniforms);
        Ok(id)
    }

    fn release_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.current == Some(program) {
            state.current = None;
        }
    }

    fn use_program(&self, program: Self::Program) {
        self.state.borrow_mut().current = Some(program);
    }

    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .cloned()
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::Location> {
        let state = self.state.borrow();
        let uniforms = state.programs.get(&program)?;
        uniforms
            .iter()
            .find(|uniform| uniform.name == name)
            .map(|uniform| uniform.name.trim_end_matches("[0]").to_string())
    }

    fn upload(
        &self,
        location: &Self::Location,
        shape: UniformShape,
        values: &[f32],
    ) -> Result<(), UploadError> {
        check_shape(shape, values)?;
        let mut state = self.state.borrow_mut();
        if state.rejected.contains(location) {
            return Err(UploadError::Driver {
                code: GL_INVALID_OPERATION,
            });
        }
        state.uploads.push(Upload {
            name: location.clone(),
            shape,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn create_quad(&self) -> Result<Self::Geometry, String> {
        let mut state = self.state.borrow_mut();
        state.geometries += 1;
        Ok(state.allocate())
    }

    fn release_quad(&self, _geometry: Self::Geometry) {
        let mut state = self.state.borrow_mut();
        state.geometries = state.geometries.saturating_sub(1);
    }

    fn set_viewport(&self, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (width, height);
    }

    fn begin_frame(&self, program: Self::Program, _geometry: &Self::Geometry) {
        let mut state = self.state.borrow_mut();
        state.clears += 1;
        state.current = Some(program);
    }

    fn draw_quad(&self) {
        self.state.borrow_mut().draws += 1;
    }
}

/// Canvas that records what the session asked of it.
#[derive(Debug, Default)]
pub(crate) struct RecordingCanvas {
    pub client: (u32, u32),
    pub drawable: (u32, u32),
    pub presentations: Vec<PresentationMode>,
    pub presents: usize,
}

impl RecordingCanvas {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            client: (width, height),
            drawable: (width, height),
            ..Self::default()
        }
    }
}

impl Canvas for RecordingCanvas {
    fn client_size(&self) -> (u32, u32) {
        self.client
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.drawable
    }

    fn resize_drawable(&mut self, width: u32, height: u32) {
        self.drawable = (width, height);
    }

    fn set_presentation(&mut self, mode: PresentationMode) {
        self.presentations.push(mode);
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}

/// Parses `uniform <type> <name>[N];` into what a driver would report.
fn parse_declaration(line: &str) -> Option<ActiveUniform> {
    let rest = line.trim().strip_prefix("uniform ")?;
    let rest = rest.trim_end().trim_end_matches(';');
    let mut parts = rest.split_whitespace();
    let ty = match parts.next()? {
        "float" => UniformType::Float,
        "vec2" => UniformType::Vec2,
        "vec3" => UniformType::Vec3,
        "vec4" => UniformType::Vec4,
        "int" => UniformType::Other(GL_INT),
        "mat4" => UniformType::Other(GL_FLOAT_MAT4),
        _ => UniformType::Other(GL_SAMPLER_2D),
    };
    let declared = parts.next()?;
    let (name, size) = match declared.split_once('[') {
        Some((base, len)) => {
            let size = len.trim_end_matches(']').parse::<i32>().ok()?;
            (format!("{base}[0]"), size)
        }
        None => (declared.to_string(), 1),
    };
    Some(ActiveUniform { name, ty, size })
}

/// True when a non-declaration line mentions the uniform's base name.
fn is_read(source: &str, name: &str) -> bool {
    let base = name.trim_end_matches("[0]");
    source
        .lines()
        .filter(|line| !line.trim_start().starts_with("uniform "))
        .any(|line| {
            line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .any(|word| word == base)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_declarations_like_a_driver() {
        let uniform = parse_declaration("  uniform vec3 palette[4];").unwrap();
        assert_eq!(uniform.name, "palette[0]");
        assert_eq!(uniform.size, 4);
        assert_eq!(uniform.ty, UniformType::Vec3);
        assert!(parse_declaration("float x = 1.0;").is_none());
    }

    #[test]
    fn unread_uniforms_are_inactive() {
        let gpu = RecordingGpu::new();
        let vertex = gpu.compile_stage(ShaderStage::Vertex, "void main() {}").unwrap();
        let fragment = gpu
            .compile_stage(
                ShaderStage::Fragment,
                "uniform float used;\nuniform float unused;\nfloat f() { return used_not + used; }",
            )
            .unwrap();
        let program = gpu.link(vertex, fragment).unwrap();
        let names: Vec<_> = gpu
            .active_uniforms(program)
            .into_iter()
            .map(|uniform| uniform.name)
            .collect();
        assert_eq!(names, vec!["used".to_string()]);
    }

    #[test]
    fn error_directive_fails_with_angle_log() {
        let gpu = RecordingGpu::new();
        let err = gpu
            .compile_stage(ShaderStage::Fragment, "line one\n#error boom\n")
            .unwrap_err();
        assert!(err.starts_with("ERROR: 0:2: '#error' : boom"));
        assert_eq!(gpu.live_stages(), 0);
    }
}
