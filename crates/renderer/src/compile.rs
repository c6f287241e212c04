use crate::gpu::Gpu;
use crate::types::{PresentationMode, ShaderDialect, ShaderStage};

/// Lines the fragment template places ahead of the user's source.
pub const TEMPLATE_HEADER_LINES: usize = 8;

const FULLSCREEN_DIRECTIVE: &str = "// size: fullscreen";
const SMALL_DIRECTIVE: &str = "// size: small";

/// Failure to turn a source pair into a linked program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
}

impl BuildError {
    /// Raw driver log, the input for diagnostic translation.
    pub fn diagnostic_text(&self) -> &str {
        match self {
            BuildError::Compile { log, .. } | BuildError::Link { log } => log,
        }
    }
}

/// Compiles and links a vertex/fragment pair.
///
/// Each stage is compiled on its own; a failing stage is reported without
/// touching the other stage or attempting the link. Stage objects never
/// outlive the call. On success the program is bound for subsequent draws;
/// releasing any previously bound program is the caller's job.
pub fn build_program<G: Gpu>(
    gpu: &G,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<G::Program, BuildError> {
    let vertex = gpu
        .compile_stage(ShaderStage::Vertex, vertex_source)
        .map_err(|log| BuildError::Compile {
            stage: ShaderStage::Vertex,
            log,
        })?;
    let fragment = match gpu.compile_stage(ShaderStage::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(log) => {
            gpu.release_stage(vertex);
            return Err(BuildError::Compile {
                stage: ShaderStage::Fragment,
                log,
            });
        }
    };

    let linked = gpu.link(vertex, fragment);
    gpu.release_stage(vertex);
    gpu.release_stage(fragment);
    let program = linked.map_err(|log| BuildError::Link { log })?;
    gpu.use_program(program);
    Ok(program)
}

/// Full-screen pass-through of attribute 0.
pub fn vertex_shader(dialect: ShaderDialect) -> String {
    format!(
        "{version}
precision highp float;
layout(location=0) in vec2 position;
void main() {{
  gl_Position = vec4(position, 1.0, 1.0);
}}
",
        version = dialect.version_line()
    )
}

/// Wraps user code in the fragment template.
///
/// The header is exactly [`TEMPLATE_HEADER_LINES`] lines, so driver line
/// numbers minus that constant point back into `source`. The user code must
/// define `void mainImage(out vec4 color, in vec2 fragCoord)`.
pub fn wrap_fragment(source: &str, dialect: ShaderDialect) -> String {
    format!(
        "{version}
precision highp float;
out vec4 oColor;
uniform float iTime;
uniform vec2 iResolution;

#define SHADELIVE 1

{source}
void main(void) {{
  mainImage(oColor, gl_FragCoord.xy);
}}
",
        version = dialect.version_line()
    )
}

/// Presentation requested by a `// size: ...` comment, if any.
pub fn size_directive(source: &str) -> Option<PresentationMode> {
    if source.contains(FULLSCREEN_DIRECTIVE) {
        Some(PresentationMode::Fullscreen)
    } else if source.contains(SMALL_DIRECTIVE) {
        Some(PresentationMode::Small)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::RecordingGpu;

    #[test]
    fn template_header_has_fixed_line_count() {
        let wrapped = wrap_fragment("USER_LINE_ONE\n", ShaderDialect::Gles300);
        let user_line = wrapped
            .lines()
            .position(|line| line == "USER_LINE_ONE")
            .expect("user code present");
        assert_eq!(user_line, TEMPLATE_HEADER_LINES);

        let desktop = wrap_fragment("USER_LINE_ONE\n", ShaderDialect::Glsl330);
        assert!(desktop.starts_with("#version 330 core\n"));
        assert_eq!(
            desktop.lines().position(|line| line == "USER_LINE_ONE"),
            Some(TEMPLATE_HEADER_LINES)
        );
    }

    #[test]
    fn template_declares_builtins_and_entry_point() {
        let wrapped = wrap_fragment("", ShaderDialect::Gles300);
        assert!(wrapped.contains("uniform float iTime;"));
        assert!(wrapped.contains("uniform vec2 iResolution;"));
        assert!(wrapped.contains("mainImage(oColor, gl_FragCoord.xy);"));
    }

    #[test]
    fn recognises_size_directives() {
        assert_eq!(
            size_directive("// size: small\nvoid mainImage() {}"),
            Some(PresentationMode::Small)
        );
        assert_eq!(
            size_directive("// size: fullscreen"),
            Some(PresentationMode::Fullscreen)
        );
        assert_eq!(size_directive("// size: huge"), None);
    }

    #[test]
    fn successful_build_binds_program_and_drops_stages() {
        let gpu = RecordingGpu::new();
        let program = build_program(&gpu, "void main() {}", "uniform float a;").unwrap();
        assert_eq!(gpu.current_program(), Some(program));
        assert_eq!(gpu.live_stages(), 0);
        assert_eq!(gpu.live_programs(), 1);
    }

    #[test]
    fn vertex_failure_skips_fragment_and_link() {
        let gpu = RecordingGpu::new();
        let err = build_program(&gpu, "#error vertex", "#error fragment").unwrap_err();
        assert!(matches!(
            err,
            BuildError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        assert!(err.diagnostic_text().contains("vertex"));
        assert_eq!(gpu.live_stages(), 0);
        assert_eq!(gpu.live_programs(), 0);
    }

    #[test]
    fn fragment_failure_releases_vertex_stage() {
        let gpu = RecordingGpu::new();
        let err = build_program(&gpu, "void main() {}", "\n#error nope").unwrap_err();
        assert!(matches!(
            err,
            BuildError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert_eq!(gpu.live_stages(), 0);
        assert_eq!(gpu.current_program(), None);
    }

    #[test]
    fn link_failure_leaves_nothing_bound() {
        let gpu = RecordingGpu::new();
        let err = build_program(&gpu, "void main() {}", "// link-error").unwrap_err();
        assert!(matches!(err, BuildError::Link { .. }));
        assert_eq!(gpu.live_programs(), 0);
        assert_eq!(gpu.live_stages(), 0);
        assert_eq!(gpu.current_program(), None);
    }
}
