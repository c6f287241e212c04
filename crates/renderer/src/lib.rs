//! Live GLSL runtime for shadelive.
//!
//! Fragment sources are wrapped in a fixed template, compiled by the GL
//! driver, and hot-swapped into a running session without losing uniform
//! values. The overall flow per eval is:
//!
//! ```text
//!   source text ──▶ wrap_fragment ──▶ build_program ──┬─▶ ok:  UniformRegistry::rebuild ──▶ RenderLoop::restart
//!                                                     └─▶ err: diagnostics::translate ──▶ on_error(line, message)
//! ```
//!
//! Within a running instance each tick applies frame modifiers, uploads every
//! uniform, then draws one full-screen quad. Shaders that never read `iTime`
//! stop ticking after a bounded number of frames and wake up again when a
//! host mutates a uniform.
//!
//! [`ShaderSession`] is generic over the [`Gpu`] driver seam and the
//! [`Canvas`] it presents to; [`LiveWindow`] supplies both for the desktop.

mod command;
mod compile;
pub mod diagnostics;
mod gpu;
mod instance;
mod runtime;
mod session;
mod timeline;
mod types;
pub mod uniforms;
mod window;

pub use command::{UniformCommand, UniformReply};
pub use compile::{size_directive, vertex_shader, wrap_fragment, BuildError, TEMPLATE_HEADER_LINES};
pub use diagnostics::{translate, ParsedError, ShaderDiagnostic};
pub use gpu::{Gpu, QuadGeometry, UploadError};
pub use instance::UniformHandle;
pub use runtime::{SteppedTimeSource, SystemTimeSource, TimeSource};
pub use session::{Canvas, ErrorCallback, EvalOutcome, ShaderSession};
pub use timeline::{LoopState, RenderLoop, NOMINAL_FRAME_SECONDS};
pub use types::{
    is_reserved, ActiveUniform, ContextPreference, DocumentId, PresentationMode, SessionOptions,
    ShaderDialect, ShaderStage, UniformShape, UniformType, DEFAULT_IDLE_FRAMES, RESERVED_UNIFORMS,
    RESOLUTION_UNIFORM, TIME_UNIFORM,
};
pub use uniforms::{FrameModifier, ModifierSpec, UniformSnapshot, UniformValue};
pub use window::{LiveCommand, LiveProxy, LiveWindow, WindowCanvas, WindowOptions};
