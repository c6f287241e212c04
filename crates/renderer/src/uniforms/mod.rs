//! Reflection-driven uniform storage.
//!
//! Nothing about a shader's uniforms is known until its program links, so
//! slots live in a name-keyed map rebuilt after every successful eval.

mod modifiers;
mod registry;
mod slot;

pub use modifiers::{FrameModifier, ModifierSpec};
pub use registry::{FrameInputs, RebuildReport, UniformRegistry};
pub use slot::{UniformSlot, UniformSnapshot, UniformValue};
