use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gpu::Gpu;
use crate::session::{Canvas, ShaderSession};
use crate::uniforms::{ModifierSpec, UniformSnapshot};

/// Host-side uniform request, applied between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum UniformCommand {
    Set { name: String, index: usize, value: f32 },
    Increment { name: String, index: usize, delta: f32 },
    Animate { name: String, index: usize, modifier: ModifierSpec },
    /// Freezes the component at its current value.
    Clear { name: String, index: usize },
    Get { name: String, index: usize },
    Dump,
}

impl UniformCommand {
    pub fn name(&self) -> Option<&str> {
        match self {
            UniformCommand::Set { name, .. }
            | UniformCommand::Increment { name, .. }
            | UniformCommand::Animate { name, .. }
            | UniformCommand::Clear { name, .. }
            | UniformCommand::Get { name, .. } => Some(name),
            UniformCommand::Dump => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum UniformReply {
    Applied,
    Value { value: f32 },
    Snapshot { uniforms: BTreeMap<String, UniformSnapshot> },
    /// No host-visible uniform by that name (reserved names included).
    Unknown { name: String },
    NoShader,
}

impl<G: Gpu, C: Canvas> ShaderSession<G, C> {
    /// Applies one host request to the running shader.
    pub fn apply(&mut self, command: UniformCommand) -> UniformReply {
        if !self.has_instance() {
            return UniformReply::NoShader;
        }
        let Some(name) = command.name().map(str::to_owned) else {
            return UniformReply::Snapshot {
                uniforms: self.snapshot(),
            };
        };
        let Some(mut handle) = self.uniform(&name) else {
            tracing::warn!(uniform = %name, "ignoring command for unknown uniform");
            return UniformReply::Unknown { name };
        };

        match command {
            UniformCommand::Set { index, value, .. } => handle.set_value(value, index),
            UniformCommand::Increment { index, delta, .. } => handle.increment(delta, index),
            UniformCommand::Animate {
                index, modifier, ..
            } => handle.set_value(modifier.into_modifier(), index),
            UniformCommand::Clear { index, .. } => handle.clear_modifier(index),
            UniformCommand::Get { index, .. } => {
                return UniformReply::Value {
                    value: handle.get(index),
                }
            }
            UniformCommand::Dump => {}
        }
        UniformReply::Applied
    }
}
