use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-frame function of `(previous value, elapsed seconds) -> next value`.
pub struct FrameModifier(Box<dyn FnMut(f32, f32) -> f32>);

impl FrameModifier {
    pub fn new(modifier: impl FnMut(f32, f32) -> f32 + 'static) -> Self {
        Self(Box::new(modifier))
    }

    pub fn apply(&mut self, value: f32, elapsed: f32) -> f32 {
        (self.0)(value, elapsed)
    }

    /// Exponential smoothing towards `target`; `rate` is in 1/seconds.
    pub fn approach(target: f32, rate: f32) -> Self {
        Self::new(move |value, elapsed| {
            let blend = 1.0 - (-rate.max(0.0) * elapsed).exp();
            value + (target - value) * blend
        })
    }

    /// Exponential decay towards zero.
    pub fn decay(rate: f32) -> Self {
        Self::new(move |value, elapsed| value * (-rate.max(0.0) * elapsed).exp())
    }

    /// Linear growth of `speed` units per second.
    pub fn ramp(speed: f32) -> Self {
        Self::new(move |value, elapsed| value + speed * elapsed)
    }
}

impl fmt::Debug for FrameModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FrameModifier(..)")
    }
}

/// Serializable description of a built-in modifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModifierSpec {
    Approach { target: f32, rate: f32 },
    Decay { rate: f32 },
    Ramp { speed: f32 },
}

impl ModifierSpec {
    pub fn into_modifier(self) -> FrameModifier {
        match self {
            ModifierSpec::Approach { target, rate } => FrameModifier::approach(target, rate),
            ModifierSpec::Decay { rate } => FrameModifier::decay(rate),
            ModifierSpec::Ramp { speed } => FrameModifier::ramp(speed),
        }
    }
}

impl From<ModifierSpec> for FrameModifier {
    fn from(spec: ModifierSpec) -> Self {
        spec.into_modifier()
    }
}
