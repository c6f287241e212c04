use serde::Serialize;

use crate::gpu::{Gpu, UploadError};
use crate::types::UniformShape;

use super::modifiers::FrameModifier;

/// What a host assigns to one uniform component.
#[derive(Debug)]
pub enum UniformValue {
    /// Plain value; clears any modifier on the component.
    Constant(f32),
    /// Evaluated every frame against the component's current value.
    Animated(FrameModifier),
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Constant(value)
    }
}

impl From<FrameModifier> for UniformValue {
    fn from(modifier: FrameModifier) -> Self {
        UniformValue::Animated(modifier)
    }
}

/// Live value container for one named uniform.
///
/// `values` and `modifiers` always hold exactly `count()` entries and
/// `count()` is at least 1, so component indices wrap with `index % count`.
#[derive(Debug)]
pub struct UniformSlot<L> {
    name: String,
    shape: UniformShape,
    values: Vec<f32>,
    modifiers: Vec<Option<FrameModifier>>,
    location: Option<L>,
    upload_failed: bool,
}

impl<L> UniformSlot<L> {
    pub(crate) fn new(name: impl Into<String>, count: usize, shape: UniformShape) -> Self {
        let count = count.max(1);
        Self {
            name: name.into(),
            shape,
            values: vec![0.0; count],
            modifiers: std::iter::repeat_with(|| None).take(count).collect(),
            location: None,
            upload_failed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> UniformShape {
        self.shape
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn is_animated(&self, index: usize) -> bool {
        self.modifiers[self.wrap(index)].is_some()
    }

    pub fn get(&self, index: usize) -> f32 {
        self.values[self.wrap(index)]
    }

    /// Assigns a constant (dropping the modifier) or installs a modifier
    /// (leaving the value for the next frame to evolve).
    pub fn set_value(&mut self, value: impl Into<UniformValue>, index: usize) {
        let index = self.wrap(index);
        match value.into() {
            UniformValue::Constant(value) => {
                self.values[index] = value;
                self.modifiers[index] = None;
            }
            UniformValue::Animated(modifier) => {
                self.modifiers[index] = Some(modifier);
            }
        }
    }

    pub fn increment(&mut self, delta: f32, index: usize) {
        let index = self.wrap(index);
        self.values[index] += delta;
        self.modifiers[index] = None;
    }

    /// Runs every installed modifier once and returns the values to upload.
    pub fn apply_frame(&mut self, elapsed: f32) -> &[f32] {
        for (value, modifier) in self.values.iter_mut().zip(self.modifiers.iter_mut()) {
            if let Some(modifier) = modifier {
                *value = modifier.apply(*value, elapsed);
            }
        }
        &self.values
    }

    /// Truncates or zero-extends to `count` components (at least 1).
    pub fn resize(&mut self, count: usize) {
        let count = count.max(1);
        self.values.resize(count, 0.0);
        self.modifiers.resize_with(count, || None);
    }

    pub(crate) fn bind(&mut self, location: Option<L>, shape: UniformShape) {
        self.location = location;
        self.shape = shape;
        self.upload_failed = false;
    }

    /// Uploads `values` with this slot's shape; `None` when the driver gave
    /// the uniform no location.
    pub(crate) fn upload<G>(&self, gpu: &G, values: &[f32]) -> Option<Result<(), UploadError>>
    where
        G: Gpu<Location = L>,
    {
        self.location
            .as_ref()
            .map(|location| gpu.upload(location, self.shape, values))
    }

    /// Records an upload outcome; returns true the first time a failure is
    /// seen since the last bind.
    pub(crate) fn note_failure(&mut self) -> bool {
        !std::mem::replace(&mut self.upload_failed, true)
    }

    pub(crate) fn snapshot(&self) -> UniformSnapshot {
        UniformSnapshot {
            shape: self.shape,
            count: self.values.len(),
            values: self.values.clone(),
            animated: self
                .modifiers
                .iter()
                .enumerate()
                .filter_map(|(index, modifier)| modifier.as_ref().map(|_| index))
                .collect(),
        }
    }

    fn wrap(&self, index: usize) -> usize {
        index % self.values.len()
    }
}

/// Value-level view of a slot, comparable across reloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformSnapshot {
    pub shape: UniformShape,
    pub count: usize,
    pub values: Vec<f32>,
    /// Component indices currently driven by a modifier.
    pub animated: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(count: usize) -> UniformSlot<()> {
        UniformSlot::new("u", count, UniformShape::Scalar)
    }

    #[test]
    fn indices_wrap_around_count() {
        let mut slot = slot(3);
        slot.set_value(2.5, 4);
        assert_eq!(slot.get(1), 2.5);
        assert_eq!(slot.values(), &[0.0, 2.5, 0.0]);
    }

    #[test]
    fn modifier_runs_each_frame_until_a_constant_replaces_it() {
        let mut slot = slot(2);
        slot.set_value(1.0, 0);
        slot.set_value(FrameModifier::ramp(1.0), 0);
        assert_eq!(slot.get(0), 1.0, "value untouched until the next frame");
        assert!(slot.is_animated(0));

        assert_eq!(slot.apply_frame(0.5), &[1.5, 0.0]);
        assert_eq!(slot.apply_frame(0.5), &[2.0, 0.0]);

        slot.set_value(7.0, 0);
        assert!(!slot.is_animated(0));
        assert_eq!(slot.apply_frame(0.5), &[7.0, 0.0]);
    }

    #[test]
    fn increment_clears_modifier() {
        let mut slot = slot(1);
        slot.set_value(FrameModifier::ramp(10.0), 0);
        slot.increment(0.25, 0);
        assert!(!slot.is_animated(0));
        assert_eq!(slot.apply_frame(1.0), &[0.25]);
    }

    #[test]
    fn resize_preserves_prefix_and_zero_fills() {
        let mut slot = slot(3);
        for index in 0..3 {
            slot.set_value(index as f32 + 1.0, index);
        }
        slot.set_value(FrameModifier::decay(1.0), 2);

        slot.resize(5);
        assert_eq!(slot.values(), &[1.0, 2.0, 3.0, 0.0, 0.0]);
        assert!(slot.is_animated(2));
        assert!(!slot.is_animated(4));

        slot.resize(2);
        assert_eq!(slot.values(), &[1.0, 2.0]);

        slot.resize(0);
        assert_eq!(slot.count(), 1);
        assert_eq!(slot.values(), &[1.0]);
    }

    #[test]
    fn failures_are_reported_once_per_bind() {
        let mut slot = slot(1);
        assert!(slot.note_failure());
        assert!(!slot.note_failure());
        slot.bind(None, UniformShape::Scalar);
        assert!(slot.note_failure());
    }
}
