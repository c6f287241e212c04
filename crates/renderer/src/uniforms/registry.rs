use std::collections::BTreeMap;

use serde::Serialize;

use crate::gpu::Gpu;
use crate::types::{is_reserved, UniformShape, RESOLUTION_UNIFORM, TIME_UNIFORM};

use super::slot::{UniformSlot, UniformSnapshot};

/// Names touched by one [`UniformRegistry::rebuild`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub added: Vec<String>,
    pub resized: Vec<String>,
    pub removed: Vec<String>,
}

impl RebuildReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.resized.is_empty() && self.removed.is_empty()
    }
}

/// Values the runtime computes for a frame rather than reading from slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    /// Session time in seconds, uploaded as `iTime`.
    pub time: f32,
    /// Seconds since the previous tick, fed to frame modifiers.
    pub elapsed: f32,
    /// Drawable size, uploaded as `iResolution`.
    pub resolution: (u32, u32),
}

/// Name-keyed slots discovered from the linked program.
#[derive(Debug)]
pub struct UniformRegistry<L> {
    slots: BTreeMap<String, UniformSlot<L>>,
}

impl<L> Default for UniformRegistry<L> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<L> UniformRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-reads the active uniforms of `program`.
    ///
    /// Slots whose name survives keep their values (resized when the element
    /// count changed), new names start zeroed, and names the program no
    /// longer declares are dropped.
    pub fn rebuild<G>(&mut self, gpu: &G, program: G::Program) -> RebuildReport
    where
        G: Gpu<Location = L>,
    {
        let mut report = RebuildReport::default();
        let mut seen = Vec::new();

        for active in gpu.active_uniforms(program) {
            let name = active
                .name
                .strip_suffix("[0]")
                .unwrap_or(&active.name)
                .to_string();
            let shape = UniformShape::from(active.ty);
            let count = shape.components() * active.size.max(1) as usize;
            let location = gpu.uniform_location(program, &active.name);

            match self.slots.get_mut(&name) {
                Some(slot) => {
                    if slot.count() != count {
                        slot.resize(count);
                        report.resized.push(name.clone());
                    }
                    slot.bind(location, shape);
                }
                None => {
                    let mut slot = UniformSlot::new(name.clone(), count, shape);
                    slot.bind(location, shape);
                    self.slots.insert(name.clone(), slot);
                    report.added.push(name.clone());
                }
            }
            seen.push(name);
        }

        self.slots.retain(|name, _| {
            let keep = seen.contains(name);
            if !keep {
                report.removed.push(name.clone());
            }
            keep
        });

        tracing::debug!(
            added = ?report.added,
            resized = ?report.resized,
            removed = ?report.removed,
            "uniform registry rebuilt"
        );
        report
    }

    /// Applies modifiers and uploads every slot for one frame.
    ///
    /// A rejected upload is logged and skipped; the remaining slots and the
    /// draw still go ahead.
    pub fn push_frame<G>(&mut self, gpu: &G, inputs: FrameInputs)
    where
        G: Gpu<Location = L>,
    {
        let resolution = [inputs.resolution.0 as f32, inputs.resolution.1 as f32];
        for (name, slot) in self.slots.iter_mut() {
            let outcome = match name.as_str() {
                TIME_UNIFORM => slot.upload(gpu, &[inputs.time]),
                RESOLUTION_UNIFORM => slot.upload(gpu, &resolution),
                _ => {
                    let values = slot.apply_frame(inputs.elapsed).to_vec();
                    slot.upload(gpu, &values)
                }
            };
            if let Some(Err(err)) = outcome {
                if slot.note_failure() {
                    tracing::warn!(uniform = %name, %err, "uniform upload failed; skipping it");
                } else {
                    tracing::trace!(uniform = %name, %err, "uniform upload failed again");
                }
            }
        }
    }

    /// Slot open to host mutation. Reserved names are never handed out.
    pub fn get(&self, name: &str) -> Option<&UniformSlot<L>> {
        if is_reserved(name) {
            return None;
        }
        self.slots.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut UniformSlot<L>> {
        if is_reserved(name) {
            return None;
        }
        self.slots.get_mut(name)
    }

    /// Host-visible names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots
            .keys()
            .map(String::as_str)
            .filter(|name| !is_reserved(name))
    }

    /// Number of registered slots, reserved ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// True when the program reads `iTime` and therefore animates on its own.
    pub fn declares_continuous_time(&self) -> bool {
        self.contains(TIME_UNIFORM)
    }

    /// Ordered, value-level view of the host-visible slots.
    pub fn snapshot(&self) -> BTreeMap<String, UniformSnapshot> {
        self.slots
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .map(|(name, slot)| (name.clone(), slot.snapshot()))
            .collect()
    }
}
