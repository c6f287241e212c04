use crate::gpu::Gpu;
use crate::timeline::{LoopState, RenderLoop};
use crate::uniforms::{FrameInputs, UniformRegistry, UniformSlot, UniformValue};

/// A linked program plus everything derived from it.
///
/// Owns its program and quad exclusively; the session releases both when the
/// instance is dropped from use.
pub(crate) struct ShaderInstance<G: Gpu> {
    pub(crate) program: G::Program,
    pub(crate) geometry: G::Geometry,
    pub(crate) uniforms: UniformRegistry<G::Location>,
    pub(crate) frames: RenderLoop,
}

impl<G: Gpu> ShaderInstance<G> {
    /// Starts with an empty registry; the caller rebuilds it from `program`.
    pub(crate) fn new(program: G::Program, geometry: G::Geometry, idle_frames: u32) -> Self {
        Self {
            program,
            geometry,
            uniforms: UniformRegistry::new(),
            frames: RenderLoop::new(idle_frames),
        }
    }

    /// One tick: uniforms are applied and uploaded before the draw call.
    pub(crate) fn draw(&mut self, gpu: &G, now: f64, resolution: (u32, u32)) -> LoopState {
        let elapsed = self.frames.begin_tick(now);
        gpu.begin_frame(self.program, &self.geometry);
        self.uniforms.push_frame(
            gpu,
            FrameInputs {
                time: now as f32,
                elapsed,
                resolution,
            },
        );
        gpu.draw_quad();
        self.frames.end_tick(self.uniforms.declares_continuous_time())
    }

    pub(crate) fn handle(&mut self, name: &str) -> Option<UniformHandle<'_, G::Location>> {
        let slot = self.uniforms.get_mut(name)?;
        Some(UniformHandle {
            slot,
            frames: &mut self.frames,
        })
    }
}

/// Host access to one uniform. Every mutation wakes the render loop.
#[derive(Debug)]
pub struct UniformHandle<'a, L> {
    slot: &'a mut UniformSlot<L>,
    frames: &'a mut RenderLoop,
}

impl<L> UniformHandle<'_, L> {
    pub fn slot(&self) -> &UniformSlot<L> {
        self.slot
    }

    pub fn get(&self, index: usize) -> f32 {
        self.slot.get(index)
    }

    pub fn set_value(&mut self, value: impl Into<UniformValue>, index: usize) {
        self.slot.set_value(value, index);
        self.frames.wake();
    }

    pub fn increment(&mut self, delta: f32, index: usize) {
        self.slot.increment(delta, index);
        self.frames.wake();
    }

    /// Freezes a component at its current value.
    pub fn clear_modifier(&mut self, index: usize) {
        let value = self.slot.get(index);
        self.set_value(value, index);
    }
}
