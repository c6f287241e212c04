use std::collections::BTreeMap;
use std::fmt;

use crate::compile::{build_program, size_directive, vertex_shader, wrap_fragment, TEMPLATE_HEADER_LINES};
use crate::diagnostics::{translate, ShaderDiagnostic};
use crate::gpu::Gpu;
use crate::instance::{ShaderInstance, UniformHandle};
use crate::runtime::{SystemTimeSource, TimeSource};
use crate::timeline::LoopState;
use crate::types::{DocumentId, PresentationMode, SessionOptions};
use crate::uniforms::{RebuildReport, UniformRegistry, UniformSnapshot};

/// Surface the session renders into.
pub trait Canvas {
    /// Size the canvas occupies on screen, in physical pixels.
    fn client_size(&self) -> (u32, u32);
    /// Size of the drawable backing store.
    fn drawable_size(&self) -> (u32, u32);
    fn resize_drawable(&mut self, width: u32, height: u32);
    fn set_presentation(&mut self, mode: PresentationMode);
    /// Shows the frame just drawn.
    fn present(&mut self);
}

/// Receives the translated diagnostic of every failed eval.
pub type ErrorCallback = Box<dyn FnMut(&ShaderDiagnostic, &DocumentId)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalOutcome {
    /// First program built; the instance now exists.
    Started,
    /// A running instance switched to the new program.
    Reloaded,
    /// Build failed and was reported; nothing changed.
    Rejected,
}

/// One canvas, its GPU context, and at most one live shader.
pub struct ShaderSession<G: Gpu, C: Canvas> {
    gpu: G,
    canvas: C,
    instance: Option<ShaderInstance<G>>,
    on_error: ErrorCallback,
    clock: Box<dyn TimeSource>,
    options: SessionOptions,
    vertex_source: String,
}

impl<G: Gpu, C: Canvas> ShaderSession<G, C> {
    /// Binds the canvas to `gpu` in fullscreen presentation, with no shader.
    pub fn new(gpu: G, mut canvas: C, options: SessionOptions, on_error: ErrorCallback) -> Self {
        canvas.set_presentation(PresentationMode::Fullscreen);
        Self {
            vertex_source: vertex_shader(options.dialect),
            gpu,
            canvas,
            instance: None,
            on_error,
            clock: Box::new(SystemTimeSource::new()),
            options,
        }
    }

    /// Replaces the clock feeding `iTime` and frame deltas.
    pub fn with_clock(mut self, mut clock: Box<dyn TimeSource>) -> Self {
        clock.reset();
        self.clock = clock;
        self
    }

    /// Matches the drawable and viewport to the canvas and redraws at once.
    pub fn resize(&mut self) {
        let (width, height) = self.canvas.client_size();
        self.canvas.resize_drawable(width, height);
        self.gpu.set_viewport(width, height);
        tracing::trace!(width, height, "canvas resized");
        if self.instance.is_some() {
            self.redraw();
        }
    }

    /// Builds `source` and installs it, or reports why it could not.
    ///
    /// A failed build leaves the running instance untouched and calls the
    /// error callback exactly once.
    pub fn eval(&mut self, source: &str, document: &DocumentId) -> EvalOutcome {
        let fragment = wrap_fragment(source, self.options.dialect);
        let program = match build_program(&self.gpu, &self.vertex_source, &fragment) {
            Ok(program) => program,
            Err(err) => {
                tracing::debug!(%document, %err, "shader build failed");
                self.report(&translate(err.diagnostic_text(), TEMPLATE_HEADER_LINES), document);
                return EvalOutcome::Rejected;
            }
        };

        let (outcome, report) = match self.instance.as_mut() {
            Some(instance) => {
                let previous = std::mem::replace(&mut instance.program, program);
                self.gpu.release_program(previous);
                let report = instance.uniforms.rebuild(&self.gpu, program);
                instance.frames.restart();
                (EvalOutcome::Reloaded, report)
            }
            None => {
                let geometry = match self.gpu.create_quad() {
                    Ok(geometry) => geometry,
                    Err(text) => {
                        self.gpu.release_program(program);
                        self.report(&ShaderDiagnostic::Raw { text }, document);
                        return EvalOutcome::Rejected;
                    }
                };
                let mut instance = ShaderInstance::new(program, geometry, self.options.idle_frames);
                let report = instance.uniforms.rebuild(&self.gpu, program);
                self.instance = Some(instance);
                (EvalOutcome::Started, report)
            }
        };
        self.apply_defaults(&report);

        let uniforms = self.uniforms().map_or(0, |uniforms| uniforms.names().count());
        match outcome {
            EvalOutcome::Started => tracing::info!(%document, uniforms, "shader started"),
            _ => tracing::info!(%document, uniforms, "shader reloaded"),
        }

        if let Some(mode) = size_directive(source) {
            tracing::debug!(?mode, "size directive");
            self.canvas.set_presentation(mode);
        }
        self.redraw();
        outcome
    }

    /// Whether the render loop wants another frame scheduled.
    pub fn wants_tick(&self) -> bool {
        self.instance
            .as_ref()
            .is_some_and(|instance| instance.frames.is_animating())
    }

    /// Draws one scheduled frame; `None` when nothing is animating.
    pub fn tick(&mut self) -> Option<LoopState> {
        if !self.wants_tick() {
            return None;
        }
        self.draw_frame()
    }

    /// Draws immediately regardless of the loop state.
    pub fn redraw(&mut self) -> Option<LoopState> {
        self.draw_frame()
    }

    /// Host handle to a uniform of the running shader. `iTime` and
    /// `iResolution` are never returned.
    pub fn uniform(&mut self, name: &str) -> Option<UniformHandle<'_, G::Location>> {
        self.instance.as_mut()?.handle(name)
    }

    pub fn uniforms(&self) -> Option<&UniformRegistry<G::Location>> {
        self.instance.as_ref().map(|instance| &instance.uniforms)
    }

    pub fn snapshot(&self) -> BTreeMap<String, UniformSnapshot> {
        self.uniforms()
            .map(UniformRegistry::snapshot)
            .unwrap_or_default()
    }

    pub fn loop_state(&self) -> Option<LoopState> {
        self.instance.as_ref().map(|instance| instance.frames.state())
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// Frees the program and quad. Call while the context is still current.
    pub fn release(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.gpu.release_program(instance.program);
            self.gpu.release_quad(instance.geometry);
        }
    }

    fn draw_frame(&mut self) -> Option<LoopState> {
        let instance = self.instance.as_mut()?;
        let now = self.clock.sample();
        let state = instance.draw(&self.gpu, now, self.canvas.drawable_size());
        self.canvas.present();
        Some(state)
    }

    fn apply_defaults(&mut self, report: &RebuildReport) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        for name in &report.added {
            let (Some(values), Some(slot)) = (
                self.options.defaults.get(name),
                instance.uniforms.get_mut(name),
            ) else {
                continue;
            };
            let count = slot.count();
            for (index, value) in values.iter().take(count).enumerate() {
                slot.set_value(*value, index);
            }
        }
    }

    fn report(&mut self, diagnostic: &ShaderDiagnostic, document: &DocumentId) {
        (self.on_error)(diagnostic, document);
    }
}

impl<G: Gpu, C: Canvas> fmt::Debug for ShaderSession<G, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderSession")
            .field("options", &self.options)
            .field("loop_state", &self.loop_state())
            .field("uniforms", &self.snapshot())
            .finish_non_exhaustive()
    }
}
