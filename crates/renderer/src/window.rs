//! Desktop host: a winit window with a glutin GL context driving one
//! [`ShaderSession`].
//!
//! Every request from other threads (new source, uniform commands, shutdown)
//! travels as a [`LiveCommand`] user event, so the session is only ever
//! touched from the event-loop thread and reloads apply in arrival order.

use std::ffi::CString;
use std::num::NonZeroU32;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Sender};
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentContext, NotCurrentGlContext,
    PossiblyCurrentContext, Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::{HasRawWindowHandle, RawWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::command::{UniformCommand, UniformReply};
use crate::session::{Canvas, ErrorCallback, ShaderSession};
use crate::types::{ContextPreference, DocumentId, PresentationMode, SessionOptions, ShaderDialect};

/// Requests the window thread applies in FIFO order.
#[derive(Debug)]
pub enum LiveCommand {
    Eval { source: String, document: DocumentId },
    Uniform {
        command: UniformCommand,
        reply: Option<Sender<UniformReply>>,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    pub title: String,
    /// Inner size before any presentation switch.
    pub size: (u32, u32),
    /// Inner size used for [`PresentationMode::Small`].
    pub small_size: (u32, u32),
    pub context: ContextPreference,
    /// Starting presentation; sessions otherwise open fullscreen.
    pub presentation: PresentationMode,
    /// The dialect inside is replaced by the one the context supports.
    pub session: SessionOptions,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "shadelive".to_string(),
            size: (1280, 720),
            small_size: (480, 270),
            context: ContextPreference::Auto,
            presentation: PresentationMode::Fullscreen,
            session: SessionOptions::default(),
        }
    }
}

/// Cloneable, `Send` handle for feeding the window from other threads.
#[derive(Debug, Clone)]
pub struct LiveProxy {
    proxy: EventLoopProxy<LiveCommand>,
}

impl LiveProxy {
    pub fn eval(&self, source: String, document: DocumentId) -> Result<()> {
        self.send(LiveCommand::Eval { source, document })
    }

    /// Applies `command` and waits for the window thread's answer.
    pub fn uniform(&self, command: UniformCommand) -> Result<UniformReply> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(LiveCommand::Uniform {
            command,
            reply: Some(reply_tx),
        })?;
        reply_rx
            .recv()
            .map_err(|err| anyhow!("window closed before replying: {err}"))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(LiveCommand::Shutdown)
    }

    fn send(&self, command: LiveCommand) -> Result<()> {
        self.proxy
            .send_event(command)
            .map_err(|_| anyhow!("window event loop has exited"))
    }
}

/// [`Canvas`] backed by a winit window and its GL surface.
pub struct WindowCanvas {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    drawable: (u32, u32),
    small_size: (u32, u32),
    window: Window,
}

impl WindowCanvas {
    pub fn window(&self) -> &Window {
        &self.window
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

impl Canvas for WindowCanvas {
    fn client_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.drawable
    }

    fn resize_drawable(&mut self, width: u32, height: u32) {
        // Minimised windows report zero; keep the last real size.
        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            return;
        };
        self.surface.resize(&self.context, w, h);
        self.drawable = (width, height);
    }

    fn set_presentation(&mut self, mode: PresentationMode) {
        match mode {
            PresentationMode::Fullscreen => {
                self.window
                    .set_fullscreen(Some(Fullscreen::Borderless(None)));
            }
            PresentationMode::Small => {
                self.window.set_fullscreen(None);
                let (width, height) = self.small_size;
                let _ = self
                    .window
                    .request_inner_size(PhysicalSize::new(width, height));
            }
        }
    }

    fn present(&mut self) {
        if let Err(err) = self.surface.swap_buffers(&self.context) {
            tracing::warn!(%err, "failed to swap buffers");
        }
    }
}

/// Window, GL context, and session, ready to run on the main thread.
pub struct LiveWindow {
    event_loop: EventLoop<LiveCommand>,
    session: ShaderSession<glow::Context, WindowCanvas>,
}

impl LiveWindow {
    pub fn new(mut options: WindowOptions, on_error: ErrorCallback) -> Result<Self> {
        let event_loop = EventLoopBuilder::<LiveCommand>::with_user_event()
            .build()
            .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

        let (width, height) = options.size;
        let window_builder = WindowBuilder::new()
            .with_title(&options.title)
            .with_inner_size(PhysicalSize::new(width, height));
        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_builder(Some(window_builder))
            .build(&event_loop, template, |configs| {
                configs
                    .reduce(|best, next| {
                        if next.num_samples() < best.num_samples() {
                            next
                        } else {
                            best
                        }
                    })
                    .expect("glutin offers at least one config")
            })
            .map_err(|err| anyhow!("failed to create GL display: {err}"))?;
        let window = window.ok_or_else(|| anyhow!("GL display came up without a window"))?;

        let raw_window_handle = window.raw_window_handle();
        let (context, dialect) = create_context(&gl_config, raw_window_handle, options.context)?;

        let size = window.inner_size();
        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            NonZeroU32::new(size.width.max(1)).unwrap_or(NonZeroU32::MIN),
            NonZeroU32::new(size.height.max(1)).unwrap_or(NonZeroU32::MIN),
        );
        let display = gl_config.display();
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
            .context("failed to create GL window surface")?;
        let context = context
            .make_current(&surface)
            .context("failed to make GL context current")?;
        if let Err(err) =
            surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN))
        {
            tracing::debug!(%err, "vsync unavailable");
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| match CString::new(symbol) {
                Ok(symbol) => display.get_proc_address(&symbol),
                Err(_) => std::ptr::null(),
            })
        };

        let canvas = WindowCanvas {
            surface,
            context,
            drawable: (size.width, size.height),
            small_size: options.small_size,
            window,
        };
        options.session.dialect = dialect;
        tracing::info!(?dialect, width = size.width, height = size.height, "GL context ready");

        let mut session = ShaderSession::new(gl, canvas, options.session, on_error);
        if options.presentation != PresentationMode::Fullscreen {
            session.canvas_mut().set_presentation(options.presentation);
        }
        session.resize();

        Ok(Self {
            event_loop,
            session,
        })
    }

    pub fn proxy(&self) -> LiveProxy {
        LiveProxy {
            proxy: self.event_loop.create_proxy(),
        }
    }

    /// Runs until the window closes or a shutdown command arrives.
    pub fn run(self) -> Result<()> {
        let Self {
            event_loop,
            mut session,
        } = self;

        event_loop
            .run(move |event, elwt| match event {
                Event::UserEvent(command) => match command {
                    LiveCommand::Eval { source, document } => {
                        session.eval(&source, &document);
                    }
                    LiveCommand::Uniform { command, reply } => {
                        let answer = session.apply(command);
                        if let Some(reply) = reply {
                            let _ = reply.send(answer);
                        }
                    }
                    LiveCommand::Shutdown => elwt.exit(),
                },
                Event::WindowEvent { window_id, event }
                    if window_id == session.canvas().window().id() =>
                {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => elwt.exit(),
                        WindowEvent::Resized(_) => session.resize(),
                        WindowEvent::RedrawRequested => {
                            session.tick();
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    if session.wants_tick() {
                        session.canvas().request_redraw();
                    } else {
                        tracing::trace!("render loop idle; waiting for events");
                    }
                    elwt.set_control_flow(ControlFlow::Wait);
                }
                Event::LoopExiting => session.release(),
                _ => {}
            })
            .map_err(|err| anyhow!("window event loop error: {err}"))
    }
}

/// Tries the context flavours `preference` allows, in order.
fn create_context(
    config: &Config,
    window: RawWindowHandle,
    preference: ContextPreference,
) -> Result<(NotCurrentContext, ShaderDialect)> {
    let gles = (ContextApi::Gles(Some(Version::new(3, 0))), ShaderDialect::Gles300);
    let desktop = (
        ContextApi::OpenGl(Some(Version::new(3, 3))),
        ShaderDialect::Glsl330,
    );
    let attempts = match preference {
        ContextPreference::Auto => vec![gles, desktop],
        ContextPreference::Gles => vec![gles],
        ContextPreference::Desktop => vec![desktop],
    };

    let display = config.display();
    let mut failures = Vec::new();
    for (api, dialect) in attempts {
        let mut attributes = ContextAttributesBuilder::new().with_context_api(api);
        if dialect == ShaderDialect::Glsl330 {
            attributes = attributes.with_profile(GlProfile::Core);
        }
        let attributes = attributes.build(Some(window));
        match unsafe { display.create_context(config, &attributes) } {
            Ok(context) => return Ok((context, dialect)),
            Err(err) => {
                tracing::debug!(?api, %err, "GL context flavour unavailable");
                failures.push(format!("{api:?}: {err}"));
            }
        }
    }
    Err(anyhow!(
        "no usable GL context ({})",
        failures.join("; ")
    ))
}
