use serde::Serialize;

/// Elapsed time reported for the first tick after a (re)start or wake-up.
pub const NOMINAL_FRAME_SECONDS: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Animating,
}

/// Per-instance frame scheduler.
///
/// The loop does not own a timer; it answers whether another tick is wanted
/// and does the bookkeeping around each tick the host performs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLoop {
    state: LoopState,
    age: u32,
    previous: Option<f64>,
    idle_frames: u32,
}

impl RenderLoop {
    pub fn new(idle_frames: u32) -> Self {
        Self {
            state: LoopState::Animating,
            age: 0,
            previous: None,
            idle_frames,
        }
    }

    /// Called when the instance is created or its program replaced.
    pub fn restart(&mut self) {
        self.state = LoopState::Animating;
        self.age = 0;
        self.previous = None;
    }

    /// Host mutation: reset the age and resume ticking if idle.
    pub fn wake(&mut self) {
        self.age = 0;
        if self.state == LoopState::Idle {
            tracing::trace!("render loop woken");
            self.state = LoopState::Animating;
        }
    }

    /// Returns the elapsed seconds to feed this tick's frame modifiers.
    pub fn begin_tick(&mut self, now: f64) -> f32 {
        let elapsed = match self.previous {
            Some(previous) if self.age > 0 => (now - previous).max(0.0) as f32,
            _ => NOMINAL_FRAME_SECONDS,
        };
        self.previous = Some(now);
        elapsed
    }

    /// Ages the loop by one frame and decides whether to keep ticking.
    pub fn end_tick(&mut self, continuous_time: bool) -> LoopState {
        self.age = self.age.saturating_add(1);
        if !continuous_time && self.age > self.idle_frames {
            if self.state == LoopState::Animating {
                tracing::debug!(frames = self.age, "render loop idle");
            }
            self.state = LoopState::Idle;
        }
        self.state
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        self.state == LoopState::Animating
    }

    pub fn age(&self) -> u32 {
        self.age
    }
}
