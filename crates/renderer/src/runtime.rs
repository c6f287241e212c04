use std::time::Instant;

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces the session time, in seconds, for the next frame.
    fn sample(&mut self) -> f64;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn sample(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Time source that advances by a fixed step on every sample.
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    start: f64,
    step: f64,
    samples: u64,
}

impl SteppedTimeSource {
    /// First sample returns `start`, each later one adds `step`.
    pub fn new(start: f64, step: f64) -> Self {
        Self {
            start,
            step,
            samples: 0,
        }
    }
}

impl TimeSource for SteppedTimeSource {
    fn reset(&mut self) {
        self.samples = 0;
    }

    fn sample(&mut self) -> f64 {
        let time = self.start + self.step * self.samples as f64;
        self.samples = self.samples.saturating_add(1);
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_source_is_deterministic() {
        let mut source = SteppedTimeSource::new(1.0, 0.5);
        assert_eq!(source.sample(), 1.0);
        assert_eq!(source.sample(), 1.5);
        source.reset();
        assert_eq!(source.sample(), 1.0);
    }

    #[test]
    fn system_source_is_monotonic() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        assert!(source.sample() >= first);
    }
}
