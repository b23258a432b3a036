/// Frame timer

use std::time::{Duration, Instant};

/// Timer collaborator consumed once per idle tick
pub trait Timer {
    fn start(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Advance one tick: elapsed time becomes the time since the previous tick
    fn run(&mut self);

    /// Milliseconds between the last two ticks (0 while paused or stopped)
    fn elapsed_time(&self) -> f32;
}

/// [`Timer`] over [`Instant`]
#[derive(Debug, Default)]
pub struct StopwatchTimer {
    last_tick: Option<Instant>,
    elapsed: Duration,
    paused: bool,
}

impl StopwatchTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.last_tick.is_some() && !self.paused
    }
}

impl Timer for StopwatchTimer {
    fn start(&mut self) {
        self.last_tick = Some(Instant::now());
        self.elapsed = Duration::ZERO;
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
        self.elapsed = Duration::ZERO;
    }

    fn stop(&mut self) {
        self.last_tick = None;
        self.elapsed = Duration::ZERO;
        self.paused = false;
    }

    fn run(&mut self) {
        if self.paused {
            return;
        }
        let Some(previous) = self.last_tick else {
            return;
        };
        let now = Instant::now();
        self.elapsed = now.duration_since(previous);
        self.last_tick = Some(now);
    }

    fn elapsed_time(&self) -> f32 {
        self.elapsed.as_secs_f32() * 1000.0
    }
}
