//! Frame scheduling state machine
//!
//! `Idle -> Running -> Stopped`. A stopped loop stays stopped; ticks delivered
//! after [`RenderLoop::stop`] return `None`.

use std::time::{Duration, Instant};

use crate::error::LoopError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Timing for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub frame: u64,
    /// Seconds since the previous tick (zero on the first)
    pub delta: f32,
    /// Seconds since the loop started
    pub elapsed: f32,
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    origin: Option<Instant>,
    last_tick: Option<Instant>,
    frame: u64,
    /// Upper bound on a single delta, so a stall does not fast-forward animations
    max_delta: Duration,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            origin: None,
            last_tick: None,
            frame: 0,
            max_delta: Duration::from_millis(250),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Captures the clock origin and starts ticking
    pub fn start(&mut self, now: Instant) -> Result<(), LoopError> {
        match self.state {
            LoopState::Idle => {
                self.state = LoopState::Running;
                self.origin = Some(now);
                self.last_tick = Some(now);
                log::info!("Render loop started");
                Ok(())
            }
            LoopState::Running => Err(LoopError::AlreadyRunning),
            LoopState::Stopped => Err(LoopError::AlreadyStopped),
        }
    }

    /// Advances the clock; `None` unless the loop is running
    pub fn begin_tick(&mut self, now: Instant) -> Option<FrameTime> {
        if self.state != LoopState::Running {
            log::trace!("Tick ignored in {:?} state", self.state);
            return None;
        }
        let origin = self.origin?;
        let last = self.last_tick.unwrap_or(origin);

        let delta = now.saturating_duration_since(last).min(self.max_delta);
        self.last_tick = Some(now);
        self.frame += 1;

        Some(FrameTime {
            frame: self.frame,
            delta: delta.as_secs_f32(),
            elapsed: now.saturating_duration_since(origin).as_secs_f32(),
        })
    }

    /// Moves to `Stopped`; returns false if it already was
    pub fn stop(&mut self) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }
        self.state = LoopState::Stopped;
        log::info!("Render loop stopped after {} frame(s)", self.frame);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_loop_does_not_tick() {
        let mut render_loop = RenderLoop::new();
        assert_eq!(render_loop.begin_tick(Instant::now()), None);
        assert_eq!(render_loop.state(), LoopState::Idle);
    }

    #[test]
    fn test_tick_timing() {
        let start = Instant::now();
        let mut render_loop = RenderLoop::new();
        assert!(!render_loop.is_running());
        render_loop.start(start).unwrap();
        assert!(render_loop.is_running());

        let first = render_loop.begin_tick(start).unwrap();
        assert_eq!(first.frame, 1);
        assert_eq!(first.delta, 0.0);

        let second = render_loop
            .begin_tick(start + Duration::from_millis(16))
            .unwrap();
        assert_eq!(second.frame, 2);
        assert!((second.delta - 0.016).abs() < 1e-6);
        assert!((second.elapsed - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_long_stall_is_capped() {
        let start = Instant::now();
        let mut render_loop = RenderLoop::new();
        render_loop.start(start).unwrap();
        let tick = render_loop
            .begin_tick(start + Duration::from_secs(10))
            .unwrap();
        assert_eq!(tick.delta, 0.25);
        assert_eq!(tick.elapsed, 10.0);
    }

    #[test]
    fn test_stopped_loop_cannot_restart() {
        let start = Instant::now();
        let mut render_loop = RenderLoop::new();
        render_loop.start(start).unwrap();
        assert_eq!(render_loop.start(start), Err(LoopError::AlreadyRunning));

        assert!(render_loop.stop());
        assert!(!render_loop.stop());
        assert_eq!(render_loop.begin_tick(start), None);
        assert_eq!(render_loop.start(start), Err(LoopError::AlreadyStopped));
    }

    #[test]
    fn test_stop_from_idle() {
        let mut render_loop = RenderLoop::new();
        assert!(render_loop.stop());
        assert_eq!(render_loop.state(), LoopState::Stopped);
    }
}
