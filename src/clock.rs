/// Frame clock
///
/// Turns wall time into the per-frame delta fed to `InputManager::update`,
/// for hosts that do not already track frame timing.
use std::time::{Duration, Instant};

/// Frame timing state
pub struct FrameClock {
    /// Time of last tick
    last_tick: Instant,

    /// Time when the clock started
    start_time: Instant,

    /// Whether time is frozen
    paused: bool,

    /// Current frame number
    frame_count: u64,

    /// Delta of the last tick, in seconds
    delta_time: f32,
}

impl FrameClock {
    /// Start a clock at the current instant
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_tick: now,
            start_time: now,
            paused: false,
            frame_count: 0,
            delta_time: 0.0,
        }
    }

    /// Begin a new frame, returns seconds since the previous one
    /// (zero while paused)
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.frame_count += 1;

        self.delta_time = if self.paused {
            0.0
        } else {
            frame_time.as_secs_f32()
        };
        self.delta_time
    }

    /// Delta of the last tick, in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Wall time since the clock was created
    pub fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self.start_time)
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check if the clock is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause the clock
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Frame clock paused");
        }
    }

    /// Resume the clock
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Time spent paused is not reported as one long frame
            self.last_tick = Instant::now();
            log::info!("Frame clock resumed");
        }
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_creation() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame_count(), 0);
        assert_eq!(clock.delta_time(), 0.0);
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_tick_measures_time() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick();
        assert!(delta >= 0.01);
        assert_eq!(clock.frame_count(), 1);
        assert_eq!(clock.delta_time(), delta);
    }

    #[test]
    fn test_paused_ticks_are_zero() {
        let mut clock = FrameClock::new();
        clock.pause();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(clock.tick(), 0.0);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_resume_skips_paused_time() {
        let mut clock = FrameClock::new();
        clock.toggle_pause();
        assert!(clock.is_paused());
        thread::sleep(Duration::from_millis(50));
        clock.toggle_pause();
        assert!(!clock.is_paused());
        assert!(clock.tick() < 0.05);
    }
}
