use std::time::{Duration, Instant};

/// Wall-clock time between two rendered frames.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    pub dt: f32,
    /// `dt` at full precision. The fixed-step accumulator consumes this one.
    pub dt_secs: f64,
    pub now: Instant,
    pub frame_index: u64,
}

/// Measures frame deltas for the window runtime.
///
/// Deltas are floored so a tight loop never reports zero. The default clock also caps
/// them so a debugger pause does not turn into a burst of simulation. The stage runs
/// [`unclamped`](FrameClock::unclamped) and handles bursts itself as frame misses.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    min_dt: Duration,
    max_dt: Option<Duration>,
}

const MIN_DT: Duration = Duration::from_micros(100);
const MAX_DT: Duration = Duration::from_millis(250);

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now(), Some(MAX_DT))
    }

    pub fn unclamped() -> Self {
        Self::starting_at(Instant::now(), None)
    }

    fn starting_at(start: Instant, max_dt: Option<Duration>) -> Self {
        Self {
            last: start,
            frame_index: 0,
            min_dt: MIN_DT,
            max_dt,
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let mut dt = now.saturating_duration_since(self.last).max(self.min_dt);
        if let Some(max) = self.max_dt {
            dt = dt.min(max);
        }
        self.last = now;

        let frame_index = self.frame_index;
        self.frame_index = self.frame_index.wrapping_add(1);
        FrameTime {
            dt: dt.as_secs_f32(),
            dt_secs: dt.as_secs_f64(),
            now,
            frame_index,
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

    #[test]
    fn frames_are_numbered_and_never_zero_length() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start, Some(MAX_DT));
        let a = clock.tick_at(start);
        let b = clock.tick_at(start + Duration::from_millis(16));
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert_eq!(a.dt_secs, MIN_DT.as_secs_f64());
        assert!((b.dt_secs - 0.016).abs() < 1e-9);
    }

    #[test]
    fn default_clock_caps_stalls() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start, Some(MAX_DT));
        let ft = clock.tick_at(start + Duration::from_secs(3));
        assert_eq!(ft.dt_secs, 0.25);
    }

    #[test]
    fn unclamped_clock_reports_the_whole_stall() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start, None);
        let ft = clock.tick_at(start + Duration::from_secs(3));
        assert_eq!(ft.dt_secs, 3.0);
    }
}
