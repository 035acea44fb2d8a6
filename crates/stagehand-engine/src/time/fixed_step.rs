/// Tolerance for float drift when wall-clock deltas are summed.
const STEP_EPSILON: f64 = 1e-9;

/// Fixed-timestep accumulator.
///
/// Wall-clock time goes in through [`FixedStep::begin_frame`]; whole ticks of exactly
/// `step` seconds come out of [`FixedStep::should_step`]. Elapsed time is never
/// dropped: a long stall produces a burst of ticks on the next frame instead.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f64,
    accumulator: f64,
    /// Simulated seconds so far (`step_count * step`).
    pub total_time: f64,
    pub step_count: u64,
    pub steps_this_frame: u32,
}

impl FixedStep {
    pub fn new(step: f64) -> Self {
        debug_assert!(step > 0.0, "fixed step must be positive");
        Self {
            step,
            accumulator: 0.0,
            total_time: 0.0,
            step_count: 0,
            steps_this_frame: 0,
        }
    }

    /// Step size in seconds.
    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Adds one frame worth of wall-clock time.
    pub fn begin_frame(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }
        self.steps_this_frame = 0;
    }

    /// Consumes one tick if enough time has accumulated.
    pub fn should_step(&mut self) -> bool {
        if self.accumulator + STEP_EPSILON >= self.step {
            self.accumulator -= self.step;
            self.total_time += self.step;
            self.step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    /// Fraction of a step left over, in [0, 1).
    pub fn alpha(&self) -> f64 {
        (self.accumulator / self.step).clamp(0.0, 1.0)
    }

    /// Drops leftover time without touching counters.
    pub fn reset_accumulator(&mut self) {
        self.accumulator = 0.0;
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks_for(deltas: &[f64]) -> u64 {
        let mut fs = FixedStep::new(1.0 / 60.0);
        for &dt in deltas {
            fs.begin_frame(dt);
            while fs.should_step() {}
        }
        fs.step_count
    }

    #[test]
    fn one_second_in_a_single_delta() {
        assert_eq!(ticks_for(&[1.0]), 60);
    }

    #[test]
    fn one_second_in_step_sized_deltas() {
        assert_eq!(ticks_for(&[1.0 / 60.0; 60]), 60);
    }

    #[test]
    fn one_second_in_irregular_chunks() {
        assert_eq!(ticks_for(&[0.3, 0.05, 0.001, 0.149, 0.25, 0.2, 0.05]), 60);
        assert_eq!(ticks_for(&[0.1; 10]), 60);
        assert_eq!(ticks_for(&[1.0 / 7.0; 7]), 60);
    }

    #[test]
    fn steps_this_frame_reports_bursts() {
        let mut fs = FixedStep::new(0.1);
        fs.begin_frame(0.35);
        while fs.should_step() {}
        assert_eq!(fs.steps_this_frame, 3);
        assert!((fs.alpha() - 0.5).abs() < 1e-6);

        fs.begin_frame(0.01);
        while fs.should_step() {}
        assert_eq!(fs.steps_this_frame, 0);
    }

    #[test]
    fn long_stall_is_not_dropped() {
        let mut fs = FixedStep::new(0.5);
        fs.begin_frame(10.0);
        while fs.should_step() {}
        assert_eq!(fs.step_count, 20);
        assert!((fs.total_time - 10.0).abs() < 1e-9);
    }
}
