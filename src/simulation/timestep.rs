//! 固定时间步累加器

/// 按固定步长切分帧间隔
///
/// 每帧把 `delta` 累加进来，返回本帧应执行的步数，余量留到下一帧。
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimestep {
    step: f64,
    accumulator: f64,
    max_substeps: Option<u32>,
}

impl FixedTimestep {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            accumulator: 0.0,
            max_substeps: None,
        }
    }

    pub fn with_max_substeps(mut self, max_substeps: Option<u32>) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// 累加帧间隔，返回应执行的步数
    ///
    /// 达到 `max_substeps` 时丢弃多余的累积时间。负值和非有限值被忽略。
    pub fn accumulate(&mut self, delta: f64) -> u32 {
        if !delta.is_finite() || delta <= 0.0 || self.step <= 0.0 {
            return 0;
        }

        self.accumulator += delta;
        let mut steps = 0u32;
        while self.accumulator >= self.step {
            if self.max_substeps.is_some_and(|max| steps >= max) {
                tracing::debug!(
                    target: "mujoco.manager",
                    "Dropping {:.4}s of accumulated time after {} substeps",
                    self.accumulator,
                    steps
                );
                self.accumulator %= self.step;
                break;
            }
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    /// 插值系数，范围 [0, 1)
    pub fn alpha(&self) -> f64 {
        if self.step > 0.0 {
            self.accumulator / self.step
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accumulates_across_frames() {
        let mut timestep = FixedTimestep::new(0.01);
        assert_eq!(timestep.accumulate(0.004), 0);
        assert_eq!(timestep.accumulate(0.004), 0);
        assert_eq!(timestep.accumulate(0.004), 1);
        assert!((timestep.accumulator() - 0.002).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_steps_per_frame() {
        let mut timestep = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(timestep.accumulate(0.05 + 1e-9), 3);
    }

    #[test]
    fn test_max_substeps_drops_backlog() {
        let mut timestep = FixedTimestep::new(0.01).with_max_substeps(Some(2));
        assert_eq!(timestep.accumulate(0.105), 2);
        assert!(timestep.accumulator() < 0.01);
        assert_eq!(timestep.accumulate(0.0), 0);
    }

    #[test]
    fn test_invalid_delta_ignored() {
        let mut timestep = FixedTimestep::new(0.01);
        assert_eq!(timestep.accumulate(-1.0), 0);
        assert_eq!(timestep.accumulate(f64::NAN), 0);
        assert_eq!(timestep.accumulator(), 0.0);
    }

    proptest! {
        #[test]
        fn steps_cover_elapsed_time(
            step in 0.001f64..0.1,
            deltas in proptest::collection::vec(0.0f64..0.2, 1..50)
        ) {
            let mut timestep = FixedTimestep::new(step);
            let mut total_steps = 0u64;
            for &delta in &deltas {
                total_steps += timestep.accumulate(delta) as u64;
            }
            let elapsed: f64 = deltas.iter().sum();
            let simulated = total_steps as f64 * step + timestep.accumulator();
            prop_assert!((simulated - elapsed).abs() < 1e-6);
            prop_assert!(timestep.accumulator() < step + 1e-9);
            prop_assert!(timestep.alpha() < 1.0 + 1e-6);
        }
    }
}
