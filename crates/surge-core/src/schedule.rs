use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Interpolation mode between stage targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RampMode {
    /// Each stage holds its literal target for its whole duration.
    Step,
    /// Concurrency ramps from the previous stage's target to this stage's
    /// target over the stage duration (0 before the first stage).
    Linear,
}

impl RampMode {
    /// Returns the canonical lowercase string used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Linear => "linear",
        }
    }
}

impl Default for RampMode {
    fn default() -> Self {
        Self::Step
    }
}

impl FromStr for RampMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "step" => Ok(Self::Step),
            "linear" => Ok(Self::Linear),
            _ => Err(()),
        }
    }
}

/// A time-bounded segment of the load schedule with a fixed concurrency target.
///
/// Immutable once a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// How long this stage lasts.
    pub duration: Duration,
    /// Virtual users targeted while this stage is active.
    pub target: u32,
}

impl Stage {
    /// Creates a stage.
    #[must_use]
    pub const fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// Ordered sequence of stages mapping elapsed run time to a target
/// virtual-user count.
#[derive(Debug, Clone)]
pub struct RateSchedule {
    stages: Vec<Stage>,
    ramp: RampMode,
    total: Duration,
}

impl RateSchedule {
    /// Builds a schedule with step interpolation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` when `stages` is empty or any stage has a
    /// zero duration.
    pub fn new(stages: Vec<Stage>) -> EngineResult<Self> {
        Self::with_ramp(stages, RampMode::Step)
    }

    /// Builds a schedule with an explicit ramp mode.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` when `stages` is empty or any stage has a
    /// zero duration.
    pub fn with_ramp(stages: Vec<Stage>, ramp: RampMode) -> EngineResult<Self> {
        if stages.is_empty() {
            return Err(EngineError::invalid_schedule("schedule has no stages"));
        }
        for (idx, stage) in stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(EngineError::invalid_schedule(format!(
                    "stage {idx} has zero duration"
                )));
            }
        }
        let total = stages.iter().map(|stage| stage.duration).sum();
        Ok(Self {
            stages,
            ramp,
            total,
        })
    }

    /// Sum of all stage durations.
    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.total
    }

    /// True once `elapsed` has reached the end of the final stage.
    #[must_use]
    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.total
    }

    /// Target concurrency at `elapsed`.
    ///
    /// Returns 0 once the schedule is over, signaling run completion.
    #[must_use]
    pub fn concurrency_at(&self, elapsed: Duration) -> u32 {
        if self.is_complete(elapsed) {
            return 0;
        }
        let mut start = Duration::ZERO;
        let mut prev_target = 0_u32;
        for stage in &self.stages {
            let end = start + stage.duration;
            if elapsed < end {
                return match self.ramp {
                    RampMode::Step => stage.target,
                    RampMode::Linear => {
                        let frac =
                            (elapsed - start).as_secs_f64() / stage.duration.as_secs_f64();
                        let from = f64::from(prev_target);
                        let to = f64::from(stage.target);
                        (from + (to - from) * frac).round() as u32
                    }
                };
            }
            prev_target = stage.target;
            start = end;
        }
        0
    }

    /// The stages in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The configured ramp mode.
    #[must_use]
    pub const fn ramp(&self) -> RampMode {
        self.ramp
    }
}
