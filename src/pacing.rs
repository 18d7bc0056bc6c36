use std::time::Duration;

use rand::Rng;

use crate::config::PacingConfig;

/// Waits between browser actions. Blocking; not interruptible mid-wait.
pub trait Pacer {
    fn pause(&self);
}

/// Uniformly random pause between the configured bounds.
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    pub fn new(cfg: PacingConfig) -> Self {
        Self {
            min: cfg.min,
            max: cfg.max,
        }
    }

    fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}

impl Pacer for RandomDelay {
    fn pause(&self) {
        std::thread::sleep(self.next_delay());
    }
}

/// Used when both bounds are zero.
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&self) {}
}
