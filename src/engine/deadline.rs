//! Block deadline guard.
//!
//! When enabled, every block is timed against a fraction of its real-time
//! period. An overrun is reported and the effects chain is skipped for the
//! next few blocks so the engine can catch up. Nothing here ever blocks.

use std::time::{Duration, Instant};

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadlineMiss {
    pub elapsed: Duration,
    pub budget: Duration,
}

#[derive(Debug)]
pub struct DeadlineMonitor {
    enabled: bool,
    budget: Duration,
    degrade_blocks: usize,
    degraded: usize,
}

impl DeadlineMonitor {
    pub fn new(config: &EngineConfig) -> Self {
        let period = config.block_size as f64 / f64::from(config.sample_rate);
        Self {
            enabled: config.deadline_guard,
            budget: Duration::from_secs_f64(period * f64::from(config.deadline_budget)),
            degrade_blocks: config.degrade_blocks,
            degraded: 0,
        }
    }

    /// Start timing a block. `None` when the guard is off.
    #[inline]
    pub fn begin(&self) -> Option<Instant> {
        self.enabled.then(Instant::now)
    }

    /// True while effects should be bypassed.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded > 0
    }

    /// Finish timing. Consumes one degraded block and reports an overrun.
    pub fn end(&mut self, started: Option<Instant>) -> Option<DeadlineMiss> {
        self.degraded = self.degraded.saturating_sub(1);
        let elapsed = started?.elapsed();
        self.check(elapsed)
    }

    fn check(&mut self, elapsed: Duration) -> Option<DeadlineMiss> {
        if elapsed <= self.budget {
            return None;
        }
        self.degraded = self.degrade_blocks;
        Some(DeadlineMiss {
            elapsed,
            budget: self.budget,
        })
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}
