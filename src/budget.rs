//! Work budgets for long-running stages
//!
//! Subsequence enumeration and itemset mining call [`Budget::tick`] once per
//! unit of work. When the budget runs out, or the shared cancel flag is raised,
//! the stage stops and reports what it has so far with `truncated = true`.

use crate::config::BudgetConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the wall clock is sampled, in ticks
const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Per-stage work budget
#[derive(Debug, Clone)]
pub struct Budget {
    deadline: Option<Instant>,
    max_iterations: Option<u64>,
    cancel: Option<Arc<AtomicBool>>,
    used: u64,
    exhausted: bool,
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Budget {
    /// A budget that never runs out
    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            max_iterations: None,
            cancel: None,
            used: 0,
            exhausted: false,
        }
    }

    /// Start a fresh budget for one stage
    pub fn for_stage(config: &BudgetConfig, cancel: Option<Arc<AtomicBool>>) -> Self {
        Self {
            deadline: config
                .max_stage_millis
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            max_iterations: config.max_stage_iterations,
            cancel,
            used: 0,
            exhausted: false,
        }
    }

    /// Limit the number of work units
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Consume one unit of work. Returns `false` once the budget is spent.
    pub fn tick(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        self.used += 1;

        if let Some(max) = self.max_iterations {
            if self.used > max {
                self.exhausted = true;
                return false;
            }
        }
        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                self.exhausted = true;
                return false;
            }
        }
        if let Some(deadline) = self.deadline {
            if self.used % CLOCK_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                self.exhausted = true;
                return false;
            }
        }
        true
    }

    /// Whether the stage was cut short
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Work units consumed so far
    pub fn used(&self) -> u64 {
        self.used
    }
}
