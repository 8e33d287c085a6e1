//! Cooperative cancellation and progress reporting for a running search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Progress snapshot taken at a search checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub elapsed: Duration,
    /// Size of the full cross product.
    pub combos: u64,
    /// Combinations accounted for so far, evaluated or pruned.
    pub processed: u64,
}

impl SearchProgress {
    pub fn fraction(&self) -> f64 {
        if self.combos == 0 {
            return 1.0;
        }
        self.processed as f64 / self.combos as f64
    }

    /// Linear extrapolation from the rate so far. `None` before any work is done.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let fraction = self.fraction();
        if self.processed == 0 || fraction <= 0.0 {
            return None;
        }
        let total = self.elapsed.as_secs_f64() / fraction;
        Some(Duration::from_secs_f64((total - self.elapsed.as_secs_f64()).max(0.0)))
    }
}

/// Observer polled by the search at its checkpoints.
///
/// Checkpoints sit after each first- and second-level subtree, so the delay
/// between a cancel request and the search halting is bounded by one such
/// subtree.
pub trait SearchMonitor: Sync {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn report(&self, _progress: &SearchProgress) {}
}

/// Runs to completion and reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmonitored;

impl SearchMonitor for Unmonitored {}

/// Shared cancel flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl SearchMonitor for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time_extrapolates_linearly() {
        let progress = SearchProgress {
            elapsed: Duration::from_secs(2),
            combos: 100,
            processed: 25,
        };
        let remaining = progress.estimated_remaining().unwrap();
        assert!((remaining.as_secs_f64() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn no_estimate_before_any_progress() {
        let progress = SearchProgress {
            elapsed: Duration::from_millis(5),
            combos: 100,
            processed: 0,
        };
        assert_eq!(progress.estimated_remaining(), None);
    }

    #[test]
    fn token_clones_share_the_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
