use super::*;
use crate::synth::random_inventory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Cancels once it has been polled `limit` times.
struct CancelAfter {
    polls: AtomicUsize,
    limit: usize,
}

impl SearchMonitor for CancelAfter {
    fn is_cancelled(&self) -> bool {
        self.polls.fetch_add(1, Ordering::SeqCst) >= self.limit
    }
}

#[derive(Default)]
struct Recorder {
    reports: Mutex<Vec<SearchProgress>>,
}

impl SearchMonitor for Recorder {
    fn report(&self, progress: &SearchProgress) {
        self.reports.lock().expect("lock").push(*progress);
    }
}

#[test]
fn cancelled_before_start_returns_cancelled() {
    let catalog = base_catalog();
    let inventory = random_inventory(&catalog, 4, &mut fx::make_rng());
    let token = CancellationToken::new();
    token.cancel();
    let outcome = process(&catalog, &inventory, &SearchRequest::default(), &keep_all, &token)
        .expect("valid input");
    assert!(outcome.is_cancelled());
}

#[test]
fn cancelled_mid_search_never_returns_sets() {
    let catalog = base_catalog();
    let inventory = random_inventory(&catalog, 6, &mut fx::make_rng());
    for limit in [1, 5, 20] {
        let monitor = CancelAfter {
            polls: AtomicUsize::new(0),
            limit,
        };
        let outcome = process(&catalog, &inventory, &SearchRequest::default(), &keep_all, &monitor)
            .expect("valid input");
        match outcome {
            SearchOutcome::Cancelled { progress, .. } => {
                assert!(progress.processed < progress.combos);
            }
            SearchOutcome::Completed(_) => panic!("limit {limit}: search ignored cancellation"),
        }
    }
}

#[test]
fn uncancelled_monitor_completes() {
    let catalog = base_catalog();
    let inventory = random_inventory(&catalog, 3, &mut fx::make_rng());
    let monitor = CancelAfter {
        polls: AtomicUsize::new(0),
        limit: usize::MAX,
    };
    let outcome = process(&catalog, &inventory, &SearchRequest::default(), &keep_all, &monitor)
        .expect("valid input");
    assert!(outcome.completed().is_some());
}

#[test]
fn final_progress_report_covers_every_combination() {
    let catalog = base_catalog();
    let inventory = random_inventory(&catalog, 4, &mut fx::make_rng());
    let recorder = Recorder::default();
    let result = process(&catalog, &inventory, &SearchRequest::default(), &keep_all, &recorder)
        .expect("valid input")
        .completed()
        .expect("completed");
    let reports = recorder.reports.lock().expect("lock");
    let last = reports.last().expect("at least one report");
    assert_eq!(last.processed, result.info.combos);
    assert_eq!(last.combos, result.info.combos);
}
