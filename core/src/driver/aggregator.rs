//! Shared outcome counters and the admission gate

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::metrics::{LatencyHistogram, LatencyPercentiles};
use crate::response::{IncorrectReason, Outcome};

/// Point-in-time copy of the aggregator's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateCounters {
    /// Requests the run will issue
    pub total: usize,
    /// Maximum requests in flight
    pub concurrency_limit: usize,
    /// Requests admitted so far
    pub admitted: usize,
    /// Outcomes recorded
    pub completed: usize,
    /// Outcomes that were not correct
    pub errors: usize,
    /// Errors caused by a mismatched prediction
    pub wrong_labels: usize,
    /// Errors caused by a missing prediction
    pub transport_failures: usize,
    /// Requests admitted but not yet released
    pub in_flight: usize,
}

#[derive(Debug)]
struct State {
    counters: AggregateCounters,
    latency: LatencyHistogram,
}

/// Race-free bookkeeping for concurrently completing requests
///
/// One mutex guards all counters and one condition variable wakes both kinds
/// of waiter: the control thread blocked in [`admit`](Self::admit) and the
/// control thread blocked in [`wait_for_all`](Self::wait_for_all). Every
/// operation may be called from any thread.
///
/// Invariants: `in_flight <= concurrency_limit`, `completed <= total`,
/// `errors <= total`. Calls that would break them are contract violations
/// and panic.
#[derive(Debug)]
pub struct ResultAggregator {
    state: Mutex<State>,
    changed: Condvar,
}

impl ResultAggregator {
    /// Create an aggregator for `total` requests with at most
    /// `concurrency_limit` in flight
    ///
    /// # Panics
    ///
    /// Panics if either value is zero.
    pub fn new(total: usize, concurrency_limit: usize) -> Self {
        assert!(total >= 1, "aggregator needs at least one request");
        assert!(concurrency_limit >= 1, "concurrency limit must be at least 1");

        Self {
            state: Mutex::new(State {
                counters: AggregateCounters {
                    total,
                    concurrency_limit,
                    ..Default::default()
                },
                latency: LatencyHistogram::new(),
            }),
            changed: Condvar::new(),
        }
    }

    /// Block until a concurrency slot is free, then take it
    pub fn admit(&self) {
        let mut state = self.state.lock();
        let counters = &state.counters;
        assert!(
            counters.admitted < counters.total,
            "admit called more than total ({}) times",
            counters.total
        );

        while state.counters.in_flight >= state.counters.concurrency_limit {
            self.changed.wait(&mut state);
        }
        state.counters.in_flight += 1;
        state.counters.admitted += 1;
    }

    /// Count one incorrect outcome
    pub fn record_error(&self) {
        let mut state = self.state.lock();
        assert!(
            state.counters.errors < state.counters.total,
            "more errors recorded than requests"
        );
        state.counters.errors += 1;
    }

    /// Count one finished request, waking the final waiter on the last one
    pub fn record_completion(&self) {
        let mut state = self.state.lock();
        assert!(
            state.counters.completed < state.counters.total,
            "record_completion called more than total ({}) times",
            state.counters.total
        );
        state.counters.completed += 1;
        if state.counters.completed == state.counters.total {
            self.changed.notify_all();
        }
    }

    /// Give back a concurrency slot, waking a blocked admit
    pub fn release(&self) {
        let mut state = self.state.lock();
        assert!(state.counters.in_flight > 0, "release without matching admit");
        state.counters.in_flight -= 1;
        self.changed.notify_all();
    }

    /// Record a resolved outcome: attribution and latency, then error,
    /// completion and release in that order
    pub fn resolve(&self, outcome: &Outcome, latency: Duration) {
        {
            let mut state = self.state.lock();
            state.latency.record(latency);
            match outcome {
                Outcome::Correct => {}
                Outcome::Incorrect(IncorrectReason::WrongLabel { .. }) => {
                    state.counters.wrong_labels += 1;
                }
                Outcome::Incorrect(IncorrectReason::TransportError(_)) => {
                    state.counters.transport_failures += 1;
                }
            }
        }

        if outcome.is_incorrect() {
            self.record_error();
        }
        self.record_completion();
        self.release();
    }

    /// Block until every request has completed; returns `errors / total`
    pub fn wait_for_all(&self) -> f64 {
        let mut state = self.state.lock();
        while state.counters.completed < state.counters.total {
            self.changed.wait(&mut state);
        }
        state.counters.errors as f64 / state.counters.total as f64
    }

    /// Block until no request is in flight
    ///
    /// For runs that stop dispatching early; outstanding completions still
    /// land and are counted.
    pub fn wait_until_idle(&self) {
        let mut state = self.state.lock();
        while state.counters.in_flight > 0 {
            self.changed.wait(&mut state);
        }
    }

    /// Current number of requests in flight
    pub fn in_flight(&self) -> usize {
        self.state.lock().counters.in_flight
    }

    /// Current number of completed requests
    pub fn completed(&self) -> usize {
        self.state.lock().counters.completed
    }

    /// Current number of errors
    pub fn errors(&self) -> usize {
        self.state.lock().counters.errors
    }

    /// Copy of all counters
    pub fn snapshot(&self) -> AggregateCounters {
        self.state.lock().counters
    }

    /// Latency percentiles over the outcomes resolved so far
    pub fn latency(&self) -> LatencyPercentiles {
        self.state.lock().latency.percentiles()
    }
}
