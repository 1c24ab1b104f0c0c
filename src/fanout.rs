//! Bounded concurrent lookups under a wall-clock budget.
//!
//! Commands such as `inbox` and `task search --comments` issue one request
//! per task. [`run_bounded`] runs those on a small worker pool so the rate
//! limit is not exhausted in a burst, and [`Deadline`] lets a long scan give
//! up while keeping whatever it already found.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Wall-clock budget for network searches.
pub const SEARCH_BUDGET: Duration = Duration::from_secs(90);

/// Requests allowed in flight at once during a fan-out.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// A point in time after which outbound requests should not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Results of a fan-out, one slot per input item in input order.
///
/// A `None` slot means the item was never started because the deadline
/// expired first.
#[derive(Debug)]
pub struct FanOut<R> {
    pub results: Vec<Option<R>>,
    pub timed_out: bool,
}

impl<R> FanOut<R> {
    /// Finished results in input order, skipping items that never ran.
    pub fn completed(self) -> impl Iterator<Item = R> {
        self.results.into_iter().flatten()
    }
}

/// Run `f` over `items` with at most `limit` calls in flight.
///
/// Workers stop picking up new items once `deadline` expires; calls already
/// running are left to finish (their requests carry the same deadline).
/// `timed_out` is set whenever the deadline has passed by the time all
/// workers are joined.
pub fn run_bounded<T, R, F>(items: &[T], limit: usize, deadline: Option<Deadline>, f: F) -> FanOut<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = limit.max(1).min(items.len());
    let next = AtomicUsize::new(0);
    let timed_out = AtomicBool::new(false);

    let mut results: Vec<Option<R>> = Vec::with_capacity(items.len());
    results.resize_with(items.len(), || None);

    let finished: Vec<Vec<(usize, R)>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        if deadline.is_some_and(|d| d.is_expired()) {
                            if next.load(Ordering::SeqCst) < items.len() {
                                timed_out.store(true, Ordering::SeqCst);
                            }
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(item) = items.get(index) else {
                            break;
                        };
                        done.push((index, f(item)));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(done) => done,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    for (index, result) in finished.into_iter().flatten() {
        results[index] = Some(result);
    }

    // Calls that were already running when the deadline passed may have
    // been cut short by it, even when every item got started.
    let timed_out =
        timed_out.load(Ordering::SeqCst) || deadline.is_some_and(|d| d.is_expired());
    if timed_out {
        tracing::debug!(
            total = items.len(),
            finished = results.iter().filter(|r| r.is_some()).count(),
            "fan-out stopped at deadline"
        );
    }

    FanOut { results, timed_out }
}
