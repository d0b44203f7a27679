//! In-flight task set
//!
//! Tracks task IDs claimed by a worker and not yet reported. The task server
//! may deliver the same event twice, or let two acquire calls for one task
//! through, so a worker must win the claim here before it acquires.

use dashmap::DashSet;
use std::sync::Arc;

/// Concurrent set of task IDs currently being handled
///
/// Claims are per-key atomic; workers claiming different tasks never wait on
/// each other.
#[derive(Debug, Default)]
pub struct InFlight {
    tasks: DashSet<String>,
}

impl InFlight {
    /// Creates an empty set
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claims a task ID
    ///
    /// Returns `None` if the ID is already claimed. Otherwise the ID stays
    /// claimed until the returned guard is dropped.
    pub fn try_claim(self: &Arc<Self>, task_id: &str) -> Option<InFlightGuard> {
        if !self.tasks.insert(task_id.to_string()) {
            return None;
        }

        Some(InFlightGuard {
            set: Arc::clone(self),
            task_id: task_id.to_string(),
        })
    }

    /// Checks whether a task ID is currently claimed
    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains(task_id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Releases its task ID when dropped, on every exit path
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<InFlight>,
    task_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.tasks.remove(&self.task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_claim_is_exclusive() {
        let set = InFlight::new();

        let _guard = set.try_claim("t-1").unwrap();
        assert!(set.try_claim("t-1").is_none());
        assert!(set.contains("t-1"));

        let other = set.try_claim("t-2");
        assert!(other.is_some());
        assert!(set.contains("t-2"));
    }

    #[test]
    fn test_release_allows_reclaim() {
        let set = InFlight::new();

        drop(set.try_claim("t-1").unwrap());
        assert!(set.is_empty());
        assert!(set.try_claim("t-1").is_some());
    }

    #[test]
    fn test_release_on_panic() {
        let set = InFlight::new();
        let shared = Arc::clone(&set);

        let outcome = std::thread::spawn(move || {
            let _guard = shared.try_claim("t-1").unwrap();
            panic!("handler blew up");
        })
        .join();

        assert!(outcome.is_err());
        assert!(!set.contains("t-1"));
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let set = InFlight::new();
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));
        let winners = Arc::new(AtomicUsize::new(0));
        let attempts = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let set = Arc::clone(&set);
                let barrier = Arc::clone(&barrier);
                let winners = Arc::clone(&winners);
                let attempts = Arc::clone(&attempts);
                std::thread::spawn(move || {
                    barrier.wait();
                    let claim = set.try_claim("t-1");
                    attempts.fetch_add(1, Ordering::SeqCst);
                    if let Some(guard) = claim {
                        winners.fetch_add(1, Ordering::SeqCst);
                        // Hold until every thread has attempted.
                        while attempts.load(Ordering::SeqCst) < threads {
                            std::thread::yield_now();
                        }
                        drop(guard);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }
}
