//! Single-flight deduplication of identical in-flight requests.
//!
//! A keyed map of pending computations. The first caller to claim a
//! fingerprint becomes the leader and computes; callers that find the key
//! in flight block on the leader's slot and copy its published result, so
//! N concurrent identical requests cost exactly one inference.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use crate::types::{Status, TtsResult};

struct FlightSlot {
    done: Mutex<Option<TtsResult>>,
    cv: Condvar,
}

impl FlightSlot {
    fn new() -> Self {
        Self {
            done: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn publish(&self, result: TtsResult) {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        *done = Some(result);
        self.cv.notify_all();
    }

    fn wait(&self) -> TtsResult {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(result) = done.as_ref() {
                return result.clone();
            }
            done = self.cv.wait(done).unwrap_or_else(|e| e.into_inner());
        }
    }
}

pub(crate) struct SingleFlight {
    inflight: Mutex<HashMap<u64, Arc<FlightSlot>>>,
}

/// Outcome of claiming a fingerprint.
pub(crate) enum Flight<'a> {
    /// This caller computes; completing the guard wakes any joiners.
    Leader(LeaderGuard<'a>),
    /// Another caller already computed; here is its result.
    Joined(TtsResult),
}

pub(crate) struct LeaderGuard<'a> {
    flight: &'a SingleFlight,
    key: u64,
    slot: Arc<FlightSlot>,
    completed: bool,
}

impl LeaderGuard<'_> {
    /// Publish the computed result to joiners and release the key.
    pub fn complete(mut self, result: &TtsResult) {
        self.completed = true;
        self.flight.remove(self.key);
        self.slot.publish(result.clone());
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            // A leader that unwound without publishing must not strand
            // its joiners.
            self.flight.remove(self.key);
            self.slot.publish(TtsResult::failure(
                Status::Unknown,
                "synthesis abandoned before completion",
            ));
        }
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Claim `key`. Returns a leader guard when this caller should
    /// compute, or blocks until the current leader publishes and returns
    /// the shared result.
    pub fn begin(&self, key: u64) -> Flight<'_> {
        let slot = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match inflight.get(&key) {
                Some(slot) => Some(Arc::clone(slot)),
                None => {
                    let slot = Arc::new(FlightSlot::new());
                    inflight.insert(key, Arc::clone(&slot));
                    return Flight::Leader(LeaderGuard {
                        flight: self,
                        key,
                        slot,
                        completed: false,
                    });
                }
            }
        };
        Flight::Joined(slot.expect("checked above").wait())
    }

    fn remove(&self, key: u64) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        inflight.remove(&key);
    }

    #[cfg(test)]
    pub fn inflight_count(&self) -> usize {
        let inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        inflight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn leader_computes_joiners_share() {
        let flight = Arc::new(SingleFlight::new());
        let computations = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let flight = Arc::clone(&flight);
            let computations = Arc::clone(&computations);
            // All threads arrive within the leader's compute window.
            handles.push(std::thread::spawn(move || match flight.begin(42) {
                Flight::Leader(guard) => {
                    computations.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(100));
                    let result = TtsResult::failure(Status::Ok, "");
                    guard.complete(&result);
                    result
                }
                Flight::Joined(result) => result,
            }));
        }

        let results: Vec<TtsResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(computations.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.status == Status::Ok));
        assert_eq!(flight.inflight_count(), 0);
    }

    #[test]
    fn distinct_keys_do_not_serialize() {
        let flight = SingleFlight::new();
        let first = flight.begin(1);
        let second = flight.begin(2);
        assert!(matches!(first, Flight::Leader(_)));
        assert!(matches!(second, Flight::Leader(_)));
        if let (Flight::Leader(a), Flight::Leader(b)) = (first, second) {
            a.complete(&TtsResult::failure(Status::Ok, ""));
            b.complete(&TtsResult::failure(Status::Ok, ""));
        }
        assert_eq!(flight.inflight_count(), 0);
    }

    #[test]
    fn abandoned_leader_wakes_joiners() {
        let flight = Arc::new(SingleFlight::new());

        let joiner = {
            let flight = Arc::clone(&flight);
            std::thread::spawn(move || {
                // Give the main thread time to become leader.
                std::thread::sleep(Duration::from_millis(20));
                match flight.begin(9) {
                    Flight::Joined(result) => result,
                    Flight::Leader(guard) => {
                        let result = TtsResult::failure(Status::Ok, "became leader");
                        guard.complete(&result);
                        result
                    }
                }
            })
        };

        {
            let leader = flight.begin(9);
            std::thread::sleep(Duration::from_millis(50));
            drop(leader);
        }

        let seen = joiner.join().unwrap();
        // Either the joiner saw the abandonment result, or it raced in
        // after removal and became its own leader.
        assert!(seen.status == Status::Unknown || seen.error_message == "became leader");
        assert_eq!(flight.inflight_count(), 0);
    }
}
