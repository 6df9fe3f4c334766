//! Per-source single-flight guard
//!
//! "At most one concurrent ingestion per source" is an explicit guard, not
//! an incidental property of call order. The guard also carries the run's
//! cancellation token; cancelling leaves the catalog at the last fully
//! committed batch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Default)]
pub struct FlightTracker {
    inner: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl FlightTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Begin a run for this source; `None` if one is already in flight
    pub fn try_begin(self: &Arc<Self>, source_id: Uuid) -> Option<FlightGuard> {
        let mut inner = self.inner.lock().unwrap();
        if inner.contains_key(&source_id) {
            return None;
        }
        let token = CancellationToken::new();
        inner.insert(source_id, token.clone());
        Some(FlightGuard {
            tracker: self.clone(),
            source_id,
            token,
        })
    }

    /// Cancel the in-flight run for a source, if any
    pub fn cancel(&self, source_id: Uuid) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.get(&source_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn finish(&self, source_id: Uuid) {
        self.inner.lock().unwrap().remove(&source_id);
    }
}

/// Releases the source's flight slot on drop
pub struct FlightGuard {
    tracker: Arc<FlightTracker>,
    source_id: Uuid,
    token: CancellationToken,
}

impl FlightGuard {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.tracker.finish(self.source_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_for_same_source_is_rejected() {
        let tracker = FlightTracker::new();
        let id = Uuid::new_v4();
        let guard = tracker.try_begin(id);
        assert!(guard.is_some());
        assert!(tracker.try_begin(id).is_none());

        drop(guard);
        assert!(tracker.try_begin(id).is_some());
    }

    #[test]
    fn cancel_reaches_the_guard_token() {
        let tracker = FlightTracker::new();
        let id = Uuid::new_v4();
        let guard = tracker.try_begin(id).unwrap();
        assert!(!guard.token().is_cancelled());
        assert!(tracker.cancel(id));
        assert!(guard.token().is_cancelled());
    }

    #[test]
    fn cancel_without_flight_reports_false() {
        let tracker = FlightTracker::new();
        assert!(!tracker.cancel(Uuid::new_v4()));
    }
}
