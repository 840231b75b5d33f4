// src/model/pacer.rs

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Process-wide pacing state.
///
/// Written only by the budget pacer's periodic tick, read by every
/// concurrent bidding decision. The throttle is an f64 stored as raw
/// bits in an `AtomicU64`: readers never block and a load observes
/// either the pre-tick or the post-tick value, never a mix. There is
/// no read-modify-write anywhere, only single-value swaps.
pub struct PacerState {
    account: String,
    target_budget: f64,
    throttle_bits: AtomicU64,
    last_reported_ms: AtomicI64,
}

impl PacerState {
    /// Starts fully open (throttle 1.0) until the banker says
    /// otherwise.
    pub fn new(account: &str, target_budget: f64) -> Self {
        Self {
            account: account.to_string(),
            target_budget,
            throttle_bits: AtomicU64::new(1.0f64.to_bits()),
            last_reported_ms: AtomicI64::new(0),
        }
    }

    /// Budget account key, e.g. "hello:world".
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Intended spend (USD/1M) reported to the banker each period.
    pub fn target_budget(&self) -> f64 {
        self.target_budget
    }

    /// Current spend throttle in [0, 1].
    pub fn throttle(&self) -> f64 {
        f64::from_bits(self.throttle_bits.load(Ordering::Acquire))
    }

    /// Swaps in a new throttle. Values are clamped to [0, 1];
    /// non-finite input collapses to 0 so a confused banker can only
    /// stop spend, never amplify it.
    pub fn set_throttle(&self, value: f64) {
        let value = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.throttle_bits.store(value.to_bits(), Ordering::Release);
    }

    /// Records the wall-clock time of a successful banker report.
    pub fn mark_reported(&self, at: DateTime<Utc>) {
        self.last_reported_ms
            .store(at.timestamp_millis(), Ordering::Release);
    }

    /// Time of the last successful banker report, `None` before the
    /// first one.
    pub fn last_reported_at(&self) -> Option<DateTime<Utc>> {
        match self.last_reported_ms.load(Ordering::Acquire) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn starts_open_and_unreported() {
        let state = PacerState::new("hello:world", 500_000.0);
        assert_eq!(state.throttle(), 1.0);
        assert!(state.last_reported_at().is_none());
    }

    #[test]
    fn clamps_and_sanitizes_throttle_values() {
        let state = PacerState::new("hello:world", 500_000.0);
        state.set_throttle(1.7);
        assert_eq!(state.throttle(), 1.0);
        state.set_throttle(-0.3);
        assert_eq!(state.throttle(), 0.0);
        state.set_throttle(f64::NAN);
        assert_eq!(state.throttle(), 0.0);
        state.set_throttle(0.42);
        assert_eq!(state.throttle(), 0.42);
    }

    #[test]
    fn mark_reported_round_trips() {
        let state = PacerState::new("hello:world", 500_000.0);
        let now = Utc::now();
        state.mark_reported(now);
        assert_eq!(
            state.last_reported_at().unwrap().timestamp_millis(),
            now.timestamp_millis()
        );
    }

    /// Concurrent readers during writer swaps must only ever observe
    /// one of the two swapped values, never a torn bit pattern.
    #[test]
    fn concurrent_readers_never_observe_torn_values() {
        let state = Arc::new(PacerState::new("hello:world", 500_000.0));
        let stop = Arc::new(AtomicBool::new(false));
        state.set_throttle(0.25);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let seen = state.throttle();
                        assert!(
                            seen == 0.25 || seen == 0.75,
                            "torn throttle value: {}",
                            seen
                        );
                    }
                })
            })
            .collect();

        for i in 0..10_000 {
            state.set_throttle(if i % 2 == 0 { 0.75 } else { 0.25 });
        }
        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
