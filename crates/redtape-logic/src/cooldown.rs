//! Cooldown tracking by absolute expiry timestamps.
//!
//! Entries store `now + duration` in milliseconds rather than a remaining
//! duration, so no per-tick decrement pass exists and pauses or clock jumps
//! need no bookkeeping. Entries are never removed; a stale entry simply
//! reads as "not on cooldown" forever after it expires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const MILLIS_PER_SECOND: u64 = 1000;

/// Identifier → expiry timestamp (ms).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownMap {
    expiries: BTreeMap<String, u64>,
}

impl CooldownMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) `id`'s cooldown. A zero duration leaves `id`
    /// immediately eligible again.
    pub fn start(mut self, id: &str, duration_secs: u64, now: u64) -> Self {
        let expiry = now.saturating_add(duration_secs.saturating_mul(MILLIS_PER_SECOND));
        self.expiries.insert(id.to_string(), expiry);
        self
    }

    pub fn expiry(&self, id: &str) -> Option<u64> {
        self.expiries.get(id).copied()
    }

    pub fn is_on_cooldown(&self, id: &str, now: u64) -> bool {
        self.expiry(id).is_some_and(|expiry| now < expiry)
    }

    /// Seconds until `id` becomes eligible, 0 when it already is.
    pub fn remaining_seconds(&self, id: &str, now: u64) -> f64 {
        match self.expiry(id) {
            Some(expiry) if now < expiry => (expiry - now) as f64 / MILLIS_PER_SECOND as f64,
            _ => 0.0,
        }
    }

    /// Fraction of a `duration_secs` cooldown already elapsed, in [0, 1].
    /// Anything not on cooldown reports 1.0.
    pub fn progress(&self, id: &str, duration_secs: u64, now: u64) -> f64 {
        if duration_secs == 0 {
            return 1.0;
        }
        let remaining = self.remaining_seconds(id, now);
        (1.0 - remaining / duration_secs as f64).clamp(0.0, 1.0)
    }

    /// Earliest expiry still in the future, if any.
    pub fn next_expiry(&self, now: u64) -> Option<u64> {
        self.expiries.values().copied().filter(|&e| e > now).min()
    }

    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }
}

/// Event and action cooldowns. The two maps are fully independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownTable {
    pub events: CooldownMap,
    pub actions: CooldownMap,
}

impl CooldownTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_event(self, id: &str, duration_secs: u64, now: u64) -> Self {
        Self {
            events: self.events.start(id, duration_secs, now),
            ..self
        }
    }

    pub fn start_action(self, id: &str, duration_secs: u64, now: u64) -> Self {
        Self {
            actions: self.actions.start(id, duration_secs, now),
            ..self
        }
    }

    pub fn event_on_cooldown(&self, id: &str, now: u64) -> bool {
        self.events.is_on_cooldown(id, now)
    }

    pub fn action_on_cooldown(&self, id: &str, now: u64) -> bool {
        self.actions.is_on_cooldown(id, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_id_never_on_cooldown() {
        let map = CooldownMap::new();
        assert!(!map.is_on_cooldown("x", 0));
        assert!(!map.is_on_cooldown("x", u64::MAX));
        assert_eq!(map.remaining_seconds("x", 0), 0.0);
    }

    #[test]
    fn test_ten_second_cooldown_window() {
        let now = 50_000;
        let map = CooldownMap::new().start("x", 10, now);
        assert!(map.is_on_cooldown("x", now));
        assert!(map.is_on_cooldown("x", now + 9_999));
        assert!(!map.is_on_cooldown("x", now + 10_000));
        assert!(!map.is_on_cooldown("x", now + 10_001));
    }

    #[test]
    fn test_zero_duration_is_immediately_eligible() {
        let map = CooldownMap::new().start("x", 0, 1_000);
        assert!(!map.is_on_cooldown("x", 1_000));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remaining_seconds() {
        let map = CooldownMap::new().start("x", 10, 0);
        assert!((map.remaining_seconds("x", 2_500) - 7.5).abs() < 1e-9);
        assert_eq!(map.remaining_seconds("x", 10_000), 0.0);
        assert_eq!(map.remaining_seconds("x", 99_000), 0.0);
    }

    #[test]
    fn test_progress() {
        let map = CooldownMap::new().start("x", 10, 0);
        assert_eq!(map.progress("x", 10, 0), 0.0);
        assert!((map.progress("x", 10, 5_000) - 0.5).abs() < 1e-9);
        assert_eq!(map.progress("x", 10, 20_000), 1.0);
        assert_eq!(map.progress("y", 10, 0), 1.0);
        assert_eq!(map.progress("x", 0, 0), 1.0);
    }

    #[test]
    fn test_restart_replaces_expiry() {
        let map = CooldownMap::new().start("x", 100, 0).start("x", 1, 0);
        assert!(!map.is_on_cooldown("x", 1_000));
    }

    #[test]
    fn test_clock_moving_backwards_keeps_cooldown() {
        let map = CooldownMap::new().start("x", 10, 100_000);
        // Clock skew: "now" earlier than when the cooldown started
        assert!(map.is_on_cooldown("x", 50_000));
    }

    #[test]
    fn test_next_expiry() {
        let map = CooldownMap::new().start("a", 5, 0).start("b", 2, 0);
        assert_eq!(map.next_expiry(0), Some(2_000));
        assert_eq!(map.next_expiry(2_000), Some(5_000));
        assert_eq!(map.next_expiry(5_000), None);
    }

    #[test]
    fn test_event_and_action_maps_are_independent() {
        let table = CooldownTable::new()
            .start_event("shared", 30, 0)
            .start_action("shared", 5, 0);
        assert!(table.event_on_cooldown("shared", 10_000));
        assert!(!table.action_on_cooldown("shared", 10_000));
    }
}
