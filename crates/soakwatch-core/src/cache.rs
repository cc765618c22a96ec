//! Small time-to-live cache for probe results.
//!
//! Entries expire `ttl` after insertion. Expiry is checked on lookup; an
//! expired entry is removed and reported as a miss. A zero TTL disables the
//! cache entirely. Callers pass `now` so expiry is testable without sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Fresh value for `key`, evicting it if it has expired.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        let expired = match self.entries.get(key) {
            Some((stored, _)) => now.saturating_duration_since(*stored) >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(_, v)| v.clone())
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        if self.is_enabled() {
            self.entries.insert(key, (now, value));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let mut c = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        c.insert("cam", 1.5, t0);
        assert_eq!(c.get(&"cam", t0 + Duration::from_secs(9)), Some(1.5));
    }

    #[test]
    fn test_expired_entry_evicted_on_lookup() {
        let mut c = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        c.insert("cam", 1.5, t0);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(&"cam", t0 + Duration::from_secs(10)), None);
        assert!(c.is_empty());
    }

    #[test]
    fn test_zero_ttl_disables() {
        let mut c = TtlCache::new(Duration::ZERO);
        let t0 = Instant::now();
        c.insert("cam", 1.5, t0);
        assert!(c.is_empty());
        assert_eq!(c.get(&"cam", t0), None);
    }

    #[test]
    fn test_miss_for_unknown_key() {
        let mut c: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(1));
        assert_eq!(c.get(&"nope", Instant::now()), None);
    }
}
