//! In-memory cache of extracted guides.
//!
//! Entries are keyed by guide URL and expire after a fixed TTL. The cache
//! holds at most `capacity` guides; inserting into a full cache evicts the
//! entry that would expire soonest.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use calbot_core::Event;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

/// Events extracted from one guide.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub events: Vec<Event>,
    /// When the guide was extracted.
    pub stored_at: DateTime<Utc>,
    /// Monotonic expiry.
    expires_at: Instant,
}

impl CacheEntry {
    pub fn new(events: Vec<Event>, ttl: Duration) -> Self {
        Self {
            events,
            stored_at: Utc::now(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

#[derive(Debug)]
pub struct GuideCache {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<String, CacheEntry>,
}

impl GuideCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Gets an entry, only if not expired.
    pub fn get_valid(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    /// Inserts or replaces the events for `key`.
    pub fn insert(&mut self, key: impl Into<String>, events: Vec<Event>) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        self.evict_expired();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_soonest();
        }

        let count = events.len();
        self.entries
            .insert(key.clone(), CacheEntry::new(events, self.ttl));
        debug!(key = %key, events = count, "Cached guide");
    }

    /// Removes all expired entries.
    pub fn evict_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let keep = !entry.is_expired();
            if !keep {
                trace!(key = %key, "Evicting expired cache entry");
            }
            keep
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired cache entries");
        }
        evicted
    }

    fn evict_soonest(&mut self) {
        let soonest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = soonest {
            self.entries.remove(&key);
            debug!(key = %key, capacity = self.capacity, "Evicted cache entry at capacity");
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
    use std::thread;

    use calbot_core::DateRange;
    use chrono::NaiveDate;

    use super::*;

    fn make_event(title: &str) -> Event {
        Event {
            dates: DateRange::single(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()),
            times: Vec::new(),
            title: title.to_string(),
            description: String::new(),
            link: None,
            location: None,
        }
    }

    #[test]
    fn entry_expiration() {
        let entry = CacheEntry::new(vec![make_event("Show")], Duration::from_millis(50));
        assert!(!entry.is_expired());
        assert!(entry.time_until_expiry() <= Duration::from_millis(50));
        thread::sleep(Duration::from_millis(60));
        assert!(entry.is_expired());
        assert_eq!(entry.time_until_expiry(), Duration::ZERO);
    }

    #[test]
    fn insert_and_get() {
        let mut cache = GuideCache::new(Duration::from_secs(60), 10);
        cache.insert("guide-a", vec![make_event("One"), make_event("Two")]);

        let entry = cache.get_valid("guide-a").unwrap();
        assert_eq!(entry.events.len(), 2);
        assert!(cache.get_valid("guide-b").is_none());
    }

    #[test]
    fn expired_entries_are_not_served() {
        let mut cache = GuideCache::new(Duration::from_millis(50), 10);
        cache.insert("guide-a", vec![make_event("One")]);
        assert!(cache.get_valid("guide-a").is_some());

        thread::sleep(Duration::from_millis(60));
        assert!(cache.get_valid("guide-a").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.evict_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_evicts_soonest_expiry() {
        let mut cache = GuideCache::new(Duration::from_secs(60), 2);
        cache.insert("guide-a", vec![make_event("A")]);
        thread::sleep(Duration::from_millis(5));
        cache.insert("guide-b", vec![make_event("B")]);
        cache.insert("guide-c", vec![make_event("C")]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_valid("guide-a").is_none());
        assert!(cache.get_valid("guide-b").is_some());
        assert!(cache.get_valid("guide-c").is_some());
    }

    #[test]
    fn replacing_an_entry_does_not_evict() {
        let mut cache = GuideCache::new(Duration::from_secs(60), 2);
        cache.insert("guide-a", vec![make_event("A")]);
        cache.insert("guide-b", vec![make_event("B")]);
        cache.insert("guide-a", vec![make_event("A2"), make_event("A3")]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_valid("guide-a").unwrap().events.len(), 2);
        assert!(cache.get_valid("guide-b").is_some());
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = GuideCache::new(Duration::from_secs(60), 0);
        cache.insert("guide-a", vec![make_event("A")]);
        assert!(cache.is_empty());
    }
}
