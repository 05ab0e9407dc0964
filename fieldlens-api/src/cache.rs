//! # Field cache
//!
//! Time-bounded cache mapping an attribute-view id to its field list, used to
//! avoid redundant metadata fetches during bursts of cell edits. Only field
//! metadata is cached; row↔block id mappings are resolved on demand.
//!
//! Entries are stamped with the fetch time (not the check time) and an entry
//! older than the TTL is never returned. Every mutating field operation must
//! invalidate its attribute view's entry synchronously before returning.

/*
 # Notes on locking design

 - Uses a non-poisoning parking_lot mutex; no lock is ever held across an
   await point, and each locked section performs exactly one lookup or one
   mutation.

 - Two racing field mutations may interleave their fetch + insert sequences;
   the last insert wins and the loser's snapshot can be stale for up to one
   round trip. The TTL already bounds staleness, so this is accepted rather
   than locked around.
*/

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::{config::KEY_CACHE_TTL_SECS, fields::Field};

struct CacheEntry {
    fields: Vec<Field>,
    fetched_at: Instant,
}

/// Cache of field lists keyed by attribute-view id.
pub struct KeyCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(KEY_CACHE_TTL_SECS))
    }
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        KeyCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached snapshot for the attribute view, if present and
    /// younger than the TTL.
    pub fn get(&self, av_id: &str) -> Option<Vec<Field>> {
        let entries = self.entries.lock();
        entries
            .get(av_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.fields.clone())
    }

    /// Replaces the snapshot for the attribute view, stamped now.
    pub fn insert(&self, av_id: &str, fields: Vec<Field>) {
        self.entries.lock().insert(
            av_id.to_string(),
            CacheEntry {
                fields,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drops one entry, or all entries when `av_id` is `None`.
    pub fn invalidate(&self, av_id: Option<&str>) {
        let mut entries = self.entries.lock();
        match av_id {
            Some(av_id) => {
                entries.remove(av_id);
            }
            None => entries.clear(),
        }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries
            .values()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;

    fn sample_field(id: &str, name: &str) -> Field {
        Field {
            id: id.to_string(),
            name: name.to_string(),
            field_type: FieldType::Text,
            icon: String::new(),
            options: None,
        }
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = KeyCache::new(Duration::from_secs(60));
        cache.insert("av-1", vec![sample_field("k1", "Notes")]);
        let fields = cache.get("av-1").expect("cached");
        assert_eq!(fields[0].name, "Notes");
    }

    #[test]
    fn test_cache_expiry() {
        let cache = KeyCache::new(Duration::from_millis(0));
        cache.insert("av-1", vec![sample_field("k1", "Notes")]);
        assert!(cache.get("av-1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_invalidate_one_and_all() {
        let cache = KeyCache::default();
        cache.insert("av-1", vec![sample_field("k1", "Notes")]);
        cache.insert("av-2", vec![sample_field("k2", "Status")]);

        cache.invalidate(Some("av-1"));
        assert!(cache.get("av-1").is_none());
        assert!(cache.get("av-2").is_some());

        cache.invalidate(None);
        assert!(cache.get("av-2").is_none());
    }

    #[test]
    fn test_insert_replaces_snapshot() {
        let cache = KeyCache::default();
        cache.insert("av-1", vec![sample_field("k1", "Notes")]);
        cache.insert("av-1", vec![sample_field("k2", "Status")]);
        let fields = cache.get("av-1").expect("cached");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].id, "k2");
    }
}
