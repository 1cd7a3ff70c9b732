use std::collections::HashMap;

use parking_lot::RwLock;

/// Size-bounded map that stops accepting new keys once full.
///
/// There is no eviction: at the bound, new entries are dropped and
/// existing ones stay until [`BoundedCache::clear`].
pub struct BoundedCache {
    entries: RwLock<HashMap<String, String>>,
    capacity: usize,
}

impl BoundedCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Insert unless the cache is full. Overwriting an existing key is
    /// always allowed. Returns whether the value was stored.
    pub fn insert_if_room(&self, key: &str, value: &str) -> bool {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(key) {
            return false;
        }
        entries.insert(key.to_owned(), value.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cache_drops_new_keys_without_evicting() {
        let cache = BoundedCache::new(2);
        assert!(cache.insert_if_room("1.1.1.1", "a"));
        assert!(cache.insert_if_room("2.2.2.2", "b"));
        assert!(!cache.insert_if_room("3.3.3.3", "c"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("1.1.1.1").as_deref(), Some("a"));
        assert_eq!(cache.get("3.3.3.3"), None);
    }

    #[test]
    fn existing_key_can_be_refreshed_when_full() {
        let cache = BoundedCache::new(1);
        cache.insert_if_room("1.1.1.1", "a");
        assert!(cache.insert_if_room("1.1.1.1", "b"));
        assert_eq!(cache.get("1.1.1.1").as_deref(), Some("b"));
    }

    #[test]
    fn clear_makes_room_again() {
        let cache = BoundedCache::new(1);
        cache.insert_if_room("1.1.1.1", "a");
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.insert_if_room("2.2.2.2", "b"));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let cache = BoundedCache::new(0);
        assert!(!cache.insert_if_room("1.1.1.1", "a"));
        assert_eq!(cache.capacity(), 0);
    }
}
