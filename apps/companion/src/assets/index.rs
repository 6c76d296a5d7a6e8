use std::collections::{BTreeMap, HashMap};

struct IndexEntry {
    size_bytes: u64,
    tick: u64,
}

/// Byte-budgeted LRU bookkeeping for the audio cache.
///
/// `by_recency` maps a monotonically increasing access tick to its key, so the
/// least recently used entry is always the first one in the map.
pub struct CacheIndex {
    entries: HashMap<String, IndexEntry>,
    by_recency: BTreeMap<u64, String>,
    total_bytes: u64,
    max_bytes: u64,
    next_tick: u64,
}

impl CacheIndex {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            by_recency: BTreeMap::new(),
            total_bytes: 0,
            max_bytes,
            next_tick: 0,
        }
    }

    pub fn fits(&self, size_bytes: u64) -> bool {
        size_bytes <= self.max_bytes
    }

    /// Records `key` as most recently used and returns the keys evicted to
    /// bring the total back under budget. Never evicts `key` itself.
    pub fn insert(&mut self, key: &str, size_bytes: u64) -> Vec<String> {
        self.remove(key);
        let tick = self.tick();
        self.entries
            .insert(key.to_string(), IndexEntry { size_bytes, tick });
        self.by_recency.insert(tick, key.to_string());
        self.total_bytes += size_bytes;

        let mut evicted = Vec::new();
        while self.total_bytes > self.max_bytes {
            let Some((&oldest, _)) = self.by_recency.iter().next() else {
                break;
            };
            let Some(victim) = self.by_recency.remove(&oldest) else {
                break;
            };
            if victim == key {
                // Only the new entry is left; keep it.
                self.by_recency.insert(oldest, victim);
                break;
            }
            if let Some(entry) = self.entries.remove(&victim) {
                self.total_bytes -= entry.size_bytes;
            }
            evicted.push(victim);
        }
        evicted
    }

    /// Marks `key` as most recently used. Returns `false` if it is not indexed.
    pub fn touch(&mut self, key: &str) -> bool {
        let tick = self.tick();
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        self.by_recency.remove(&entry.tick);
        entry.tick = tick;
        self.by_recency.insert(tick, key.to_string());
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.by_recency.remove(&entry.tick);
                self.total_bytes -= entry.size_bytes;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let mut index = CacheIndex::new(10);
        assert!(index.insert("a", 4).is_empty());
        assert!(index.insert("b", 4).is_empty());
        assert!(index.touch("a"));

        let evicted = index.insert("c", 4);
        assert_eq!(evicted, vec!["b".to_string()]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.total_bytes(), 8);
    }

    #[test]
    fn test_reinsert_replaces_size() {
        let mut index = CacheIndex::new(100);
        index.insert("a", 40);
        index.insert("a", 10);
        assert_eq!(index.len(), 1);
        assert_eq!(index.total_bytes(), 10);
    }

    #[test]
    fn test_large_insert_evicts_several() {
        let mut index = CacheIndex::new(10);
        index.insert("a", 3);
        index.insert("b", 3);
        index.insert("c", 3);
        let evicted = index.insert("d", 8);
        assert_eq!(evicted, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(index.total_bytes(), 8);
    }

    #[test]
    fn test_touch_unknown_key() {
        let mut index = CacheIndex::new(10);
        assert!(!index.touch("missing"));
        assert!(!index.remove("missing"));
    }

    #[test]
    fn test_fits() {
        let index = CacheIndex::new(10);
        assert!(index.fits(10));
        assert!(!index.fits(11));
    }
}
