use std::collections::HashMap;
use std::collections::VecDeque;

use revctl_hash::Hash;

use crate::kind::Kind;

type CacheKey = (Kind, Hash);

/// A bounded read-through cache of recently reconstructed blobs. Plain LRU
/// by insertion/touch order; eviction is O(1) amortised since a stale queue
/// entry is simply skipped if it no longer matches the map.
pub struct ReadThroughCache {
    capacity: usize,
    entries: HashMap<CacheKey, Vec<u8>>,
    order: VecDeque<CacheKey>,
}

impl ReadThroughCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, kind: Kind, id: Hash) -> Option<Vec<u8>> {
        let key = (kind, id);
        let hit = self.entries.get(&key).cloned();
        if hit.is_some() {
            self.order.push_back(key);
        }
        hit
    }

    pub fn insert(&mut self, kind: Kind, id: Hash, bytes: Vec<u8>) {
        if self.capacity == 0 {
            return;
        }
        let key = (kind, id);
        if self.entries.insert(key, bytes).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            // The front of the queue may be a stale touch for a key that was
            // re-inserted later; only evict if it is still the true oldest.
            if self.order.contains(&oldest) {
                continue;
            }
            self.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used_entry() {
        let mut cache = ReadThroughCache::new(2);
        let a = Hash::of(b"a");
        let b = Hash::of(b"b");
        let c = Hash::of(b"c");
        cache.insert(Kind::File, a, b"a".to_vec());
        cache.insert(Kind::File, b, b"b".to_vec());
        assert!(cache.get(Kind::File, a).is_some());
        cache.insert(Kind::File, c, b"c".to_vec());
        assert!(cache.get(Kind::File, b).is_none());
        assert!(cache.get(Kind::File, a).is_some());
        assert!(cache.get(Kind::File, c).is_some());
    }

    #[test]
    fn zero_capacity_caches_nothing() {
        let mut cache = ReadThroughCache::new(0);
        cache.insert(Kind::File, Hash::of(b"a"), b"a".to_vec());
        assert!(cache.get(Kind::File, Hash::of(b"a")).is_none());
    }
}
