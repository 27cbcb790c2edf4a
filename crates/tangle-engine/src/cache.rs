//! The identity cache: per-call visited bookkeeping for the clone, equality,
//! and merge engines.
//!
//! Keys are value identities (allocation addresses), never structural hashes.
//! The store starts as a small linear pair list — cheapest for the common
//! case of a handful of distinct composites — and transparently promotes
//! itself to a hash map once it crosses [`PROMOTION_THRESHOLD`] entries, so
//! lookups stay amortized O(1) when cloning graphs with thousands of nodes.
//! The interface is identical before and after promotion.

use rustc_hash::FxHashMap;
use tracing::trace;

/// Entry count at which the linear store migrates to hashed storage.
pub const PROMOTION_THRESHOLD: usize = 200;

#[derive(Debug)]
enum Store<V> {
    List(Vec<(usize, V)>),
    Map(FxHashMap<usize, V>),
}

/// An identity-keyed cache scoped to one top-level engine call.
#[derive(Debug)]
pub struct IdentityCache<V> {
    store: Store<V>,
}

impl<V> IdentityCache<V> {
    /// An empty cache in linear mode.
    pub fn new() -> Self {
        Self {
            store: Store::List(Vec::new()),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        match &self.store {
            Store::List(pairs) => pairs.len(),
            Store::Map(map) => map.len(),
        }
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the store has migrated to hashed storage.
    pub fn is_promoted(&self) -> bool {
        matches!(self.store, Store::Map(_))
    }

    /// Look up an identity.
    pub fn get(&self, id: usize) -> Option<&V> {
        match &self.store {
            // Recently inserted entries are the likeliest hits.
            Store::List(pairs) => pairs.iter().rev().find(|(k, _)| *k == id).map(|(_, v)| v),
            Store::Map(map) => map.get(&id),
        }
    }

    /// Whether an identity is present.
    pub fn has(&self, id: usize) -> bool {
        self.get(id).is_some()
    }

    /// Insert or update an entry.
    pub fn set(&mut self, id: usize, value: V) {
        match &mut self.store {
            Store::List(pairs) => {
                if let Some(slot) = pairs.iter_mut().rev().find(|(k, _)| *k == id) {
                    slot.1 = value;
                    return;
                }
                if pairs.len() < PROMOTION_THRESHOLD - 1 {
                    pairs.push((id, value));
                    return;
                }
                trace!(entries = pairs.len(), "promoting identity cache to hashed storage");
                let mut map =
                    FxHashMap::with_capacity_and_hasher(pairs.len() + 1, Default::default());
                map.extend(pairs.drain(..));
                map.insert(id, value);
                self.store = Store::Map(map);
            }
            Store::Map(map) => {
                map.insert(id, value);
            }
        }
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&mut self, id: usize) -> bool {
        match &mut self.store {
            Store::List(pairs) => match pairs.iter().rposition(|(k, _)| *k == id) {
                Some(at) if at == pairs.len() - 1 => {
                    pairs.pop();
                    true
                }
                Some(at) => {
                    pairs.remove(at);
                    true
                }
                None => false,
            },
            Store::Map(map) => map.remove(&id).is_some(),
        }
    }

    /// Drop all entries and return to linear mode.
    pub fn clear(&mut self) {
        self.store = Store::List(Vec::new());
    }

    /// Iterate entries in unspecified order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (usize, &V)> + '_> {
        match &self.store {
            Store::List(pairs) => Box::new(pairs.iter().map(|(k, v)| (*k, v))),
            Store::Map(map) => Box::new(map.iter().map(|(k, v)| (*k, v))),
        }
    }
}

impl<V> Default for IdentityCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_operations_in_linear_mode() {
        let mut cache = IdentityCache::new();
        cache.set(1, "a");
        cache.set(2, "b");
        assert_eq!(cache.get(1), Some(&"a"));
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_promoted());

        cache.set(1, "c");
        assert_eq!(cache.get(1), Some(&"c"));
        assert_eq!(cache.len(), 2, "update must not duplicate the entry");

        assert!(cache.delete(1));
        assert!(!cache.delete(1));
        assert!(!cache.has(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn promotion_is_invisible_to_lookups() {
        let mut cache = IdentityCache::new();
        for id in 0..PROMOTION_THRESHOLD + 50 {
            cache.set(id, id * 10);
        }
        assert!(cache.is_promoted());
        assert_eq!(cache.len(), PROMOTION_THRESHOLD + 50);
        for id in 0..PROMOTION_THRESHOLD + 50 {
            assert_eq!(cache.get(id), Some(&(id * 10)), "entry {id} lost in promotion");
        }
    }

    #[test]
    fn promotion_happens_at_the_threshold() {
        let mut cache = IdentityCache::new();
        for id in 0..PROMOTION_THRESHOLD - 1 {
            cache.set(id, ());
        }
        assert!(!cache.is_promoted());
        cache.set(PROMOTION_THRESHOLD - 1, ());
        assert!(cache.is_promoted());
    }

    #[test]
    fn delete_and_update_after_promotion() {
        let mut cache = IdentityCache::new();
        for id in 0..PROMOTION_THRESHOLD + 10 {
            cache.set(id, 0u32);
        }
        cache.set(5, 99);
        assert_eq!(cache.get(5), Some(&99));
        assert!(cache.delete(5));
        assert!(!cache.has(5));
        assert_eq!(cache.len(), PROMOTION_THRESHOLD + 9);
    }

    #[test]
    fn clear_returns_to_linear_mode() {
        let mut cache = IdentityCache::new();
        for id in 0..PROMOTION_THRESHOLD + 1 {
            cache.set(id, ());
        }
        assert!(cache.is_promoted());
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_promoted());
    }
}
