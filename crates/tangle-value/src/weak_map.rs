//! Identity-keyed side tables.
//!
//! WeakMap exists in the value model for classification and pass-through
//! fidelity: the structural engine never clones it and never compares it
//! structurally. Unlike its namesake in garbage-collected hosts, entries here
//! are held strongly; there is no collector to observe key liveness.

use crate::value::Value;
use rustc_hash::FxHashMap;

/// Backing data of a weak-map value, keyed by value identity.
#[derive(Debug, Default)]
pub struct WeakMapData {
    entries: FxHashMap<usize, Value>,
}

impl WeakMapData {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up by key identity. Scalars have no identity and are never found.
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries.get(&key.identity()?).cloned()
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &Value) -> bool {
        key.identity()
            .is_some_and(|id| self.entries.contains_key(&id))
    }

    /// Insert or update. Returns `false` when the key is a scalar and cannot
    /// be stored.
    pub fn set(&mut self, key: &Value, value: Value) -> bool {
        match key.identity() {
            Some(id) => {
                self.entries.insert(id, value);
                true
            }
            None => false,
        }
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&mut self, key: &Value) -> bool {
        key.identity()
            .is_some_and(|id| self.entries.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_identities_not_structures() {
        let mut table = WeakMapData::new();
        let a = Value::empty_record();
        let b = Value::empty_record();

        assert!(table.set(&a, Value::number(1.0)));
        assert!(table.has(&a));
        assert!(!table.has(&b));
        assert!(table.delete(&a));
        assert!(table.is_empty());
    }

    #[test]
    fn scalar_keys_are_rejected() {
        let mut table = WeakMapData::new();
        assert!(!table.set(&Value::number(1.0), Value::null()));
        assert!(!table.has(&Value::number(1.0)));
    }
}
