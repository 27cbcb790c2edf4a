//! Backing data structures for Map and Set.
//!
//! Keys use SameValueZero semantics via `MapKey`, with insertion-ordered
//! storage. Entry snapshots are handed out with the borrow released so the
//! structural engine can recurse without holding a lock.

use crate::value::{Value, same_value_zero};
use indexmap::{IndexMap, IndexSet};
use std::hash::{Hash, Hasher};

// Type discriminant tags for hashing
const HASH_TAG_UNDEFINED: u8 = 0;
const HASH_TAG_NULL: u8 = 1;
const HASH_TAG_BOOL: u8 = 2;
const HASH_TAG_NUMBER: u8 = 3;
const HASH_TAG_STRING: u8 = 4;
const HASH_TAG_IDENTITY: u8 = 5;

/// Normalize a float for SameValueZero hashing: -0 → +0, NaN → canonical NaN bits.
fn normalize_float_bits(n: f64) -> u64 {
    if n == 0.0 {
        0u64
    } else if n.is_nan() {
        0x7FF8_0000_0000_0000u64
    } else {
        n.to_bits()
    }
}

/// A `Value` wrapper with SameValueZero `Hash`/`Eq`, used as the key type of
/// [`MapData`] and [`SetData`].
#[derive(Debug, Clone)]
pub struct MapKey(pub Value);

impl MapKey {
    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Undefined => HASH_TAG_UNDEFINED.hash(state),
            Value::Null => HASH_TAG_NULL.hash(state),
            Value::Bool(b) => {
                HASH_TAG_BOOL.hash(state);
                b.hash(state);
            }
            Value::Number(n) => {
                HASH_TAG_NUMBER.hash(state);
                normalize_float_bits(*n).hash(state);
            }
            Value::String(s) => {
                HASH_TAG_STRING.hash(state);
                s.hash(state);
            }
            // Symbols and composites key by identity.
            other => {
                HASH_TAG_IDENTITY.hash(state);
                other.identity().unwrap_or(0).hash(state);
            }
        }
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        same_value_zero(&self.0, &other.0)
    }
}

impl Eq for MapKey {}

/// Internal storage for a map value.
#[derive(Debug, Default)]
pub struct MapData {
    entries: IndexMap<MapKey, Value>,
}

impl MapData {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `key`.
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries.get(&MapKey(key.clone())).cloned()
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &Value) -> bool {
        self.entries.contains_key(&MapKey(key.clone()))
    }

    /// Insert or update `key` → `value`. Returns `true` on update; updates
    /// preserve insertion order.
    pub fn set(&mut self, key: Value, value: Value) -> bool {
        self.entries.insert(MapKey(key), value).is_some()
    }

    /// Delete `key`, preserving the order of the rest. Returns whether it
    /// existed.
    pub fn delete(&mut self, key: &Value) -> bool {
        self.entries.shift_remove(&MapKey(key.clone())).is_some()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Snapshot all entries in insertion order. The caller recurses on the
    /// snapshot, not on the live storage.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.0.clone(), v.clone()))
            .collect()
    }
}

/// Internal storage for a set value.
#[derive(Debug, Default)]
pub struct SetData {
    members: IndexSet<MapKey>,
}

impl SetData {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `value` is a member.
    pub fn has(&self, value: &Value) -> bool {
        self.members.contains(&MapKey(value.clone()))
    }

    /// Add a member. Returns `true` if it was already present.
    pub fn add(&mut self, value: Value) -> bool {
        !self.members.insert(MapKey(value))
    }

    /// Delete a member, preserving the order of the rest.
    pub fn delete(&mut self, value: &Value) -> bool {
        self.members.shift_remove(&MapKey(value.clone()))
    }

    /// Remove all members.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Snapshot all members in insertion order.
    pub fn members(&self) -> Vec<Value> {
        self.members.iter().map(|k| k.0.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_a_usable_key() {
        let mut map = MapData::new();
        map.set(Value::number(f64::NAN), Value::string("found"));
        assert!(map.has(&Value::number(f64::NAN)));
        assert!(matches!(
            map.get(&Value::number(f64::NAN)),
            Some(Value::String(s)) if &*s == "found"
        ));
    }

    #[test]
    fn negative_zero_collapses_with_zero() {
        let mut set = SetData::new();
        set.add(Value::number(0.0));
        assert!(set.add(Value::number(-0.0)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn composite_keys_use_identity() {
        let mut map = MapData::new();
        let key = Value::empty_record();
        map.set(key.clone(), Value::number(1.0));

        assert!(map.has(&key));
        assert!(!map.has(&Value::empty_record()));
        assert!(map.delete(&key));
        assert!(map.is_empty());
    }

    #[test]
    fn updates_preserve_insertion_order() {
        let mut map = MapData::new();
        map.set(Value::string("a"), Value::number(1.0));
        map.set(Value::string("b"), Value::number(2.0));
        map.set(Value::string("a"), Value::number(3.0));

        let keys: Vec<_> = map
            .entries()
            .into_iter()
            .map(|(k, _)| k.as_str().unwrap().to_owned())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
