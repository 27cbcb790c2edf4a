//! Plain records: insertion-ordered key/value containers with an optional
//! prototype link.
//!
//! The prototype link is what gives "inherited enumerable keys" a meaning in
//! this model: `keys_in`/`get_in` walk the chain with own keys shadowing, and
//! defaults-style merging can pull gap-fillers out of a shared prototype
//! record. `safe_get_in` is the guarded accessor used by the merge engine.

use crate::shared::Shared;
use crate::symbol::SymbolValue;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A record field key: a string or a symbol.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// String key.
    Str(Arc<str>),
    /// Symbol key, compared by symbol identity.
    Symbol(SymbolValue),
}

impl RecordKey {
    /// The string form of a string key.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RecordKey::Str(s) => Some(s),
            RecordKey::Symbol(_) => None,
        }
    }

    /// Whether this is a symbol key.
    pub fn is_symbol(&self) -> bool {
        matches!(self, RecordKey::Symbol(_))
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        RecordKey::Str(Arc::from(s))
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        RecordKey::Str(Arc::from(s.as_str()))
    }
}

impl From<SymbolValue> for RecordKey {
    fn from(sym: SymbolValue) -> Self {
        RecordKey::Symbol(sym)
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Str(s) => write!(f, "{s:?}"),
            RecordKey::Symbol(sym) => write!(f, "{sym:?}"),
        }
    }
}

/// Backing data of a record value.
#[derive(Default)]
pub struct RecordData {
    fields: IndexMap<RecordKey, Value>,
    proto: Option<Shared<RecordData>>,
}

impl RecordData {
    /// An empty record with no prototype.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty record inheriting from `proto`.
    pub fn with_proto(proto: Option<Shared<RecordData>>) -> Self {
        Self {
            fields: IndexMap::new(),
            proto,
        }
    }

    /// Number of own fields (symbol keys included).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no own fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The prototype link.
    pub fn proto(&self) -> Option<Shared<RecordData>> {
        self.proto.clone()
    }

    /// Replace the prototype link.
    pub fn set_proto(&mut self, proto: Option<Shared<RecordData>>) {
        self.proto = proto;
    }

    /// Own-field lookup.
    pub fn get(&self, key: &RecordKey) -> Option<Value> {
        self.fields.get(key).cloned()
    }

    /// Lookup through the prototype chain, own fields shadowing inherited.
    pub fn get_in(&self, key: &RecordKey) -> Option<Value> {
        if let Some(v) = self.fields.get(key) {
            return Some(v.clone());
        }
        let mut seen = Vec::new();
        let mut cursor = self.proto.clone();
        while let Some(proto) = cursor {
            if seen.contains(&proto.identity()) {
                break;
            }
            seen.push(proto.identity());
            let guard = proto.read();
            if let Some(v) = guard.fields.get(key) {
                return Some(v.clone());
            }
            cursor = guard.proto.clone();
        }
        None
    }

    /// Guarded chain lookup: refuses `__proto__` always, and `constructor`
    /// when the stored value is callable.
    pub fn safe_get_in(&self, key: &RecordKey) -> Option<Value> {
        if let Some(name) = key.as_str() {
            if name == "__proto__" {
                return None;
            }
            if name == "constructor"
                && matches!(self.get_in(key), Some(Value::Function(_)))
            {
                return None;
            }
        }
        self.get_in(key)
    }

    /// Whether the record owns `key`.
    pub fn contains_key(&self, key: &RecordKey) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert or update an own field, returning the previous value.
    pub fn insert(&mut self, key: RecordKey, value: Value) -> Option<Value> {
        self.fields.insert(key, value)
    }

    /// Remove an own field, preserving the order of the rest.
    pub fn remove(&mut self, key: &RecordKey) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Own keys in insertion order.
    pub fn own_keys(&self) -> Vec<RecordKey> {
        self.fields.keys().cloned().collect()
    }

    /// Own entries in insertion order.
    pub fn own_entries(&self) -> Vec<(RecordKey, Value)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Own keys followed by unshadowed prototype-chain keys.
    pub fn keys_in(&self) -> Vec<RecordKey> {
        let mut keys = self.own_keys();
        let mut seen = Vec::new();
        let mut cursor = self.proto.clone();
        while let Some(proto) = cursor {
            if seen.contains(&proto.identity()) {
                break;
            }
            seen.push(proto.identity());
            let guard = proto.read();
            for key in guard.fields.keys() {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
            cursor = guard.proto.clone();
        }
        keys
    }

    /// Entries for `keys_in`, resolved through the chain.
    pub fn entries_in(&self) -> Vec<(RecordKey, Value)> {
        self.keys_in()
            .into_iter()
            .filter_map(|key| self.get_in(&key).map(|v| (key, v)))
            .collect()
    }
}

impl fmt::Debug for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordData(len={})", self.fields.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> RecordKey {
        RecordKey::from(s)
    }

    #[test]
    fn own_fields_shadow_the_prototype() {
        let mut proto = RecordData::new();
        proto.insert(key("color"), Value::string("red"));
        proto.insert(key("size"), Value::number(10.0));
        let proto = Shared::new(proto);

        let mut rec = RecordData::with_proto(Some(proto));
        rec.insert(key("color"), Value::string("blue"));

        assert_eq!(rec.get(&key("size")), None);
        assert!(matches!(rec.get_in(&key("size")), Some(Value::Number(n)) if n == 10.0));
        assert!(matches!(rec.get_in(&key("color")), Some(Value::String(s)) if &*s == "blue"));

        let keys: Vec<_> = rec
            .keys_in()
            .iter()
            .filter_map(|k| k.as_str().map(str::to_owned))
            .collect();
        assert_eq!(keys, vec!["color", "size"]);
    }

    #[test]
    fn safe_get_refuses_polluting_keys() {
        let mut rec = RecordData::new();
        rec.insert(key("__proto__"), Value::number(1.0));
        rec.insert(
            key("constructor"),
            Value::function(Some("ctor"), |_| Value::undefined()),
        );
        rec.insert(key("ok"), Value::number(2.0));

        assert!(rec.safe_get_in(&key("__proto__")).is_none());
        assert!(rec.safe_get_in(&key("constructor")).is_none());
        assert!(rec.safe_get_in(&key("ok")).is_some());
    }

    #[test]
    fn constructor_key_is_safe_when_not_callable() {
        let mut rec = RecordData::new();
        rec.insert(key("constructor"), Value::string("just data"));
        assert!(rec.safe_get_in(&key("constructor")).is_some());
    }

    #[test]
    fn cyclic_prototype_chains_terminate() {
        let a = Shared::new(RecordData::new());
        let b = Shared::new(RecordData::with_proto(Some(a.clone())));
        a.write().set_proto(Some(b.clone()));

        assert!(b.read().get_in(&key("missing")).is_none());
        assert!(b.read().keys_in().is_empty());
    }

    #[test]
    fn remove_preserves_insertion_order() {
        let mut rec = RecordData::new();
        rec.insert(key("a"), Value::number(1.0));
        rec.insert(key("b"), Value::number(2.0));
        rec.insert(key("c"), Value::number(3.0));
        rec.remove(&key("b"));

        let keys: Vec<_> = rec
            .own_keys()
            .iter()
            .filter_map(|k| k.as_str().map(str::to_owned))
            .collect();
        assert_eq!(keys, vec!["a", "c"]);
    }
}
