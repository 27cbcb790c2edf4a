//! The deep clone engine.
//!
//! Shells are allocated empty and registered in the identity cache *before*
//! their children are cloned; that pre-registration is what terminates
//! cycles and preserves aliasing (two references to one source map to one
//! clone). Function, Error, WeakMap, and Other kinds are not cloned: nested
//! occurrences pass the original reference through, and a root occurrence
//! clones to an empty record.

use crate::cache::IdentityCache;
use crate::error::{DEFAULT_DEPTH_LIMIT, EngineError, EngineResult};
use crate::path::PathKey;
use tangle_value::{MapData, RecordData, SetData, Shared, Value};

/// Caller-level clone policy flags.
#[derive(Debug, Clone, Copy)]
pub struct CloneOptions {
    /// Recurse into children; `false` copies one level with children shared.
    pub deep: bool,
    /// Copy inherited (prototype-chain) record fields too, not only own ones.
    pub full: bool,
    /// Produce plain records: drop the prototype link instead of sharing it.
    pub flat: bool,
}

impl CloneOptions {
    /// Deep clone with own keys and shared prototype links.
    pub fn deep() -> Self {
        Self {
            deep: true,
            full: false,
            flat: false,
        }
    }

    /// One-level clone, children shared by reference.
    pub fn shallow() -> Self {
        Self {
            deep: false,
            full: false,
            flat: false,
        }
    }
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self::deep()
    }
}

/// A caller hook consulted before the per-kind default at every node.
/// Returning `Some` uses that value and stops recursing into the node.
pub type CloneCustomizer = dyn Fn(&Value, Option<&PathKey>) -> Option<Value>;

/// Performs one top-level clone call; owns the per-call identity cache.
pub struct Cloner<'c> {
    memory: IdentityCache<Value>,
    options: CloneOptions,
    customizer: Option<&'c CloneCustomizer>,
    depth_limit: usize,
}

impl<'c> Cloner<'c> {
    /// A cloner with the given options and no customizer.
    pub fn new(options: CloneOptions) -> Self {
        Self {
            memory: IdentityCache::new(),
            options,
            customizer: None,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    /// Attach a customizer.
    pub fn with_customizer(mut self, customizer: &'c CloneCustomizer) -> Self {
        self.customizer = Some(customizer);
        self
    }

    /// Override the recursion depth budget.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    /// Clone `value`.
    pub fn clone_value(&mut self, value: &Value) -> EngineResult<Value> {
        self.walk(value, None, false, 0)
    }

    /// The source-identity → clone map accumulated by this call. Aliased
    /// sources appear once; external layers use this to fix up
    /// cross-references after bulk cloning.
    pub fn identity_map(&self) -> &IdentityCache<Value> {
        &self.memory
    }

    /// Consume the cloner, keeping the identity map.
    pub fn into_identity_map(self) -> IdentityCache<Value> {
        self.memory
    }

    fn remember(&mut self, id: usize, clone: Value) -> Value {
        self.memory.set(id, clone.clone());
        clone
    }

    fn walk(
        &mut self,
        value: &Value,
        key: Option<&PathKey>,
        nested: bool,
        depth: usize,
    ) -> EngineResult<Value> {
        if depth > self.depth_limit {
            return Err(EngineError::DepthLimitExceeded {
                limit: self.depth_limit,
            });
        }
        if let Some(customizer) = self.customizer
            && let Some(result) = customizer(value, key)
        {
            return Ok(result);
        }

        match value {
            // Immutable scalars have no identity concerns.
            Value::Undefined
            | Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_)
            | Value::Symbol(_) => Ok(value.clone()),

            // Opaque kinds: the reference leaks into the clone on purpose
            // when nested; a bare root clones to an empty record.
            Value::Function(_) | Value::Error(_) | Value::WeakMap(_) | Value::Other(_) => {
                Ok(if nested {
                    value.clone()
                } else {
                    Value::empty_record()
                })
            }

            Value::Array(arr) => {
                let id = arr.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let snapshot = arr.read().clone();
                let shell = Shared::new(Vec::with_capacity(snapshot.len()));
                let result = self.remember(id, Value::Array(shell.clone()));
                if !self.options.deep {
                    *shell.write() = snapshot;
                    return Ok(result);
                }
                for (i, child) in snapshot.iter().enumerate() {
                    let at = PathKey::Index(i);
                    let cloned = self.walk(child, Some(&at), true, depth + 1)?;
                    shell.write().push(cloned);
                }
                Ok(result)
            }

            Value::Record(rec) => {
                let id = rec.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let (entries, proto) = {
                    let guard = rec.read();
                    let entries = if self.options.full {
                        guard.entries_in()
                    } else {
                        guard.own_entries()
                    };
                    (entries, guard.proto())
                };
                let proto = if self.options.flat { None } else { proto };
                let shell = Shared::new(RecordData::with_proto(proto));
                let result = self.remember(id, Value::Record(shell.clone()));
                for (field, child) in entries {
                    let cloned = if self.options.deep {
                        let at = field.as_str().map(PathKey::key);
                        self.walk(&child, at.as_ref(), true, depth + 1)?
                    } else {
                        child
                    };
                    shell.write().insert(field, cloned);
                }
                Ok(result)
            }

            Value::Map(map) => {
                let id = map.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let snapshot = map.read().entries();
                let shell = Shared::new(MapData::new());
                let result = self.remember(id, Value::Map(shell.clone()));
                for (k, v) in snapshot {
                    let (ck, cv) = if self.options.deep {
                        (
                            self.walk(&k, None, true, depth + 1)?,
                            self.walk(&v, None, true, depth + 1)?,
                        )
                    } else {
                        (k, v)
                    };
                    shell.write().set(ck, cv);
                }
                Ok(result)
            }

            Value::Set(set) => {
                let id = set.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let snapshot = set.read().members();
                let shell = Shared::new(SetData::new());
                let result = self.remember(id, Value::Set(shell.clone()));
                for member in snapshot {
                    let cloned = if self.options.deep {
                        self.walk(&member, None, true, depth + 1)?
                    } else {
                        member
                    };
                    shell.write().add(cloned);
                }
                Ok(result)
            }

            // Value-like leaf composites are constructed directly.
            Value::Date(date) => {
                let id = date.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let copy = Value::Date(Shared::new(date.read().clone()));
                Ok(self.remember(id, copy))
            }

            Value::RegExp(regex) => {
                let id = value.identity().unwrap_or(0);
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let copy = Value::RegExp(std::sync::Arc::new(regex.duplicate()));
                Ok(self.remember(id, copy))
            }

            Value::Boxed(boxed) => {
                let id = value.identity().unwrap_or(0);
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let copy = Value::Boxed(std::sync::Arc::new((**boxed).clone()));
                Ok(self.remember(id, copy))
            }

            // Binary kinds duplicate byte-wise; no recursion.
            Value::ArrayBuffer(buffer) => {
                let id = buffer.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let copy = Value::ArrayBuffer(Shared::new(buffer.read().duplicate()));
                Ok(self.remember(id, copy))
            }

            Value::TypedBuffer(view) => {
                let id = view.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let copy =
                    Value::TypedBuffer(Shared::new(view.read().duplicate(self.options.deep)));
                Ok(self.remember(id, copy))
            }

            Value::DataView(view) => {
                let id = view.identity();
                if let Some(hit) = self.memory.get(id) {
                    return Ok(hit.clone());
                }
                let copy = Value::DataView(Shared::new(view.read().duplicate(self.options.deep)));
                Ok(self.remember(id, copy))
            }
        }
    }
}

/// Shallow clone: one level copied, children shared by reference.
pub fn clone(value: &Value) -> Value {
    match Cloner::new(CloneOptions::shallow()).clone_value(value) {
        Ok(v) => v,
        // Shallow cloning never recurses, so the depth limit cannot trip.
        Err(_) => Value::undefined(),
    }
}

/// Deep clone with default options.
pub fn clone_deep(value: &Value) -> EngineResult<Value> {
    Cloner::new(CloneOptions::deep()).clone_value(value)
}

/// Deep clone with explicit options and an optional customizer.
pub fn clone_deep_with(
    value: &Value,
    options: CloneOptions,
    customizer: Option<&CloneCustomizer>,
) -> EngineResult<Value> {
    let mut cloner = Cloner::new(options);
    if let Some(customizer) = customizer {
        cloner = cloner.with_customizer(customizer);
    }
    cloner.clone_value(value)
}
