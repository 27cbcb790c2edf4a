//! The deep merge engine.
//!
//! Sources are folded into the destination in place. Composite source
//! values (arrays, records, typed buffers) recurse; everything else assigns,
//! skipping writes whose value is already SameValueZero-equal. Source keys
//! include inherited record fields, since defaults-style merging commonly
//! pulls from prototype chains. Cyclic sources terminate through the
//! identity cache: each source subvalue is registered against its
//! destination counterpart before descending, so a self-referential source
//! merges into a self-referential destination.

use crate::cache::IdentityCache;
use crate::error::{DEFAULT_DEPTH_LIMIT, EngineError, EngineResult};
use crate::path::{PathKey, to_record_key, write_key};
use tangle_value::{RecordData, Shared, Value, same_value_zero};

/// A caller hook `(current, incoming, key) -> Option<new value>` consulted
/// before the default behavior at every key. `None` means "not handled".
pub type MergeCustomizer = dyn Fn(Option<&Value>, &Value, Option<&PathKey>) -> Option<Value>;

/// Built-in per-key policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    /// Source values overwrite destination values.
    Overwrite,
    /// A present destination value is kept; only gaps (absent or undefined
    /// keys) are filled, recursing into nested records to fill their gaps.
    FillGaps,
}

/// Performs one top-level merge call; owns the per-call identity cache.
pub struct Merger<'c> {
    stack: IdentityCache<Value>,
    customizer: Option<&'c MergeCustomizer>,
    policy: Policy,
    depth_limit: usize,
}

impl<'c> Merger<'c> {
    /// An overwrite-policy merger.
    pub fn new() -> Self {
        Self {
            stack: IdentityCache::new(),
            customizer: None,
            policy: Policy::Overwrite,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    /// A gap-filling merger (the `defaults_deep` engine).
    fn fill_gaps() -> Self {
        Self {
            policy: Policy::FillGaps,
            ..Self::new()
        }
    }

    /// Attach a customizer.
    pub fn with_customizer(mut self, customizer: &'c MergeCustomizer) -> Self {
        self.customizer = Some(customizer);
        self
    }

    /// Override the recursion depth budget.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    /// Merge each source into `dest` in order; returns the `dest` handle.
    /// A destination that is not a record or array is returned unchanged.
    pub fn run(&mut self, dest: &Value, sources: &[Value]) -> EngineResult<Value> {
        if !matches!(dest, Value::Record(_) | Value::Array(_)) {
            return Ok(dest.clone());
        }
        for source in sources {
            self.merge_into(dest, source, 0)?;
        }
        Ok(dest.clone())
    }

    fn merge_into(&mut self, dest: &Value, source: &Value, depth: usize) -> EngineResult<()> {
        if dest.identity().is_some() && dest.identity() == source.identity() {
            return Ok(());
        }
        if depth > self.depth_limit {
            return Err(EngineError::DepthLimitExceeded {
                limit: self.depth_limit,
            });
        }
        for key in source_keys_in(source) {
            // Guarded source keys are skipped outright.
            let Some(src_value) = source_safe_get(source, &key) else {
                continue;
            };
            match src_value {
                Value::Array(_) | Value::Record(_) | Value::TypedBuffer(_) => {
                    self.merge_deep(dest, &key, &src_value, depth)?;
                }
                _ => {
                    let current = container_get(dest, &key);
                    let new_value = self
                        .customize(current.as_ref(), &src_value, Some(&key), depth)?
                        .unwrap_or(src_value);
                    assign_merge_value(dest, &key, new_value);
                }
            }
        }
        Ok(())
    }

    fn merge_deep(
        &mut self,
        dest: &Value,
        key: &PathKey,
        src_value: &Value,
        depth: usize,
    ) -> EngineResult<()> {
        let obj_value = container_safe_get(dest, key);

        // A source subvalue already being merged maps to its in-progress
        // destination; assigning it is what closes cyclic sources.
        if let Some(src_id) = src_value.identity()
            && let Some(stacked) = self.stack.get(src_id)
        {
            let stacked = stacked.clone();
            assign_merge_value(dest, key, stacked);
            return Ok(());
        }

        let custom = self.customize(obj_value.as_ref(), src_value, Some(key), depth)?;
        let (new_value, recurse) = match custom {
            Some(value) => (value, false),
            None => match src_value {
                Value::Array(_) => match &obj_value {
                    Some(existing @ Value::Array(_)) => (existing.clone(), true),
                    Some(Value::TypedBuffer(view)) => {
                        let elements =
                            view.read().to_vec().into_iter().map(Value::number).collect();
                        (Value::array(elements), true)
                    }
                    _ => (Value::empty_array(), true),
                },
                // Typed buffers never alias the source: always a deep copy.
                Value::TypedBuffer(view) => (
                    Value::TypedBuffer(Shared::new(view.read().duplicate(true))),
                    false,
                ),
                Value::Record(src_rec) => match &obj_value {
                    Some(existing @ Value::Record(_)) => (existing.clone(), true),
                    Some(Value::Array(_))
                        if self.policy == Policy::Overwrite && self.customizer.is_none() =>
                    {
                        // A record source replaces an array destination.
                        (src_value.clone(), false)
                    }
                    _ => (
                        Value::record(RecordData::with_proto(src_rec.read().proto())),
                        true,
                    ),
                },
                other => (other.clone(), false),
            },
        };

        if recurse && let Some(src_id) = src_value.identity() {
            self.stack.set(src_id, new_value.clone());
            self.merge_into(&new_value, src_value, depth + 1)?;
            self.stack.delete(src_id);
        }
        assign_merge_value(dest, key, new_value);
        Ok(())
    }

    fn customize(
        &mut self,
        current: Option<&Value>,
        incoming: &Value,
        key: Option<&PathKey>,
        depth: usize,
    ) -> EngineResult<Option<Value>> {
        if let Some(customizer) = self.customizer
            && let Some(result) = customizer(current, incoming, key)
        {
            return Ok(Some(result));
        }
        match self.policy {
            Policy::Overwrite => Ok(None),
            Policy::FillGaps => {
                let Some(current) = current else {
                    return Ok(None);
                };
                if is_mergeable(current) && is_mergeable(incoming) {
                    // Fill gaps of the existing composite in place; it must
                    // share the in-progress cache, so it runs on self.
                    if let Some(src_id) = incoming.identity() {
                        self.stack.set(src_id, current.clone());
                        self.merge_into(current, incoming, depth + 1)?;
                        self.stack.delete(src_id);
                    }
                    return Ok(Some(current.clone()));
                }
                if matches!(current, Value::Undefined) {
                    return Ok(None);
                }
                Ok(Some(current.clone()))
            }
        }
    }
}

impl Default for Merger<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_mergeable(value: &Value) -> bool {
    matches!(value, Value::Record(_) | Value::Array(_))
}

/// Enumerable source keys: own plus inherited string-keyed record fields (in
/// own-first order), or array indexes.
fn source_keys_in(source: &Value) -> Vec<PathKey> {
    match source {
        Value::Record(rec) => rec
            .read()
            .keys_in()
            .into_iter()
            .filter_map(|k| k.as_str().map(PathKey::key))
            .collect(),
        Value::Array(arr) => (0..arr.read().len()).map(PathKey::Index).collect(),
        _ => Vec::new(),
    }
}

fn source_safe_get(source: &Value, key: &PathKey) -> Option<Value> {
    match (source, key) {
        (Value::Record(rec), key) => rec.read().safe_get_in(&to_record_key(key)),
        (Value::Array(arr), PathKey::Index(i)) => arr.read().get(*i).cloned(),
        _ => None,
    }
}

fn container_get(dest: &Value, key: &PathKey) -> Option<Value> {
    match (dest, key) {
        (Value::Record(rec), key) => rec.read().get_in(&to_record_key(key)),
        (Value::Array(arr), PathKey::Index(i)) => arr.read().get(*i).cloned(),
        _ => None,
    }
}

fn container_safe_get(dest: &Value, key: &PathKey) -> Option<Value> {
    match (dest, key) {
        (Value::Record(rec), key) => rec.read().safe_get_in(&to_record_key(key)),
        (Value::Array(arr), PathKey::Index(i)) => arr.read().get(*i).cloned(),
        _ => None,
    }
}

/// Assign `value` at `key`, skipping writes that would not change anything:
/// an equal (SameValueZero) existing value, or an explicit `Undefined` over
/// a present key. An absent key is always written, even with `Undefined`.
fn assign_merge_value(dest: &Value, key: &PathKey, value: Value) {
    let write = match container_get(dest, key) {
        None => true,
        Some(_) if matches!(value, Value::Undefined) => false,
        Some(current) => !same_value_zero(&current, &value),
    };
    if write {
        write_key(dest, key, value);
    }
}

/// Merge each source into `dest` (overwrite policy); returns `dest`.
pub fn merge(dest: &Value, sources: &[Value]) -> EngineResult<Value> {
    Merger::new().run(dest, sources)
}

/// Merge with a caller customizer consulted before default behavior.
pub fn merge_with(
    dest: &Value,
    sources: &[Value],
    customizer: &MergeCustomizer,
) -> EngineResult<Value> {
    Merger::new().with_customizer(customizer).run(dest, sources)
}

/// Recursive gap-filling: a present destination scalar is never overwritten,
/// nested records are filled key by key.
pub fn defaults_deep(dest: &Value, sources: &[Value]) -> EngineResult<Value> {
    Merger::fill_gaps().run(dest, sources)
}

/// One-level gap-filling: absent or undefined own keys of a record
/// destination are filled from each source's own fields, in order.
pub fn defaults(dest: &Value, sources: &[Value]) -> Value {
    let Some(rec) = dest.as_record() else {
        return dest.clone();
    };
    for source in sources {
        let Some(src) = source.as_record() else {
            continue;
        };
        for (key, value) in src.read().own_entries() {
            let absent = matches!(
                rec.read().get(&key),
                None | Some(Value::Undefined)
            );
            if absent {
                rec.write().insert(key, value);
            }
        }
    }
    dest.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_value::{ElementKind, RecordKey};

    fn num_field(value: &Value, name: &str) -> Option<f64> {
        value.get_field(name).and_then(|v| v.as_number())
    }

    #[test]
    fn merge_overwrites_and_recurses() {
        let dest = Value::record_from_pairs([
            ("a", Value::number(1.0)),
            ("c", Value::record_from_pairs([("x", Value::number(1.0))])),
        ]);
        let source = Value::record_from_pairs([
            ("a", Value::number(2.0)),
            ("b", Value::number(3.0)),
            ("c", Value::record_from_pairs([("y", Value::number(2.0))])),
        ]);
        let result = merge(&dest, &[source]).unwrap();

        assert_eq!(result.identity(), dest.identity(), "dest mutated in place");
        assert_eq!(num_field(&result, "a"), Some(2.0));
        assert_eq!(num_field(&result, "b"), Some(3.0));
        let c = result.get_field("c").unwrap();
        assert_eq!(num_field(&c, "x"), Some(1.0));
        assert_eq!(num_field(&c, "y"), Some(2.0));
    }

    #[test]
    fn defaults_deep_fills_gaps_only() {
        let dest = Value::record_from_pairs([("a", Value::number(1.0))]);
        let source = Value::record_from_pairs([
            ("a", Value::number(2.0)),
            ("b", Value::number(3.0)),
        ]);
        let result = defaults_deep(&dest, &[source]).unwrap();
        assert_eq!(num_field(&result, "a"), Some(1.0), "present key kept");
        assert_eq!(num_field(&result, "b"), Some(3.0), "gap filled");
    }

    #[test]
    fn defaults_deep_recurses_into_nested_records() {
        let dest = Value::record_from_pairs([(
            "style",
            Value::record_from_pairs([("fill", Value::string("red"))]),
        )]);
        let source = Value::record_from_pairs([(
            "style",
            Value::record_from_pairs([
                ("fill", Value::string("black")),
                ("stroke", Value::string("blue")),
            ]),
        )]);
        let result = defaults_deep(&dest, &[source]).unwrap();
        let style = result.get_field("style").unwrap();
        assert_eq!(style.get_field("fill"), Some(Value::string("red")));
        assert_eq!(style.get_field("stroke"), Some(Value::string("blue")));
    }

    #[test]
    fn defaults_pull_from_source_prototype_chains() {
        let proto = Shared::new({
            let mut data = RecordData::new();
            data.insert(RecordKey::from("inherited"), Value::number(5.0));
            data
        });
        let source = Value::record(RecordData::with_proto(Some(proto)));
        source.set_field("own", Value::number(1.0));

        let dest = Value::empty_record();
        defaults_deep(&dest, &[source]).unwrap();
        assert_eq!(num_field(&dest, "own"), Some(1.0));
        assert_eq!(num_field(&dest, "inherited"), Some(5.0));
    }

    #[test]
    fn array_sources_replace_non_array_destinations() {
        let dest = Value::record_from_pairs([("list", Value::number(1.0))]);
        let source =
            Value::record_from_pairs([("list", Value::array(vec![Value::number(9.0)]))]);
        merge(&dest, &[source.clone()]).unwrap();

        let list = dest.get_field("list").unwrap();
        assert!(list.is_array());
        assert_ne!(
            list.identity(),
            source.get_field("list").unwrap().identity(),
            "fresh array, not an alias of the source"
        );
        assert_eq!(list.as_array().unwrap().read()[0], Value::number(9.0));
    }

    #[test]
    fn arrays_merge_elementwise_into_existing_arrays() {
        let dest = Value::record_from_pairs([(
            "list",
            Value::array(vec![Value::number(1.0), Value::number(2.0), Value::number(3.0)]),
        )]);
        let source = Value::record_from_pairs([(
            "list",
            Value::array(vec![Value::number(9.0)]),
        )]);
        merge(&dest, &[source]).unwrap();
        let list = dest.get_field("list").unwrap();
        let snapshot = list.as_array().unwrap().read().clone();
        assert_eq!(snapshot.len(), 3, "longer destination tail survives");
        assert_eq!(snapshot[0], Value::number(9.0));
        assert_eq!(snapshot[1], Value::number(2.0));
    }

    #[test]
    fn typed_buffers_never_alias_the_source() {
        let source = Value::record_from_pairs([(
            "bytes",
            Value::typed_buffer(ElementKind::Uint8, &[1.0, 2.0]),
        )]);
        let dest = Value::empty_record();
        merge(&dest, &[source.clone()]).unwrap();

        let merged = dest.get_field("bytes").unwrap();
        let original = source.get_field("bytes").unwrap();
        assert_ne!(merged.identity(), original.identity());
        assert!(merged.as_typed_buffer().unwrap().read().set(0, 9.0));
        assert_eq!(
            original.as_typed_buffer().unwrap().read().get(0),
            Some(1.0),
            "source bytes untouched"
        );
    }

    #[test]
    fn cyclic_sources_merge_into_cyclic_destinations() {
        let source = Value::empty_record();
        source.set_field("self", source.clone());

        let dest = Value::empty_record();
        merge(&dest, &[source]).unwrap();

        let inner = dest.get_field("self").unwrap();
        let inner_self = inner.get_field("self").unwrap();
        assert_eq!(
            inner.identity(),
            inner_self.identity(),
            "destination is self-referential"
        );
    }

    #[test]
    fn merging_a_value_into_itself_is_a_no_op() {
        let dest = Value::record_from_pairs([("a", Value::number(1.0))]);
        merge(&dest, &[dest.clone()]).unwrap();
        assert_eq!(num_field(&dest, "a"), Some(1.0));
        assert_eq!(dest.as_record().unwrap().read().len(), 1);
    }

    #[test]
    fn customizer_wins_over_default_behavior() {
        let dest = Value::record_from_pairs([("n", Value::number(1.0))]);
        let source = Value::record_from_pairs([("n", Value::number(10.0))]);
        let customizer: &MergeCustomizer = &|current, incoming, _key| {
            let sum = current?.as_number()? + incoming.as_number()?;
            Some(Value::number(sum))
        };
        merge_with(&dest, &[source], customizer).unwrap();
        assert_eq!(num_field(&dest, "n"), Some(11.0));
    }

    #[test]
    fn equal_scalars_are_not_rewritten() {
        let shared_str = Value::string("same");
        let dest = Value::record_from_pairs([("s", shared_str.clone())]);
        let source = Value::record_from_pairs([("s", Value::string("same"))]);
        merge(&dest, &[source]).unwrap();
        // SameValueZero-equal, so the original (including its Arc) survives.
        assert_eq!(dest.get_field("s"), Some(shared_str));
    }

    #[test]
    fn explicit_undefined_fills_absent_keys_only() {
        let dest = Value::record_from_pairs([("present", Value::number(1.0))]);
        let source = Value::record_from_pairs([
            ("present", Value::undefined()),
            ("absent", Value::undefined()),
        ]);
        merge(&dest, &[source]).unwrap();
        assert_eq!(num_field(&dest, "present"), Some(1.0));
        assert!(
            dest.as_record()
                .unwrap()
                .read()
                .contains_key(&RecordKey::from("absent")),
            "absent key is recorded even as undefined"
        );
    }

    #[test]
    fn scalar_destinations_are_returned_unchanged() {
        let dest = Value::number(1.0);
        let result = merge(&dest, &[Value::record_from_pairs([("a", Value::null())])]).unwrap();
        assert_eq!(result, Value::number(1.0));
    }

    #[test]
    fn shallow_defaults_fill_one_level() {
        let dest = Value::record_from_pairs([("a", Value::number(1.0))]);
        let source = Value::record_from_pairs([
            ("a", Value::number(9.0)),
            ("b", Value::number(2.0)),
        ]);
        defaults(&dest, &[source]);
        assert_eq!(num_field(&dest, "a"), Some(1.0));
        assert_eq!(num_field(&dest, "b"), Some(2.0));
    }
}
