//! The deep equality engine.
//!
//! A total, symmetric, cycle-safe structural comparison. Both sides of a
//! composite pair are registered in the identity cache before descending;
//! when a cycle is reached on both sides simultaneously the pair is assumed
//! equal, the standard optimistic rule for structural equality. Entries are
//! removed again when their subtree finishes.

use crate::cache::IdentityCache;
use crate::error::{DEFAULT_DEPTH_LIMIT, EngineError, EngineResult};
use tangle_value::{Shared, Value, same_value_zero};

/// Performs one top-level equality call; owns the per-call cycle cache.
pub struct Equality {
    stack: IdentityCache<usize>,
    depth_limit: usize,
}

impl Equality {
    /// A fresh comparison context.
    pub fn new() -> Self {
        Self {
            stack: IdentityCache::new(),
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    /// Override the recursion depth budget.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    /// Structural equality of `a` and `b`.
    pub fn is_equal(&mut self, a: &Value, b: &Value) -> EngineResult<bool> {
        self.walk(a, b, 0)
    }

    fn walk(&mut self, a: &Value, b: &Value, depth: usize) -> EngineResult<bool> {
        // Reference-equal composites and SameValueZero scalars short-circuit.
        if same_value_zero(a, b) {
            return Ok(true);
        }
        if a.kind() != b.kind() {
            return Ok(false);
        }
        if depth > self.depth_limit {
            return Err(EngineError::DepthLimitExceeded {
                limit: self.depth_limit,
            });
        }

        match (a, b) {
            (Value::Array(x), Value::Array(y)) => {
                let sx = x.read().clone();
                let sy = y.read().clone();
                if sx.len() != sy.len() {
                    return Ok(false);
                }
                self.with_pair_registered(x.identity(), y.identity(), depth, |this, depth| {
                    for (ea, eb) in sx.iter().zip(sy.iter()) {
                        if !this.walk(ea, eb, depth + 1)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                })
            }

            (Value::Record(x), Value::Record(y)) => self.equal_records(x, y, depth),

            (Value::Map(x), Value::Map(y)) => {
                let ex = x.read().entries();
                let ey = y.read().entries();
                if ex.len() != ey.len() {
                    return Ok(false);
                }
                self.with_side_registered(x.identity(), y.identity(), depth, |this, depth| {
                    this.unordered_pairs_equal(&ex, &ey, depth)
                })
            }

            (Value::Set(x), Value::Set(y)) => {
                let mx = x.read().members();
                let my = y.read().members();
                if mx.len() != my.len() {
                    return Ok(false);
                }
                self.with_side_registered(x.identity(), y.identity(), depth, |this, depth| {
                    this.unordered_members_equal(&mx, &my, depth)
                })
            }

            (Value::TypedBuffer(x), Value::TypedBuffer(y)) => {
                let gx = x.read();
                let gy = y.read();
                if gx.kind() != gy.kind() || gx.len() != gy.len() {
                    return Ok(false);
                }
                Ok(gx
                    .to_vec()
                    .iter()
                    .zip(gy.to_vec().iter())
                    .all(|(m, n)| (m.is_nan() && n.is_nan()) || m == n))
            }

            (Value::ArrayBuffer(x), Value::ArrayBuffer(y)) => {
                Ok(x.read().bytes() == y.read().bytes())
            }

            (Value::DataView(x), Value::DataView(y)) => {
                let gx = x.read();
                let gy = y.read();
                Ok(gx.byte_offset() == gy.byte_offset()
                    && gx.byte_length() == gy.byte_length()
                    && gx.to_bytes() == gy.to_bytes())
            }

            (Value::Date(x), Value::Date(y)) => {
                let (mx, my) = (x.read().millis(), y.read().millis());
                Ok((mx.is_nan() && my.is_nan()) || mx == my)
            }

            (Value::Boxed(x), Value::Boxed(y)) => {
                if !x.same_class(y) {
                    return Ok(false);
                }
                Ok(match (x.numeric_value(), y.numeric_value()) {
                    (Some(m), Some(n)) => (m.is_nan() && n.is_nan()) || m == n,
                    _ => x.text() == y.text(),
                })
            }

            (Value::RegExp(x), Value::RegExp(y)) => {
                Ok(x.to_pattern_string() == y.to_pattern_string())
            }

            (Value::Error(x), Value::Error(y)) => {
                let gx = x.read();
                let gy = y.read();
                Ok(gx.name == gy.name && gx.message == gy.message)
            }

            // Distinct scalars of the same kind already failed SameValueZero;
            // functions, weak maps, and host values never compare equal by
            // structure.
            _ => Ok(false),
        }
    }

    fn equal_records(
        &mut self,
        x: &Shared<tangle_value::RecordData>,
        y: &Shared<tangle_value::RecordData>,
        depth: usize,
    ) -> EngineResult<bool> {
        let (ex, px) = {
            let guard = x.read();
            (guard.own_entries(), guard.proto())
        };
        let (len_y, py) = {
            let guard = y.read();
            (guard.len(), guard.proto())
        };
        if ex.len() != len_y {
            return Ok(false);
        }
        {
            let guard = y.read();
            for (key, _) in &ex {
                if !guard.contains_key(key) {
                    return Ok(false);
                }
            }
        }
        // Compatible constructors, adapted to the closed model: the proto
        // links must alias the same record, or both be absent.
        let compatible = match (&px, &py) {
            (None, None) => true,
            (Some(px), Some(py)) => px.ptr_eq(py),
            _ => false,
        };
        if !compatible {
            return Ok(false);
        }

        self.with_pair_registered(x.identity(), y.identity(), depth, |this, depth| {
            for (key, va) in &ex {
                let vb = match y.read().get(key) {
                    Some(vb) => vb,
                    None => return Ok(false),
                };
                if !this.walk(va, &vb, depth + 1)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Register a pair on both sides, run `body`, deregister. A re-entered
    /// pair (a cycle reached on both sides) compares equal iff each side is
    /// stacked against the other.
    fn with_pair_registered<F>(
        &mut self,
        ida: usize,
        idb: usize,
        depth: usize,
        body: F,
    ) -> EngineResult<bool>
    where
        F: FnOnce(&mut Self, usize) -> EngineResult<bool>,
    {
        if let (Some(&sa), Some(&sb)) = (self.stack.get(ida), self.stack.get(idb)) {
            return Ok(sa == idb && sb == ida);
        }
        self.stack.set(ida, idb);
        self.stack.set(idb, ida);
        let result = body(self, depth);
        self.stack.delete(ida);
        self.stack.delete(idb);
        result
    }

    /// Map/Set variant: only the left side is registered.
    fn with_side_registered<F>(
        &mut self,
        ida: usize,
        idb: usize,
        depth: usize,
        body: F,
    ) -> EngineResult<bool>
    where
        F: FnOnce(&mut Self, usize) -> EngineResult<bool>,
    {
        if let Some(&stacked) = self.stack.get(ida) {
            return Ok(stacked == idb);
        }
        self.stack.set(ida, idb);
        let result = body(self, depth);
        self.stack.delete(ida);
        result
    }

    /// Unordered matching: every left entry must claim an as-yet-unmatched,
    /// structurally equal right entry. This is the only place order is
    /// ignored.
    fn unordered_pairs_equal(
        &mut self,
        left: &[(Value, Value)],
        right: &[(Value, Value)],
        depth: usize,
    ) -> EngineResult<bool> {
        let mut claimed = vec![false; right.len()];
        'outer: for (lk, lv) in left {
            for (j, (rk, rv)) in right.iter().enumerate() {
                if claimed[j] {
                    continue;
                }
                if self.walk(lk, rk, depth + 1)? && self.walk(lv, rv, depth + 1)? {
                    claimed[j] = true;
                    continue 'outer;
                }
            }
            return Ok(false);
        }
        Ok(true)
    }

    fn unordered_members_equal(
        &mut self,
        left: &[Value],
        right: &[Value],
        depth: usize,
    ) -> EngineResult<bool> {
        let mut claimed = vec![false; right.len()];
        'outer: for lv in left {
            for (j, rv) in right.iter().enumerate() {
                if claimed[j] {
                    continue;
                }
                if self.walk(lv, rv, depth + 1)? {
                    claimed[j] = true;
                    continue 'outer;
                }
            }
            return Ok(false);
        }
        Ok(true)
    }
}

impl Default for Equality {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality of `a` and `b`.
pub fn is_equal(a: &Value, b: &Value) -> EngineResult<bool> {
    Equality::new().is_equal(a, b)
}

/// Change-detection convenience: depth exhaustion counts as "not equal".
pub fn eq_values(a: &Value, b: &Value) -> bool {
    Equality::new().is_equal(a, b).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_value::{ElementKind, MapData, RecordData, SetData};

    fn assert_equal(a: &Value, b: &Value) {
        assert!(is_equal(a, b).unwrap());
        assert!(is_equal(b, a).unwrap(), "equality must be symmetric");
    }

    fn assert_not_equal(a: &Value, b: &Value) {
        assert!(!is_equal(a, b).unwrap());
        assert!(!is_equal(b, a).unwrap());
    }

    #[test]
    fn scalar_rules() {
        assert_equal(&Value::number(f64::NAN), &Value::number(f64::NAN));
        assert_equal(&Value::number(0.0), &Value::number(-0.0));
        assert_equal(&Value::string("a"), &Value::string("a"));
        assert_not_equal(&Value::number(1.0), &Value::string("1"));
        assert_not_equal(&Value::null(), &Value::undefined());
    }

    #[test]
    fn arrays_are_ordered() {
        let a = Value::array(vec![Value::number(1.0), Value::number(2.0)]);
        let b = Value::array(vec![Value::number(1.0), Value::number(2.0)]);
        let c = Value::array(vec![Value::number(2.0), Value::number(1.0)]);
        assert_equal(&a, &b);
        assert_not_equal(&a, &c);
        assert_not_equal(&a, &Value::array(vec![Value::number(1.0)]));
    }

    #[test]
    fn records_compare_by_own_fields_regardless_of_order() {
        let a = Value::record_from_pairs([("x", Value::number(1.0)), ("y", Value::number(2.0))]);
        let b = Value::record_from_pairs([("y", Value::number(2.0)), ("x", Value::number(1.0))]);
        assert_equal(&a, &b);

        let extra =
            Value::record_from_pairs([("x", Value::number(1.0)), ("z", Value::number(2.0))]);
        assert_not_equal(&a, &extra);
    }

    #[test]
    fn records_with_unrelated_protos_are_not_equal() {
        let proto = Shared::new(RecordData::new());
        let plain = Value::empty_record();
        let derived = Value::record(RecordData::with_proto(Some(proto.clone())));
        assert_not_equal(&plain, &derived);

        let sibling = Value::record(RecordData::with_proto(Some(proto)));
        assert_equal(&derived, &sibling);
    }

    #[test]
    fn maps_and_sets_ignore_insertion_order() {
        let mut ma = MapData::new();
        ma.set(Value::string("a"), Value::number(1.0));
        ma.set(Value::string("b"), Value::number(2.0));
        let mut mb = MapData::new();
        mb.set(Value::string("b"), Value::number(2.0));
        mb.set(Value::string("a"), Value::number(1.0));
        assert_equal(&Value::map(ma), &Value::map(mb));

        let mut sa = SetData::new();
        sa.add(Value::number(1.0));
        sa.add(Value::number(2.0));
        let mut sb = SetData::new();
        sb.add(Value::number(2.0));
        sb.add(Value::number(1.0));
        assert_equal(&Value::set(sa), &Value::set(sb));

        let mut shorter = SetData::new();
        shorter.add(Value::number(1.0));
        assert_not_equal(
            &Value::set(shorter),
            &Value::set({
                let mut s = SetData::new();
                s.add(Value::number(1.0));
                s.add(Value::number(2.0));
                s
            }),
        );
    }

    #[test]
    fn map_entries_match_structurally() {
        let mut ma = MapData::new();
        ma.set(
            Value::record_from_pairs([("k", Value::number(1.0))]),
            Value::string("v"),
        );
        let mut mb = MapData::new();
        mb.set(
            Value::record_from_pairs([("k", Value::number(1.0))]),
            Value::string("v"),
        );
        assert_equal(&Value::map(ma), &Value::map(mb));
    }

    #[test]
    fn leaf_composite_rules() {
        assert_equal(&Value::date(1000.0), &Value::date(1000.0));
        assert_equal(&Value::date(f64::NAN), &Value::date(f64::NAN));
        assert_not_equal(&Value::date(0.0), &Value::date(1.0));

        assert_equal(&Value::regexp("a+", "i"), &Value::regexp("a+", "i"));
        assert_not_equal(&Value::regexp("a+", "i"), &Value::regexp("a+", ""));

        assert_equal(&Value::boxed_number(3.0), &Value::boxed_number(3.0));
        assert_equal(&Value::boxed_string("s"), &Value::boxed_string("s"));
        assert_not_equal(&Value::boxed_bool(true), &Value::boxed_number(1.0));

        assert_equal(&Value::error("TypeError", "bad"), &Value::error("TypeError", "bad"));
        assert_not_equal(&Value::error("TypeError", "bad"), &Value::error("RangeError", "bad"));

        assert_equal(
            &Value::typed_buffer(ElementKind::Float64, &[1.0, f64::NAN]),
            &Value::typed_buffer(ElementKind::Float64, &[1.0, f64::NAN]),
        );
        assert_not_equal(
            &Value::typed_buffer(ElementKind::Int8, &[1.0]),
            &Value::typed_buffer(ElementKind::Uint8, &[1.0]),
        );
    }

    #[test]
    fn functions_compare_false_unless_identical() {
        let f = Value::function(None, |_| Value::undefined());
        let g = Value::function(None, |_| Value::undefined());
        assert_equal(&f, &f.clone());
        assert_not_equal(&f, &g);
    }

    #[test]
    fn cyclic_values_terminate_and_compare_equal() {
        let a = Value::empty_record();
        a.set_field("self", a.clone());
        let b = Value::empty_record();
        b.set_field("self", b.clone());

        assert!(is_equal(&a, &a.clone()).unwrap());
        assert_equal(&a, &b);
    }

    #[test]
    fn mutually_cyclic_pairs_compare_equal() {
        let a1 = Value::empty_record();
        let a2 = Value::empty_record();
        a1.set_field("other", a2.clone());
        a2.set_field("other", a1.clone());

        let b1 = Value::empty_record();
        let b2 = Value::empty_record();
        b1.set_field("other", b2.clone());
        b2.set_field("other", b1.clone());

        assert_equal(&a1, &b1);
    }

    #[test]
    fn cyclic_against_acyclic_is_not_equal() {
        let cyclic = Value::empty_record();
        cyclic.set_field("next", cyclic.clone());
        let acyclic = Value::record_from_pairs([("next", Value::empty_record())]);
        assert_not_equal(&cyclic, &acyclic);
    }

    #[test]
    fn depth_exhaustion_is_an_error_not_a_verdict() {
        let mut a = Value::number(0.0);
        let mut b = Value::number(0.0);
        for _ in 0..64 {
            a = Value::record_from_pairs([("n", a)]);
            b = Value::record_from_pairs([("n", b)]);
        }
        let result = Equality::new().with_depth_limit(16).is_equal(&a, &b);
        assert_eq!(result, Err(EngineError::DepthLimitExceeded { limit: 16 }));
        assert!(eq_values(&a, &b), "default budget compares them fine");
    }
}
