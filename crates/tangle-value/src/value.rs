//! The `Value` handle and its closed kind classification.
//!
//! Scalars are stored inline; composites are handles into shared storage.
//! Cloning a `Value` clones the handle, so two values can alias one
//! allocation — that aliasing is what `identity()` exposes and what the
//! structural engine's caches key on.

use crate::array_buffer::ArrayBufferData;
use crate::boxed::BoxedScalar;
use crate::data_view::DataViewData;
use crate::date::DateData;
use crate::error_data::ErrorData;
use crate::function::FunctionValue;
use crate::map_data::{MapData, SetData};
use crate::record::{RecordData, RecordKey};
use crate::regexp::RegexData;
use crate::shared::Shared;
use crate::symbol::SymbolValue;
use crate::typed_buffer::{ElementKind, TypedBufferData};
use crate::weak_map::WeakMapData;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The closed classification of a value, used for dispatch everywhere.
///
/// Every value belongs to exactly one kind for its whole lifetime; host
/// values the model does not recognize fall back to [`Kind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The undefined value.
    Undefined,
    /// The null value.
    Null,
    /// Primitive boolean.
    Bool,
    /// Primitive number.
    Number,
    /// Primitive string.
    String,
    /// Symbol.
    Symbol,
    /// Ordered element sequence.
    Array,
    /// Plain record.
    Record,
    /// Keyed map with SameValueZero keys.
    Map,
    /// Membership set with SameValueZero members.
    Set,
    /// Date (epoch-milliseconds cell).
    Date,
    /// Regular expression.
    RegExp,
    /// Typed numeric view over a buffer.
    TypedBuffer,
    /// Raw byte buffer.
    ArrayBuffer,
    /// Untyped byte view over a buffer.
    DataView,
    /// Boxed Bool/Number/String.
    Boxed,
    /// Host callable; opaque to the engine.
    Function,
    /// Error value; opaque to the clone engine.
    Error,
    /// Identity-keyed side table; opaque to the engine.
    WeakMap,
    /// Unrecognized host value; opaque to the engine.
    Other,
}

impl Kind {
    /// Display name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Undefined => "Undefined",
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Number => "Number",
            Kind::String => "String",
            Kind::Symbol => "Symbol",
            Kind::Array => "Array",
            Kind::Record => "Record",
            Kind::Map => "Map",
            Kind::Set => "Set",
            Kind::Date => "Date",
            Kind::RegExp => "RegExp",
            Kind::TypedBuffer => "TypedBuffer",
            Kind::ArrayBuffer => "ArrayBuffer",
            Kind::DataView => "DataView",
            Kind::Boxed => "Boxed",
            Kind::Function => "Function",
            Kind::Error => "Error",
            Kind::WeakMap => "WeakMap",
            Kind::Other => "Other",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An unrecognized host value carried by reference.
#[derive(Clone)]
pub struct OtherValue(Arc<dyn Any + Send + Sync>);

impl OtherValue {
    /// Wrap an arbitrary host value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Stable identity of the wrapped allocation.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Downcast to the concrete host type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }
}

impl fmt::Debug for OtherValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[host value @{:#x}]", self.identity())
    }
}

/// A runtime value: scalars inline, composites behind shared handles.
#[derive(Clone, Default)]
pub enum Value {
    /// The undefined value.
    #[default]
    Undefined,
    /// The null value.
    Null,
    /// Primitive boolean.
    Bool(bool),
    /// Primitive number.
    Number(f64),
    /// Primitive string (immutable, shared).
    String(Arc<str>),
    /// Symbol.
    Symbol(SymbolValue),
    /// Array.
    Array(Shared<Vec<Value>>),
    /// Plain record.
    Record(Shared<RecordData>),
    /// Map.
    Map(Shared<MapData>),
    /// Set.
    Set(Shared<SetData>),
    /// Date.
    Date(Shared<DateData>),
    /// Regular expression.
    RegExp(Arc<RegexData>),
    /// Typed buffer view.
    TypedBuffer(Shared<TypedBufferData>),
    /// Raw byte buffer.
    ArrayBuffer(Shared<ArrayBufferData>),
    /// Byte view over a buffer.
    DataView(Shared<DataViewData>),
    /// Boxed scalar.
    Boxed(Arc<BoxedScalar>),
    /// Host callable.
    Function(FunctionValue),
    /// Error value.
    Error(Shared<ErrorData>),
    /// Identity-keyed side table.
    WeakMap(Shared<WeakMapData>),
    /// Unrecognized host value.
    Other(OtherValue),
}

impl Value {
    /// The undefined value.
    pub fn undefined() -> Self {
        Value::Undefined
    }

    /// The null value.
    pub fn null() -> Self {
        Value::Null
    }

    /// A boolean value.
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// A number value.
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// A string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// A fresh symbol.
    pub fn symbol(description: Option<&str>) -> Self {
        Value::Symbol(SymbolValue::new(description))
    }

    /// An array owning `elements`.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Shared::new(elements))
    }

    /// An empty array.
    pub fn empty_array() -> Self {
        Value::Array(Shared::new(Vec::new()))
    }

    /// A record from backing data.
    pub fn record(data: RecordData) -> Self {
        Value::Record(Shared::new(data))
    }

    /// An empty record.
    pub fn empty_record() -> Self {
        Value::Record(Shared::new(RecordData::new()))
    }

    /// A record built from string-keyed pairs, in order.
    pub fn record_from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut data = RecordData::new();
        for (k, v) in pairs {
            data.insert(RecordKey::from(k), v);
        }
        Value::record(data)
    }

    /// A map from backing data.
    pub fn map(data: MapData) -> Self {
        Value::Map(Shared::new(data))
    }

    /// A set from backing data.
    pub fn set(data: SetData) -> Self {
        Value::Set(Shared::new(data))
    }

    /// A date at the given epoch milliseconds.
    pub fn date(millis: f64) -> Self {
        Value::Date(Shared::new(DateData::new(millis)))
    }

    /// A regex from pattern and flags.
    pub fn regexp(source: &str, flags: &str) -> Self {
        Value::RegExp(Arc::new(RegexData::new(source, flags)))
    }

    /// A typed buffer over a fresh backing buffer.
    pub fn typed_buffer(kind: ElementKind, values: &[f64]) -> Self {
        Value::TypedBuffer(Shared::new(TypedBufferData::from_values(kind, values)))
    }

    /// A raw buffer owning `bytes`.
    pub fn array_buffer(bytes: Vec<u8>) -> Self {
        Value::ArrayBuffer(Shared::new(ArrayBufferData::from_bytes(bytes)))
    }

    /// A boxed boolean.
    pub fn boxed_bool(b: bool) -> Self {
        Value::Boxed(Arc::new(BoxedScalar::Bool(b)))
    }

    /// A boxed number.
    pub fn boxed_number(n: f64) -> Self {
        Value::Boxed(Arc::new(BoxedScalar::Number(n)))
    }

    /// A boxed string.
    pub fn boxed_string(s: &str) -> Self {
        Value::Boxed(Arc::new(BoxedScalar::String(Arc::from(s))))
    }

    /// A host callable.
    pub fn function<F>(name: Option<&str>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Value::Function(FunctionValue::new(name, func))
    }

    /// An error value.
    pub fn error(name: &str, message: &str) -> Self {
        Value::Error(Shared::new(ErrorData::new(name, message)))
    }

    /// An empty weak map.
    pub fn weak_map() -> Self {
        Value::WeakMap(Shared::new(WeakMapData::new()))
    }

    /// An opaque host value.
    pub fn other<T: Any + Send + Sync>(value: T) -> Self {
        Value::Other(OtherValue::new(value))
    }

    /// Classify this value. Total and O(1).
    pub fn kind(&self) -> Kind {
        match self {
            Value::Undefined => Kind::Undefined,
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Symbol(_) => Kind::Symbol,
            Value::Array(_) => Kind::Array,
            Value::Record(_) => Kind::Record,
            Value::Map(_) => Kind::Map,
            Value::Set(_) => Kind::Set,
            Value::Date(_) => Kind::Date,
            Value::RegExp(_) => Kind::RegExp,
            Value::TypedBuffer(_) => Kind::TypedBuffer,
            Value::ArrayBuffer(_) => Kind::ArrayBuffer,
            Value::DataView(_) => Kind::DataView,
            Value::Boxed(_) => Kind::Boxed,
            Value::Function(_) => Kind::Function,
            Value::Error(_) => Kind::Error,
            Value::WeakMap(_) => Kind::WeakMap,
            Value::Other(_) => Kind::Other,
        }
    }

    /// The stable identity of the backing allocation, `None` for inline
    /// scalars. Two values with equal identities alias the same storage.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
            | Value::String(_) => None,
            Value::Symbol(s) => Some(s.identity()),
            Value::Array(a) => Some(a.identity()),
            Value::Record(r) => Some(r.identity()),
            Value::Map(m) => Some(m.identity()),
            Value::Set(s) => Some(s.identity()),
            Value::Date(d) => Some(d.identity()),
            Value::RegExp(r) => Some(Arc::as_ptr(r) as usize),
            Value::TypedBuffer(t) => Some(t.identity()),
            Value::ArrayBuffer(b) => Some(b.identity()),
            Value::DataView(v) => Some(v.identity()),
            Value::Boxed(b) => Some(Arc::as_ptr(b) as usize),
            Value::Function(f) => Some(f.identity()),
            Value::Error(e) => Some(e.identity()),
            Value::WeakMap(w) => Some(w.identity()),
            Value::Other(o) => Some(o.identity()),
        }
    }

    /// Whether this value is `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Whether this value is a record.
    pub fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// Whether this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Whether this value is callable.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// The boolean inside a `Bool`, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number inside a `Number`, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text inside a `String`, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The backing array, if any.
    pub fn as_array(&self) -> Option<&Shared<Vec<Value>>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The backing record, if any.
    pub fn as_record(&self) -> Option<&Shared<RecordData>> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// The backing map, if any.
    pub fn as_map(&self) -> Option<&Shared<MapData>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The backing set, if any.
    pub fn as_set(&self) -> Option<&Shared<SetData>> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    /// The backing typed buffer, if any.
    pub fn as_typed_buffer(&self) -> Option<&Shared<TypedBufferData>> {
        match self {
            Value::TypedBuffer(t) => Some(t),
            _ => None,
        }
    }

    /// Own-field lookup on a record value by string key.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.as_record()?.read().get(&RecordKey::from(name))
    }

    /// Insert an own field on a record value. Returns whether the value was a
    /// record.
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        match self.as_record() {
            Some(rec) => {
                rec.write().insert(RecordKey::from(name), value);
                true
            }
            None => false,
        }
    }
}

/// SameValueZero: NaN equals NaN, +0 equals -0; strings and scalars by value,
/// symbols and composites by identity.
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => (x.is_nan() && y.is_nan()) || x == y,
        (Value::String(x), Value::String(y)) => x == y,
        _ => match (a.identity(), b.identity()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Strict equality: like [`same_value_zero`] except `NaN != NaN`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Value::Number(x), Value::Number(y)) = (self, other) {
            return x == y;
        }
        same_value_zero(self, other)
    }
}

/// Render a number the way path keys and displays expect: integral values
/// without a trailing `.0`, shortest round-trip form otherwise.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        let mut buf = itoa::Buffer::new();
        return buf.format(n as i64).to_owned();
    }
    let mut buf = ryu::Buffer::new();
    buf.format(n).to_owned()
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(s) => write!(f, "{s:?}"),
            Value::Array(a) => write!(f, "[Array({})]", a.read().len()),
            Value::Record(r) => write!(f, "[Record({})]", r.read().len()),
            Value::Map(m) => write!(f, "[Map({})]", m.read().len()),
            Value::Set(s) => write!(f, "[Set({})]", s.read().len()),
            Value::Date(d) => write!(f, "[Date({})]", number_to_string(d.read().millis())),
            Value::RegExp(r) => write!(f, "{}", r.to_pattern_string()),
            Value::TypedBuffer(t) => {
                let t = t.read();
                write!(f, "[{}Array({})]", t.kind().name(), t.len())
            }
            Value::ArrayBuffer(b) => write!(f, "[ArrayBuffer({})]", b.read().byte_length()),
            Value::DataView(v) => write!(f, "[DataView({})]", v.read().byte_length()),
            Value::Boxed(b) => write!(f, "[{} (boxed)]", b.class_name()),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Error(e) => {
                let e = e.read();
                write!(f, "[{}: {}]", e.name, e.message)
            }
            Value::WeakMap(w) => write!(f, "[WeakMap({})]", w.read().len()),
            Value::Other(o) => write!(f, "{o:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_value_has_exactly_one_kind() {
        assert_eq!(Value::undefined().kind(), Kind::Undefined);
        assert_eq!(Value::null().kind(), Kind::Null);
        assert_eq!(Value::number(1.0).kind(), Kind::Number);
        assert_eq!(Value::string("x").kind(), Kind::String);
        assert_eq!(Value::empty_array().kind(), Kind::Array);
        assert_eq!(Value::empty_record().kind(), Kind::Record);
        assert_eq!(Value::regexp("a", "").kind(), Kind::RegExp);
        assert_eq!(Value::boxed_number(1.0).kind(), Kind::Boxed);
        assert_eq!(Value::other(42u32).kind(), Kind::Other);
    }

    #[test]
    fn scalars_have_no_identity_and_composites_do() {
        assert!(Value::number(1.0).identity().is_none());
        assert!(Value::string("x").identity().is_none());

        let arr = Value::empty_array();
        let alias = arr.clone();
        assert_eq!(arr.identity(), alias.identity());
        assert_ne!(arr.identity(), Value::empty_array().identity());
    }

    #[test]
    fn same_value_zero_semantics() {
        assert!(same_value_zero(
            &Value::number(f64::NAN),
            &Value::number(f64::NAN)
        ));
        assert!(same_value_zero(&Value::number(0.0), &Value::number(-0.0)));
        assert!(same_value_zero(&Value::string("a"), &Value::string("a")));
        assert!(!same_value_zero(&Value::number(1.0), &Value::string("1")));

        let rec = Value::empty_record();
        assert!(same_value_zero(&rec, &rec.clone()));
        assert!(!same_value_zero(&rec, &Value::empty_record()));
    }

    #[test]
    fn strict_eq_rejects_nan() {
        assert_ne!(Value::number(f64::NAN), Value::number(f64::NAN));
        assert_eq!(Value::number(0.0), Value::number(-0.0));
    }

    #[test]
    fn number_rendering() {
        assert_eq!(number_to_string(42.0), "42");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn values_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
    }
}
