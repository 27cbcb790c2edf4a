//! Path addressing: parse dotted/bracketed/delimited path expressions into
//! key sequences and perform guarded get/set/unset/has traversal.
//!
//! The guard refuses to traverse or write through `__proto__`, and through
//! `constructor` when the value stored there is callable — at every segment,
//! including the last. Guarded writes are whole-call no-ops; nothing throws.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tangle_value::{RecordKey, Value};

/// One step of a path: an array index or a field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    /// Positional index.
    Index(usize),
    /// Field name.
    Key(Arc<str>),
}

impl PathKey {
    /// A field-name key.
    pub fn key(name: &str) -> Self {
        PathKey::Key(Arc::from(name))
    }

    /// An index key.
    pub fn index(i: usize) -> Self {
        PathKey::Index(i)
    }

    /// The field name, for `Key` keys.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PathKey::Key(s) => Some(s),
            PathKey::Index(_) => None,
        }
    }

    fn from_segment(segment: &str) -> Self {
        match parse_index(segment) {
            Some(i) => PathKey::Index(i),
            None => PathKey::key(segment),
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "{i}"),
            PathKey::Key(s) => f.write_str(s),
        }
    }
}

/// A canonical index segment: `0`, or digits without a leading zero.
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// An ordered key sequence. The empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    keys: SmallVec<[PathKey; 8]>,
}

impl Path {
    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path expression.
    ///
    /// For any delimiter other than `'.'` the expression is split on the
    /// delimiter (`"attrs/rect/fill"` with `'/'`), numeric segments becoming
    /// indexes. The `'.'` delimiter additionally understands bracket
    /// segments: `a[0]`, `a['b c']`, `a["x\"y"]`.
    pub fn parse(expr: &str, delimiter: char) -> Self {
        if delimiter == '.' {
            parse_dotted(expr)
        } else {
            expr.split(delimiter).map(PathKey::from_segment).collect()
        }
    }

    /// The key sequence.
    pub fn keys(&self) -> &[PathKey] {
        &self.keys
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Append a key.
    pub fn push(&mut self, key: PathKey) {
        self.keys.push(key);
    }
}

impl FromIterator<PathKey> for Path {
    fn from_iter<I: IntoIterator<Item = PathKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

fn parse_dotted(expr: &str) -> Path {
    let chars: Vec<char> = expr.chars().collect();
    let mut keys: SmallVec<[PathKey; 8]> = SmallVec::new();
    let mut pending = String::new();
    let mut after_bracket = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if !(after_bracket && pending.is_empty()) {
                    keys.push(PathKey::from_segment(&pending));
                }
                pending.clear();
                after_bracket = false;
                i += 1;
            }
            '[' => {
                if !pending.is_empty() {
                    keys.push(PathKey::from_segment(&pending));
                    pending.clear();
                }
                i = parse_bracket(&chars, i + 1, &mut keys);
                after_bracket = true;
            }
            c => {
                pending.push(c);
                after_bracket = false;
                i += 1;
            }
        }
    }
    if !pending.is_empty() {
        keys.push(PathKey::from_segment(&pending));
    } else if expr.ends_with('.') {
        keys.push(PathKey::key(""));
    }
    Path { keys }
}

/// Parse one bracket segment starting just past `[`; returns the position
/// just past the closing `]`.
fn parse_bracket(chars: &[char], start: usize, keys: &mut SmallVec<[PathKey; 8]>) -> usize {
    let mut i = start;
    if let Some(quote @ ('\'' | '"')) = chars.get(i).copied() {
        let mut name = String::new();
        i += 1;
        while i < chars.len() && chars[i] != quote {
            if chars[i] == '\\' && i + 1 < chars.len() {
                name.push(chars[i + 1]);
                i += 2;
            } else {
                name.push(chars[i]);
                i += 1;
            }
        }
        // Quoted names are always field names, even when numeric.
        keys.push(PathKey::key(&name));
        while i < chars.len() && chars[i] != ']' {
            i += 1;
        }
        return (i + 1).min(chars.len());
    }

    let mut raw = String::new();
    while i < chars.len() && chars[i] != ']' {
        raw.push(chars[i]);
        i += 1;
    }
    keys.push(PathKey::from_segment(raw.trim()));
    (i + 1).min(chars.len())
}

pub(crate) fn to_record_key(key: &PathKey) -> RecordKey {
    match key {
        PathKey::Index(i) => RecordKey::from(i.to_string()),
        PathKey::Key(s) => RecordKey::Str(s.clone()),
    }
}

/// Whether traversing `current` through `key` is allowed by the
/// prototype-pollution guard.
fn is_safe_step(current: &Value, key: &PathKey) -> bool {
    let Some(name) = key.as_str() else {
        return true;
    };
    if name == "__proto__" {
        return false;
    }
    if name == "constructor" {
        return !matches!(step(current, key), Some(Value::Function(_)));
    }
    true
}

/// One traversal step; `None` when the key is absent or the value is not
/// indexable.
fn step(current: &Value, key: &PathKey) -> Option<Value> {
    match (current, key) {
        (Value::Array(arr), PathKey::Index(i)) => arr.read().get(*i).cloned(),
        (Value::Array(arr), PathKey::Key(k)) => {
            let i = parse_index(k)?;
            arr.read().get(i).cloned()
        }
        (Value::Record(rec), key) => rec.read().get_in(&to_record_key(key)),
        _ => None,
    }
}

/// Whether `current` owns `key` (no prototype chain).
fn owns(current: &Value, key: &PathKey) -> bool {
    match (current, key) {
        (Value::Array(arr), PathKey::Index(i)) => *i < arr.read().len(),
        (Value::Array(arr), PathKey::Key(k)) => {
            parse_index(k).is_some_and(|i| i < arr.read().len())
        }
        (Value::Record(rec), key) => rec.read().contains_key(&to_record_key(key)),
        _ => false,
    }
}

/// Write `value` at `key` on a container. Returns whether a write happened.
/// Array writes past the end pad the gap with `Undefined`.
pub(crate) fn write_key(container: &Value, key: &PathKey, value: Value) -> bool {
    match (container, key) {
        (Value::Array(arr), PathKey::Index(i)) => {
            let mut elements = arr.write();
            while elements.len() <= *i {
                elements.push(Value::Undefined);
            }
            elements[*i] = value;
            true
        }
        (Value::Array(arr), PathKey::Key(k)) => match parse_index(k) {
            Some(i) => write_key(&Value::Array(arr.clone()), &PathKey::Index(i), value),
            None => false,
        },
        (Value::Record(rec), key) => {
            rec.write().insert(to_record_key(key), value);
            true
        }
        _ => false,
    }
}

/// Read the value at `path`. Missing segments and non-indexable intermediates
/// yield `None`; a present `Null`/`Undefined` leaf is still returned.
pub fn get_by_path(root: &Value, path: &Path) -> Option<Value> {
    let mut current = root.clone();
    for key in path.keys() {
        if !is_safe_step(&current, key) {
            return None;
        }
        current = step(&current, key)?;
    }
    Some(current)
}

/// Whether every segment of `path` passes the pollution guard against the
/// values currently reachable from `root`. Segments past the first absent key
/// would traverse fresh records, which can never store a callable, so only
/// the `__proto__` check applies there.
fn path_is_safe(root: &Value, path: &Path) -> bool {
    let mut current = Some(root.clone());
    for key in path.keys() {
        match &current {
            Some(value) => {
                if !is_safe_step(value, key) {
                    return false;
                }
            }
            None => {
                if key.as_str() == Some("__proto__") {
                    return false;
                }
            }
        }
        current = current.and_then(|value| step(&value, key));
    }
    true
}

/// Write `value` at `path`, creating intermediate records for absent keys.
/// The whole call is a no-op returning `root` unchanged when any segment is
/// guarded, when the root is not a container, or when an intermediate cannot
/// be created (e.g. a non-index key on an array). The guard is validated
/// before anything is written, so a rejected call leaves no partial
/// intermediates behind.
pub fn set_by_path(root: &Value, path: &Path, value: Value) -> Value {
    if path.is_empty()
        || !matches!(root, Value::Array(_) | Value::Record(_))
        || !path_is_safe(root, path)
    {
        return root.clone();
    }
    let mut current = root.clone();
    let last = path.len() - 1;
    for (at, key) in path.keys().iter().enumerate() {
        if at == last {
            write_key(&current, key, value);
            break;
        }
        match step(&current, key) {
            Some(next @ (Value::Array(_) | Value::Record(_))) => current = next,
            _ => {
                let fresh = Value::empty_record();
                if !write_key(&current, key, fresh.clone()) {
                    return root.clone();
                }
                current = fresh;
            }
        }
    }
    root.clone()
}

/// Delete the value at `path`. Returns whether a deletion occurred. Array
/// elements are overwritten with `Undefined` (arrays stay dense). Guarded
/// segments make the whole call a no-op.
pub fn unset_by_path(root: &Value, path: &Path) -> bool {
    if path.is_empty() {
        return false;
    }
    let mut current = root.clone();
    let last = path.len() - 1;
    for (at, key) in path.keys().iter().enumerate() {
        if !is_safe_step(&current, key) {
            return false;
        }
        if at == last {
            return match (&current, key) {
                (Value::Record(rec), key) => rec.write().remove(&to_record_key(key)).is_some(),
                (Value::Array(arr), PathKey::Index(i)) => {
                    let mut elements = arr.write();
                    match elements.get_mut(*i) {
                        Some(slot) => {
                            *slot = Value::Undefined;
                            true
                        }
                        None => false,
                    }
                }
                _ => false,
            };
        }
        current = match step(&current, key) {
            Some(next) => next,
            None => return false,
        };
    }
    false
}

/// Whether every segment of `path` is an own key of its container. A leaf
/// holding `Null`/`Undefined` still counts as present.
pub fn has_path(root: &Value, path: &Path) -> bool {
    let mut current = root.clone();
    for key in path.keys() {
        if !is_safe_step(&current, key) || !owns(&current, key) {
            return false;
        }
        current = match step(&current, key) {
            Some(next) => next,
            None => return false,
        };
    }
    true
}
