//! Symbol values.
//!
//! A symbol's primitive value is its identity: two symbols are equal exactly
//! when they are the same allocation, regardless of description.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct SymbolData {
    description: Option<String>,
}

/// An interned, identity-compared symbol.
#[derive(Clone)]
pub struct SymbolValue(Arc<SymbolData>);

impl SymbolValue {
    /// Create a fresh symbol. Every call produces a distinct symbol, even for
    /// equal descriptions.
    pub fn new(description: Option<&str>) -> Self {
        Self(Arc::new(SymbolData {
            description: description.map(str::to_owned),
        }))
    }

    /// The optional description.
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Stable identity of this symbol.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for SymbolValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SymbolValue {}

impl Hash for SymbolValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for SymbolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(desc) => write!(f, "Symbol({desc})"),
            None => write!(f, "Symbol()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_compare_by_identity() {
        let a = SymbolValue::new(Some("tag"));
        let b = SymbolValue::new(Some("tag"));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.description(), Some("tag"));
    }
}
