//! Host callables.
//!
//! Function values are opaque to the structural engine: they are classified,
//! passed through by reference, and never cloned or compared structurally.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Signature of a native host function.
pub type NativeFn = dyn Fn(&[Value]) -> Value + Send + Sync;

struct FunctionData {
    name: Option<String>,
    func: Box<NativeFn>,
}

/// An opaque, identity-compared host callable.
#[derive(Clone)]
pub struct FunctionValue(Arc<FunctionData>);

impl FunctionValue {
    /// Wrap a host closure as a function value.
    pub fn new<F>(name: Option<&str>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(FunctionData {
            name: name.map(str::to_owned),
            func: Box::new(func),
        }))
    }

    /// The function's name, if any.
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Invoke the callable.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0.func)(args)
    }

    /// Stable identity of this callable.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "[Function: {name}]"),
            None => write!(f, "[Function (anonymous)]"),
        }
    }
}
