//! Error values.
//!
//! Error is an opaque kind for the clone engine (the reference passes
//! through), but equality compares the `name` and `message` fields.

/// Backing data of an error value.
#[derive(Debug, Clone)]
pub struct ErrorData {
    /// Error class name, e.g. `"TypeError"`.
    pub name: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorData {
    /// Create an error value datum.
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            message: message.to_owned(),
        }
    }
}
