//! Engine error types.
//!
//! The engine is recoverable by construction: type mismatches, absent keys,
//! and guarded path writes are ordinary return values. The one caller-facing
//! failure mode is running out of recursion depth on pathologically deep,
//! acyclic input.

use thiserror::Error;

/// Depth budget applied to one top-level engine call unless overridden.
pub const DEFAULT_DEPTH_LIMIT: usize = 1024;

/// Structural engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The input value graph nests deeper than the per-call budget. Cyclic
    /// graphs never trip this; the identity cache closes them first.
    #[error("structural recursion exceeded the depth limit of {limit}")]
    DepthLimitExceeded {
        /// The limit that was in force.
        limit: usize,
    },
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
