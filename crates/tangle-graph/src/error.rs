//! Graph-layer error types.

use tangle_engine::EngineError;
use tangle_value::{JsonError, Kind};
use thiserror::Error;

/// Errors from cell adoption, cloning, and serialization.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A cell must be backed by a record.
    #[error("a cell must be a record, got {kind}")]
    NotARecord {
        /// The kind that was supplied instead.
        kind: Kind,
    },

    /// A cell record must carry a string `id`.
    #[error("cell record has no string `id` field")]
    MissingId,

    /// A cell document must hold a `cells` array.
    #[error("cell document has no `cells` array")]
    MissingCells,

    /// Structural engine failure (depth exhaustion).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// JSON lowering failure.
    #[error(transparent)]
    Json(#[from] JsonError),
}
