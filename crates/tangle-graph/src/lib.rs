//! # Tangle Graph
//!
//! The cell-graph collaborator on top of the structural engine: record-backed
//! cells with slash-path attributes, explicit id generation, the
//! clone-then-remap protocol for duplicating connected subgraphs, and JSON
//! import/export of cell sets.

#![warn(clippy::all)]

pub mod cell;
pub mod error;
pub mod graph;
pub mod id;

pub use cell::Cell;
pub use error::GraphError;
pub use graph::{CloneMap, cells_from_json, cells_to_json, clone_cells};
pub use id::IdGenerator;
