//! # Tangle Engine
//!
//! The structural object engine: tag-dispatched deep clone, deep equality,
//! and deep merge over the `tangle-value` model, plus guarded path
//! addressing.
//!
//! Every top-level call owns its identity cache and discards it on return;
//! the engine keeps no global state and is freely reentrant. The engines
//! never panic on malformed input: type mismatches, absent keys, and guarded
//! path writes come back as ordinary `false`/`None`/no-op results, and the
//! single error condition — exhausting the recursion depth budget on
//! pathologically deep acyclic input — is a distinguishable
//! [`EngineError::DepthLimitExceeded`].

#![warn(clippy::all)]

pub mod cache;
pub mod clone;
pub mod equal;
pub mod error;
pub mod merge;
pub mod path;

pub use cache::{IdentityCache, PROMOTION_THRESHOLD};
pub use clone::{CloneCustomizer, CloneOptions, Cloner, clone, clone_deep, clone_deep_with};
pub use equal::{Equality, eq_values, is_equal};
pub use error::{DEFAULT_DEPTH_LIMIT, EngineError, EngineResult};
pub use merge::{MergeCustomizer, Merger, defaults, defaults_deep, merge, merge_with};
pub use path::{Path, PathKey, get_by_path, has_path, set_by_path, unset_by_path};
