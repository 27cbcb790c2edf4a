//! # Tangle Value
//!
//! The closed value model underneath the Tangle structural engine: a `Value`
//! handle classified into a fixed set of [`Kind`]s, with scalars inline and
//! composites behind shared, identity-bearing storage.
//!
//! ## Design Principles
//!
//! - **Closed classification**: every value has exactly one `Kind`, matched
//!   exhaustively by the engine; unknown host types land in `Kind::Other`
//!   instead of a silent fallback path.
//! - **Identity vs. structure**: composite handles alias shared storage and
//!   expose a stable identity, distinct from structural equality.
//! - **Thread-safe**: values are `Send + Sync`; composite storage sits
//!   behind `Arc` + `parking_lot` locks, and snapshot accessors release the
//!   lock before callers recurse.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod array_buffer;
pub mod boxed;
pub mod data_view;
pub mod date;
pub mod error_data;
pub mod function;
pub mod json;
pub mod map_data;
pub mod record;
pub mod regexp;
pub mod shared;
pub mod symbol;
pub mod typed_buffer;
pub mod value;
pub mod weak_map;

pub use array_buffer::{ArrayBufferData, BufferError};
pub use boxed::BoxedScalar;
pub use data_view::DataViewData;
pub use date::DateData;
pub use error_data::ErrorData;
pub use function::{FunctionValue, NativeFn};
pub use json::{JsonError, from_json, to_json};
pub use map_data::{MapData, MapKey, SetData};
pub use record::{RecordData, RecordKey};
pub use regexp::RegexData;
pub use shared::Shared;
pub use symbol::SymbolValue;
pub use typed_buffer::{ElementKind, TypedBufferData};
pub use value::{Kind, OtherValue, Value, number_to_string, same_value_zero};
pub use weak_map::WeakMapData;
