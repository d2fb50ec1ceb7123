pub mod error;
pub mod field_value;
pub mod ids;
pub mod normalize;
pub mod rows;
pub mod snapshot;
pub mod validate;

pub use error::CoreError;
pub use field_value::{BoundValue, ColumnType, FieldValue};
pub use ids::*;
pub use rows::*;
pub use snapshot::SnapshotDocument;
pub use validate::validate_snapshot;
