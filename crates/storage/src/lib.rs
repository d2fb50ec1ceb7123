pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod upsert;

pub use catalog::Table;
pub use descriptor::SchemaDescriptor;
pub use error::StorageError;
pub use sqlite::{SqliteStore, SqliteWriter, StoreOptions};
pub use traits::*;
pub use upsert::{RowWrite, UpsertMode};

pub use rusqlite;
