pub mod fixtures;
pub mod store;

pub use fixtures::{SnapshotBuilder, snapshot};
pub use store::TestStore;
