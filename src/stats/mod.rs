pub mod models;
pub mod store;

pub use models::{FetchOutcome, PlayerStats, Snapshot, StatValue};
pub use store::SnapshotStore;
