pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod stores;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{apply_demo_dataset, SeedReport};
pub use stores::{
    CategoryStore, FinalizeOutcome, LedgerStore, MonthStore, SnapshotStore, SnapshotSummary,
    StoreError,
};
