use std::str::FromStr;

use monthbook_core::DomainError;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod categories;
pub mod ledger;
pub mod months;
pub mod snapshots;

pub use categories::CategoryStore;
pub use ledger::LedgerStore;
pub use months::{FinalizeOutcome, MonthStore};
pub use snapshots::{SnapshotStore, SnapshotSummary};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} {id} was not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{entity} {id} does not exist")]
    InvalidReference { entity: &'static str, id: i64 },
    #[error("month {month_id} is finalized and can no longer be edited")]
    MonthFinalized { month_id: i64 },
    #[error("month {month_id} is already finalized")]
    AlreadyFinalized { month_id: i64 },
    #[error("category {category_id} is referenced by {line_count} budget line(s)")]
    CategoryInUse { category_id: i64, line_count: i64 },
}

pub(crate) fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(value)
        .map_err(|error| StoreError::Decode(format!("invalid decimal value for {field}: {error}")))
}
