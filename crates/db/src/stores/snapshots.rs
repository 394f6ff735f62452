use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row};

use super::StoreError;
use crate::DbPool;

/// Listing row for the annual review; the payload itself stays in the
/// database until a single snapshot is opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub id: i64,
    pub month_id: i64,
    pub year: i32,
    #[serde(rename = "month")]
    pub month_name: String,
    pub snap_created_at: String,
}

/// Read-only access to annual snapshots. Rows are written exclusively by the
/// finalize transaction.
pub struct SnapshotStore {
    pool: DbPool,
}

impl SnapshotStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Snapshots for one calendar year in month order, whatever the order
    /// they were finalized in.
    pub async fn list_by_year(&self, year: i32) -> Result<Vec<SnapshotSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, month_id, year, month_name, created_at
             FROM annual_snaps
             WHERE year = ?
             ORDER BY month ASC",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_summary_from_row).collect()
    }

    /// The frozen dashboard payload exactly as it was stored, so the annual
    /// review replays history instead of recomputing it.
    pub async fn get_detail(&self, id: i64) -> Result<String, StoreError> {
        let snap_json: Option<String> =
            sqlx::query_scalar("SELECT snap_json FROM annual_snaps WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        snap_json.ok_or(StoreError::NotFound { entity: "snapshot", id })
    }
}

fn snapshot_summary_from_row(row: &SqliteRow) -> Result<SnapshotSummary, StoreError> {
    Ok(SnapshotSummary {
        id: row.try_get("id")?,
        month_id: row.try_get("month_id")?,
        year: row.try_get("year")?,
        month_name: row.try_get("month_name")?,
        snap_created_at: row.try_get("created_at")?,
    })
}
