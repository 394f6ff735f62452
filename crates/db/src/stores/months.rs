use chrono::Utc;
use monthbook_core::{build_dashboard, Month, MonthState};
use sqlx::{sqlite::SqliteRow, Row};

use super::ledger::ledger_rows;
use super::StoreError;
use crate::DbPool;

/// What a successful finalize left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub month_id: i64,
    pub new_month_id: i64,
    pub snapshot_id: i64,
    pub carried_lines: u64,
}

/// Month lifecycle: seeding the very first period, looking up the working
/// month, and the finalize turnover.
pub struct MonthStore {
    pool: DbPool,
}

impl MonthStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Month, StoreError> {
        let row = sqlx::query("SELECT id, year, month, finalized FROM months WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "month", id })?;

        month_from_row(&row)
    }

    /// The newest month still open, which is where new bookings land.
    pub async fn latest_open(&self) -> Result<Option<Month>, StoreError> {
        let row = sqlx::query(
            "SELECT id, year, month, finalized FROM months
             WHERE finalized = 0
             ORDER BY year DESC, month DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(month_from_row).transpose()
    }

    /// Creates the given period only when the table is still empty, so a
    /// fresh install starts with exactly one open month. Returns `None` once
    /// any month exists.
    pub async fn seed_initial(&self, year: i32, month: u32) -> Result<Option<Month>, StoreError> {
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM months").fetch_one(&self.pool).await?;
        if existing > 0 {
            return Ok(None);
        }

        let result = sqlx::query("INSERT INTO months (year, month, finalized) VALUES (?, ?, 0)")
            .bind(year)
            .bind(month)
            .execute(&self.pool)
            .await?;

        Ok(Some(Month { id: result.last_insert_rowid(), year, month, state: MonthState::Open }))
    }

    /// Closes a month in one transaction: flip the latch, freeze the
    /// dashboard into an annual snapshot, open the successor period and carry
    /// every budget line into it with a blank actual.
    pub async fn finalize(&self, month_id: i64) -> Result<FinalizeOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id, year, month, finalized FROM months WHERE id = ?")
            .bind(month_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound { entity: "month", id: month_id })?;
        let mut month = month_from_row(&row)?;

        if month.transition_to(MonthState::Finalized).is_err() {
            return Err(StoreError::AlreadyFinalized { month_id });
        }

        // Only one caller can flip the latch; a concurrent finalize sees zero
        // rows here and bails.
        let claimed = sqlx::query("UPDATE months SET finalized = 1 WHERE id = ? AND finalized = 0")
            .bind(month_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(StoreError::AlreadyFinalized { month_id });
        }

        let rows = ledger_rows(&mut *tx, month_id).await?;
        let payload = build_dashboard(&month, &rows);
        let snap_json = serde_json::to_string(&payload)
            .map_err(|err| StoreError::Decode(format!("encode snapshot payload: {err}")))?;

        let snap = sqlx::query(
            "INSERT INTO annual_snaps (month_id, year, month, month_name, snap_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(month_id)
        .bind(month.year)
        .bind(month.month)
        .bind(month.name())
        .bind(&snap_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        let snapshot_id = snap.last_insert_rowid();

        let (next_year, next_month) = month.successor();
        let successor = sqlx::query(
            "INSERT INTO months (year, month, finalized) VALUES (?, ?, 0)
             ON CONFLICT (year, month) DO NOTHING",
        )
        .bind(next_year)
        .bind(next_month)
        .execute(&mut *tx)
        .await?;
        let new_month_id: i64 =
            sqlx::query_scalar("SELECT id FROM months WHERE year = ? AND month = ?")
                .bind(next_year)
                .bind(next_month)
                .fetch_one(&mut *tx)
                .await?;

        // A successor that somehow already exists keeps its own ledger.
        let carried_lines = if successor.rows_affected() == 1 {
            let carried = sqlx::query(
                "INSERT INTO budget_lines (month_id, category_id, label, expected)
                 SELECT ?, category_id, label, expected
                 FROM budget_lines
                 WHERE month_id = ?
                 ORDER BY id ASC",
            )
            .bind(new_month_id)
            .bind(month_id)
            .execute(&mut *tx)
            .await?;
            carried.rows_affected()
        } else {
            0
        };

        tx.commit().await?;

        Ok(FinalizeOutcome { month_id, new_month_id, snapshot_id, carried_lines })
    }
}

fn month_from_row(row: &SqliteRow) -> Result<Month, StoreError> {
    let finalized: bool = row.try_get("finalized")?;

    Ok(Month {
        id: row.try_get("id")?,
        year: row.try_get("year")?,
        month: row.try_get("month")?,
        state: if finalized { MonthState::Finalized } else { MonthState::Open },
    })
}
