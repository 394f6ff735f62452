use monthbook_core::{normalize_amount, require_text, ActualLine, BudgetLine, LedgerRow};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use super::{parse_decimal, StoreError};
use crate::DbPool;

/// Budget and actual lines for open months. Every mutation checks the owning
/// month's latch first; a finalized month's ledger is read-only.
pub struct LedgerStore {
    pool: DbPool,
}

impl LedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Lines for one month joined with category and actual, ordered by line
    /// id. Unknown months simply yield an empty list.
    pub async fn list_for_month(&self, month_id: i64) -> Result<Vec<LedgerRow>, StoreError> {
        ledger_rows(&self.pool, month_id).await
    }

    pub async fn create_line(
        &self,
        month_id: i64,
        category_id: i64,
        label: &str,
        expected: Decimal,
    ) -> Result<BudgetLine, StoreError> {
        let label = require_text("label", label)?;
        let expected = normalize_amount("expected", expected)?;

        guard_open_month(&self.pool, month_id).await?;

        let known_category: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;
        if known_category == 0 {
            return Err(StoreError::InvalidReference { entity: "category", id: category_id });
        }

        let result = sqlx::query(
            "INSERT INTO budget_lines (month_id, category_id, label, expected)
             VALUES (?, ?, ?, ?)",
        )
        .bind(month_id)
        .bind(category_id)
        .bind(&label)
        .bind(expected.to_string())
        .execute(&self.pool)
        .await?;

        Ok(BudgetLine { id: result.last_insert_rowid(), month_id, category_id, label, expected })
    }

    pub async fn update_line(
        &self,
        id: i64,
        label: Option<&str>,
        expected: Option<Decimal>,
    ) -> Result<BudgetLine, StoreError> {
        let mut line = self.line_in_open_month(id).await?;

        if let Some(label) = label {
            line.label = require_text("label", label)?;
        }
        if let Some(expected) = expected {
            line.expected = normalize_amount("expected", expected)?;
        }

        sqlx::query("UPDATE budget_lines SET label = ?, expected = ? WHERE id = ?")
            .bind(&line.label)
            .bind(line.expected.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(line)
    }

    pub async fn delete_line(&self, id: i64) -> Result<(), StoreError> {
        self.line_in_open_month(id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM actual_lines WHERE budget_line_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM budget_lines WHERE id = ?").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Upsert keyed by budget line: the first recorded actual creates the
    /// row, later calls overwrite it in place.
    pub async fn set_actual(
        &self,
        budget_line_id: i64,
        actual: Decimal,
    ) -> Result<ActualLine, StoreError> {
        let actual = normalize_amount("actual", actual)?;
        self.line_in_open_month(budget_line_id).await?;

        sqlx::query(
            "INSERT INTO actual_lines (budget_line_id, actual) VALUES (?, ?)
             ON CONFLICT (budget_line_id) DO UPDATE SET actual = excluded.actual",
        )
        .bind(budget_line_id)
        .bind(actual.to_string())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT id, budget_line_id, CAST(actual AS TEXT) AS actual_text
             FROM actual_lines WHERE budget_line_id = ?",
        )
        .bind(budget_line_id)
        .fetch_one(&self.pool)
        .await?;

        let actual_text: String = row.try_get("actual_text")?;
        Ok(ActualLine {
            id: row.try_get("id")?,
            budget_line_id: row.try_get("budget_line_id")?,
            actual: parse_decimal("actual", &actual_text)?,
        })
    }

    async fn line_in_open_month(&self, id: i64) -> Result<BudgetLine, StoreError> {
        let row = sqlx::query(
            "SELECT
                bl.id,
                bl.month_id,
                bl.category_id,
                bl.label,
                CAST(bl.expected AS TEXT) AS expected_text,
                m.finalized
             FROM budget_lines bl
             JOIN months m ON m.id = bl.month_id
             WHERE bl.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { entity: "budget line", id })?;

        let month_id: i64 = row.try_get("month_id")?;
        let finalized: bool = row.try_get("finalized")?;
        if finalized {
            return Err(StoreError::MonthFinalized { month_id });
        }

        let expected_text: String = row.try_get("expected_text")?;
        Ok(BudgetLine {
            id: row.try_get("id")?,
            month_id,
            category_id: row.try_get("category_id")?,
            label: row.try_get("label")?,
            expected: parse_decimal("expected", &expected_text)?,
        })
    }
}

/// The month-scoped join every read path shares, usable both on the pool and
/// inside the finalize transaction.
pub(crate) async fn ledger_rows<'e, E>(
    executor: E,
    month_id: i64,
) -> Result<Vec<LedgerRow>, StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query(
        "SELECT
            bl.id,
            bl.month_id,
            bl.category_id,
            bl.label,
            CAST(bl.expected AS TEXT) AS expected_text,
            c.name AS category_name,
            c.color AS category_color,
            CAST(COALESCE(al.actual, 0) AS TEXT) AS actual_text,
            al.id AS actual_id
         FROM budget_lines bl
         JOIN categories c ON c.id = bl.category_id
         LEFT JOIN actual_lines al ON al.budget_line_id = bl.id
         WHERE bl.month_id = ?
         ORDER BY bl.id ASC",
    )
    .bind(month_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(ledger_row_from_row).collect()
}

pub(crate) async fn guard_open_month(pool: &DbPool, month_id: i64) -> Result<(), StoreError> {
    let finalized: Option<bool> = sqlx::query_scalar("SELECT finalized FROM months WHERE id = ?")
        .bind(month_id)
        .fetch_optional(pool)
        .await?;

    match finalized {
        None => Err(StoreError::NotFound { entity: "month", id: month_id }),
        Some(true) => Err(StoreError::MonthFinalized { month_id }),
        Some(false) => Ok(()),
    }
}

fn ledger_row_from_row(row: &SqliteRow) -> Result<LedgerRow, StoreError> {
    let expected_text: String = row.try_get("expected_text")?;
    let actual_text: String = row.try_get("actual_text")?;

    Ok(LedgerRow {
        id: row.try_get("id")?,
        month_id: row.try_get("month_id")?,
        category_id: row.try_get("category_id")?,
        label: row.try_get("label")?,
        expected: parse_decimal("expected", &expected_text)?,
        category_name: row.try_get("category_name")?,
        category_color: row.try_get("category_color")?,
        actual_amount: parse_decimal("actual", &actual_text)?,
        actual_id: row.try_get("actual_id")?,
    })
}

#[cfg(test)]
mod tests {
    use monthbook_core::DomainError;
    use rust_decimal::Decimal;

    use super::LedgerStore;
    use crate::{connect_with_settings, migrations, DbPool, StoreError};

    async fn setup_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn seed_month(pool: &DbPool, year: i32, month: u32, finalized: bool) -> i64 {
        sqlx::query("INSERT INTO months (year, month, finalized) VALUES (?, ?, ?)")
            .bind(year)
            .bind(month)
            .bind(finalized)
            .execute(pool)
            .await
            .expect("insert month")
            .last_insert_rowid()
    }

    async fn seed_category(pool: &DbPool, name: &str, color: &str) -> i64 {
        sqlx::query("INSERT INTO categories (name, color) VALUES (?, ?)")
            .bind(name)
            .bind(color)
            .execute(pool)
            .await
            .expect("insert category")
            .last_insert_rowid()
    }

    fn cents(value: i64) -> Decimal {
        Decimal::new(value, 2)
    }

    #[tokio::test]
    async fn create_line_persists_normalized_amount() {
        let pool = setup_pool().await;
        let store = LedgerStore::new(pool.clone());
        let month_id = seed_month(&pool, 2024, 3, false).await;
        let category_id = seed_category(&pool, "Groceries", "#4caf50").await;

        let line = store
            .create_line(month_id, category_id, "  Weekly shop ", Decimal::new(200005, 3))
            .await
            .expect("create line");

        assert_eq!(line.label, "Weekly shop");
        assert_eq!(line.expected, cents(20001));
        assert_eq!(line.month_id, month_id);

        let stored: String =
            sqlx::query_scalar("SELECT CAST(expected AS TEXT) FROM budget_lines WHERE id = ?")
                .bind(line.id)
                .fetch_one(&pool)
                .await
                .expect("read back");
        assert_eq!(stored, "200.01");

        pool.close().await;
    }

    #[tokio::test]
    async fn create_line_rejects_negative_and_unknown_refs() {
        let pool = setup_pool().await;
        let store = LedgerStore::new(pool.clone());
        let month_id = seed_month(&pool, 2024, 3, false).await;
        let category_id = seed_category(&pool, "Groceries", "#4caf50").await;

        let negative = store
            .create_line(month_id, category_id, "Weekly shop", cents(-100))
            .await
            .expect_err("negative expected");
        assert!(matches!(negative, StoreError::Domain(DomainError::NegativeAmount { .. })));

        let bad_category = store
            .create_line(month_id, 999, "Weekly shop", cents(100))
            .await
            .expect_err("unknown category");
        assert!(matches!(
            bad_category,
            StoreError::InvalidReference { entity: "category", id: 999 }
        ));

        let bad_month =
            store.create_line(999, category_id, "Weekly shop", cents(100)).await.expect_err(
                "unknown month",
            );
        assert!(matches!(bad_month, StoreError::NotFound { entity: "month", id: 999 }));

        pool.close().await;
    }

    #[tokio::test]
    async fn finalized_month_rejects_every_mutation() {
        let pool = setup_pool().await;
        let store = LedgerStore::new(pool.clone());
        let open_id = seed_month(&pool, 2024, 3, false).await;
        let closed_id = seed_month(&pool, 2024, 2, true).await;
        let category_id = seed_category(&pool, "Groceries", "#4caf50").await;

        let line = store
            .create_line(open_id, category_id, "Weekly shop", cents(20000))
            .await
            .expect("create in open month");

        let create = store
            .create_line(closed_id, category_id, "Weekly shop", cents(20000))
            .await
            .expect_err("create in closed month");
        assert!(matches!(create, StoreError::MonthFinalized { month_id } if month_id == closed_id));

        // Flip the open month and confirm line-keyed mutations are refused too.
        sqlx::query("UPDATE months SET finalized = 1 WHERE id = ?")
            .bind(open_id)
            .execute(&pool)
            .await
            .expect("flip month");

        let update = store.update_line(line.id, Some("Other"), None).await.expect_err("update");
        assert!(matches!(update, StoreError::MonthFinalized { .. }));

        let delete = store.delete_line(line.id).await.expect_err("delete");
        assert!(matches!(delete, StoreError::MonthFinalized { .. }));

        let actual = store.set_actual(line.id, cents(100)).await.expect_err("set actual");
        assert!(matches!(actual, StoreError::MonthFinalized { .. }));

        pool.close().await;
    }

    #[tokio::test]
    async fn update_line_merges_partial_fields() {
        let pool = setup_pool().await;
        let store = LedgerStore::new(pool.clone());
        let month_id = seed_month(&pool, 2024, 3, false).await;
        let category_id = seed_category(&pool, "Groceries", "#4caf50").await;

        let line = store
            .create_line(month_id, category_id, "Weekly shop", cents(20000))
            .await
            .expect("create");

        let relabeled =
            store.update_line(line.id, Some("Monthly shop"), None).await.expect("update label");
        assert_eq!(relabeled.label, "Monthly shop");
        assert_eq!(relabeled.expected, cents(20000));

        let repriced =
            store.update_line(line.id, None, Some(cents(25000))).await.expect("update expected");
        assert_eq!(repriced.label, "Monthly shop");
        assert_eq!(repriced.expected, cents(25000));

        let missing = store.update_line(999, Some("X"), None).await.expect_err("unknown line");
        assert!(matches!(missing, StoreError::NotFound { entity: "budget line", id: 999 }));

        pool.close().await;
    }

    #[tokio::test]
    async fn set_actual_creates_one_row_then_updates_in_place() {
        let pool = setup_pool().await;
        let store = LedgerStore::new(pool.clone());
        let month_id = seed_month(&pool, 2024, 3, false).await;
        let category_id = seed_category(&pool, "Groceries", "#4caf50").await;
        let line = store
            .create_line(month_id, category_id, "Weekly shop", cents(20000))
            .await
            .expect("create");

        let first = store.set_actual(line.id, cents(18550)).await.expect("first actual");
        assert_eq!(first.budget_line_id, line.id);
        assert_eq!(first.actual, cents(18550));

        let second = store.set_actual(line.id, cents(19025)).await.expect("second actual");
        assert_eq!(second.id, first.id, "upsert must update in place, not insert");
        assert_eq!(second.actual, cents(19025));

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM actual_lines WHERE budget_line_id = ?")
                .bind(line.id)
                .fetch_one(&pool)
                .await
                .expect("count actuals");
        assert_eq!(count, 1);

        let negative = store.set_actual(line.id, cents(-1)).await.expect_err("negative actual");
        assert!(matches!(negative, StoreError::Domain(DomainError::NegativeAmount { .. })));

        pool.close().await;
    }

    #[tokio::test]
    async fn list_for_month_joins_category_and_actual() {
        let pool = setup_pool().await;
        let store = LedgerStore::new(pool.clone());
        let month_id = seed_month(&pool, 2024, 3, false).await;
        let groceries = seed_category(&pool, "Groceries", "#4caf50").await;
        let utilities = seed_category(&pool, "Utilities", "#2196f3").await;

        let first = store
            .create_line(month_id, groceries, "Weekly shop", cents(20000))
            .await
            .expect("first line");
        let second =
            store.create_line(month_id, utilities, "Power", cents(7500)).await.expect("second");
        store.set_actual(first.id, cents(18550)).await.expect("actual");

        let rows = store.list_for_month(month_id).await.expect("list");
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].id, first.id);
        assert_eq!(rows[0].category_name, "Groceries");
        assert_eq!(rows[0].category_color, "#4caf50");
        assert_eq!(rows[0].actual_amount, cents(18550));
        assert!(rows[0].actual_id.is_some());

        assert_eq!(rows[1].id, second.id);
        assert_eq!(rows[1].actual_amount, Decimal::ZERO);
        assert_eq!(rows[1].actual_id, None);

        // Unknown month is an empty ledger, not an error.
        let empty = store.list_for_month(999).await.expect("unknown month");
        assert!(empty.is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn delete_line_removes_its_actual() {
        let pool = setup_pool().await;
        let store = LedgerStore::new(pool.clone());
        let month_id = seed_month(&pool, 2024, 3, false).await;
        let category_id = seed_category(&pool, "Groceries", "#4caf50").await;
        let line = store
            .create_line(month_id, category_id, "Weekly shop", cents(20000))
            .await
            .expect("create");
        store.set_actual(line.id, cents(18550)).await.expect("actual");

        store.delete_line(line.id).await.expect("delete");

        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM budget_lines")
            .fetch_one(&pool)
            .await
            .expect("count lines");
        let actuals: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actual_lines")
            .fetch_one(&pool)
            .await
            .expect("count actuals");
        assert_eq!(lines, 0);
        assert_eq!(actuals, 0);

        pool.close().await;
    }
}
