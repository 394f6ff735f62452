use serde::Serialize;

use crate::stores::{parse_decimal, StoreError};
use crate::DbPool;

/// Starter dataset for demos and local development: a handful of everyday
/// categories with one budget line each, no actuals.
const DEMO_CATEGORIES: &[DemoCategory] = &[
    DemoCategory {
        name: "Groceries",
        color: "#4caf50",
        lines: &[("Weekly shop", "200.00"), ("Farmers market", "40.00")],
    },
    DemoCategory {
        name: "Utilities",
        color: "#2196f3",
        lines: &[("Electricity", "75.00"), ("Internet", "45.00")],
    },
    DemoCategory { name: "Transport", color: "#ff9800", lines: &[("Fuel", "120.00")] },
    DemoCategory { name: "Leisure", color: "#9c27b0", lines: &[("Streaming", "15.00")] },
];

#[derive(Debug, Clone, Copy)]
struct DemoCategory {
    name: &'static str,
    color: &'static str,
    lines: &'static [(&'static str, &'static str)],
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SeedReport {
    pub month_id: i64,
    pub categories_created: u32,
    pub lines_created: u32,
}

/// Seeds the demo dataset into the given month. Safe to run repeatedly:
/// categories are matched by name and lines by (category, label), so a second
/// pass creates nothing.
pub async fn apply_demo_dataset(pool: &DbPool, month_id: i64) -> Result<SeedReport, StoreError> {
    let month_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM months WHERE id = ?")
        .bind(month_id)
        .fetch_one(pool)
        .await?;
    if month_exists == 0 {
        return Err(StoreError::NotFound { entity: "month", id: month_id });
    }

    let mut report = SeedReport { month_id, categories_created: 0, lines_created: 0 };

    for category in DEMO_CATEGORIES {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE name = ?")
            .bind(category.name)
            .fetch_optional(pool)
            .await?;

        let category_id = match existing {
            Some(id) => id,
            None => {
                let result = sqlx::query("INSERT INTO categories (name, color) VALUES (?, ?)")
                    .bind(category.name)
                    .bind(category.color)
                    .execute(pool)
                    .await?;
                report.categories_created += 1;
                result.last_insert_rowid()
            }
        };

        for (label, expected) in category.lines {
            let already_present: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM budget_lines
                 WHERE month_id = ? AND category_id = ? AND label = ?",
            )
            .bind(month_id)
            .bind(category_id)
            .bind(label)
            .fetch_one(pool)
            .await?;
            if already_present > 0 {
                continue;
            }

            let amount = parse_decimal("expected", expected)?;
            sqlx::query(
                "INSERT INTO budget_lines (month_id, category_id, label, expected)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(month_id)
            .bind(category_id)
            .bind(label)
            .bind(amount.to_string())
            .execute(pool)
            .await?;
            report.lines_created += 1;
        }
    }

    Ok(report)
}
