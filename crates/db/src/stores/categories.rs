use monthbook_core::{require_text, Category};
use sqlx::{sqlite::SqliteRow, Row};

use super::StoreError;
use crate::DbPool;

/// CRUD over spending categories. Deletion is restricted: a category that
/// any budget line still references, in any month, cannot be removed.
pub struct CategoryStore {
    pool: DbPool,
}

impl CategoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name, color FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(category_from_row).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Category, StoreError> {
        let row = sqlx::query("SELECT id, name, color FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { entity: "category", id })?;

        category_from_row(&row)
    }

    pub async fn create(&self, name: &str, color: &str) -> Result<Category, StoreError> {
        let name = require_text("name", name)?;
        let color = require_text("color", color)?;

        let result = sqlx::query("INSERT INTO categories (name, color) VALUES (?, ?)")
            .bind(&name)
            .bind(&color)
            .execute(&self.pool)
            .await?;

        Ok(Category { id: result.last_insert_rowid(), name, color })
    }

    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Category, StoreError> {
        let mut category = self.get(id).await?;

        if let Some(name) = name {
            category.name = require_text("name", name)?;
        }
        if let Some(color) = color {
            category.color = require_text("color", color)?;
        }

        sqlx::query("UPDATE categories SET name = ?, color = ? WHERE id = ?")
            .bind(&category.name)
            .bind(&category.color)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let line_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM budget_lines WHERE category_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if line_count > 0 {
            return Err(StoreError::CategoryInUse { category_id: id, line_count });
        }

        let result =
            sqlx::query("DELETE FROM categories WHERE id = ?").bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "category", id });
        }

        Ok(())
    }
}

fn category_from_row(row: &SqliteRow) -> Result<Category, StoreError> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
    })
}
