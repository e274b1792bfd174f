use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Category Repository
// ============================================================================

pub struct CategoryRepository;

impl CategoryRepository {
    pub async fn list_with_counts(pool: &SqlitePool) -> AppResult<Vec<CategoryWithCount>> {
        sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT
                c.id, c.name, c.description,
                (SELECT COUNT(*) FROM facilities f WHERE f.category_id = c.id) AS facility_count,
                c.created_at, c.updated_at
            FROM categories c
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Case-insensitive name lookup, used for the uniqueness check.
    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> AppResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM categories
            WHERE LOWER(name) = LOWER(?)
            LIMIT 1
            "#,
        )
        .bind(name.trim())
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn create(pool: &SqlitePool, input: &CategoryInput) -> AppResult<Category> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Returns `None` when no category has the given id.
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        input: &CategoryInput,
    ) -> AppResult<Option<Category>> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = ?, description = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn count_facilities(pool: &SqlitePool, id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM facilities WHERE category_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
