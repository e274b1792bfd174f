use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// User Repository
// ============================================================================

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Email lookup is case-insensitive; addresses are stored lowercased.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn create(
        pool: &SqlitePool,
        email: &str,
        full_name: &str,
        password_hash: &str,
        role: Role,
    ) -> AppResult<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, full_name, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, email, full_name, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(email.trim().to_lowercase())
        .bind(full_name.trim())
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn count_by_role(pool: &SqlitePool, role: Role) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }
}
