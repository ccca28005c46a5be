use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::{AppError, AppResult};

/// Relational store backing every Foodgram entity and relationship.
///
/// Uniqueness of relationship edges and recipe links is enforced by primary
/// keys here, so concurrent duplicate inserts are rejected by the storage
/// layer rather than merged.
#[derive(Clone)]
pub struct FoodgramDatabase {
    pub pool: SqlitePool,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        password TEXT NOT NULL,
        is_staff INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS auth_tokens (
        key TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ingredients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        measurement_unit TEXT NOT NULL,
        UNIQUE(name, measurement_unit)
    )",
    "CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        color TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS recipes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        image TEXT NOT NULL,
        text TEXT NOT NULL,
        cooking_time INTEGER NOT NULL CHECK (cooking_time >= 1),
        short_code TEXT NOT NULL UNIQUE,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS recipe_ingredients (
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE RESTRICT,
        amount INTEGER NOT NULL CHECK (amount >= 1),
        PRIMARY KEY (recipe_id, ingredient_id)
    )",
    "CREATE TABLE IF NOT EXISTS recipe_tags (
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (recipe_id, tag_id)
    )",
    // Follow, favorite and cart edges share one table keyed by (source, kind, target)
    "CREATE TABLE IF NOT EXISTS edges (
        source_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        target_id INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (source_id, kind, target_id),
        CHECK (kind <> 'follow' OR source_id <> target_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_edges_target_kind ON edges(target_id, kind)",
    "CREATE INDEX IF NOT EXISTS idx_recipes_author ON recipes(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_recipes_name ON recipes(name)",
    "CREATE INDEX IF NOT EXISTS idx_ingredients_name ON ingredients(name)",
];

impl FoodgramDatabase {
    pub async fn new(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to {}: {}", database_url, e))
            })?;

        Ok(Self { pool })
    }

    /// Fresh in-memory store with the schema applied.
    ///
    /// SQLite gives every connection its own `:memory:` database, so the pool
    /// is pinned to a single connection that is never recycled.
    pub async fn new_in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn init(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to apply schema: {}", e)))?;
        }
        tracing::debug!("Database schema ready ({} statements)", SCHEMA.len());
        Ok(())
    }

    /// Health check to verify database connectivity
    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}

/// True when the statement failed on a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// True when the statement failed on a CHECK constraint.
pub fn is_check_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_check_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_schema() {
        let db = FoodgramDatabase::new_in_memory().await.unwrap();
        db.health_check().await.unwrap();
        // init is idempotent
        db.init().await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&db.pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for expected in ["auth_tokens", "edges", "ingredients", "recipe_ingredients", "recipe_tags", "recipes", "tags", "users"] {
            assert!(names.contains(&expected), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_self_follow_rejected_by_check_constraint() {
        let db = FoodgramDatabase::new_in_memory().await.unwrap();
        let err = sqlx::query("INSERT INTO edges (source_id, kind, target_id, created_at) VALUES (1, 'follow', 1, 0)")
            .execute(&db.pool)
            .await
            .unwrap_err();
        assert!(is_check_violation(&err));
    }
}
