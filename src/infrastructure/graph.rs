//! Relationship graph between users and recipes.
//!
//! Follow, favorite and cart-item edges are all directed edges owned by a
//! source user. They live in one `edges` table whose primary key is
//! `(source_id, kind, target_id)`, so "at most one edge per ordered pair" is a storage invariant.

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::fmt;
use tracing::info;

use crate::core::{current_time_millis, UserId};
use crate::database::{is_check_violation, is_unique_violation};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// user -> user
    Follow,
    /// user -> recipe
    Favorite,
    /// user -> recipe
    CartItem,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "follow",
            EdgeKind::Favorite => "favorite",
            EdgeKind::CartItem => "cart",
        }
    }

    /// Table holding the entity an edge of this kind points at.
    fn target_table(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "users",
            EdgeKind::Favorite | EdgeKind::CartItem => "recipes",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "subscription",
            EdgeKind::Favorite => "favorite",
            EdgeKind::CartItem => "shopping cart entry",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of edge that point at recipes; removed together with the recipe.
pub const RECIPE_EDGE_KINDS: [EdgeKind; 2] = [EdgeKind::Favorite, EdgeKind::CartItem];

#[derive(Clone)]
pub struct RelationshipGraph {
    pool: SqlitePool,
}

impl RelationshipGraph {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the edge `source -> target`.
    ///
    /// Fails with `Validation` for a self-follow, `NotFound` when the target
    /// entity does not exist and `Conflict` when the edge is already present.
    pub async fn add_edge(
        &self,
        source: UserId,
        target: impl Into<i64>,
        kind: EdgeKind,
    ) -> AppResult<()> {
        let target = target.into();
        if kind == EdgeKind::Follow && source.value() == target {
            return Err(AppError::Validation("You cannot subscribe to yourself".to_string()));
        }

        // Inserts nothing unless the target row exists at insert time.
        let result = sqlx::query(&format!(
            "INSERT INTO edges (source_id, kind, target_id, created_at)
             SELECT ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM {} WHERE id = ?)
             ON CONFLICT DO NOTHING",
            kind.target_table()
        ))
        .bind(source)
        .bind(kind.as_str())
        .bind(target)
        .bind(current_time_millis())
        .bind(target)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_check_violation(&e) {
                AppError::Validation("You cannot subscribe to yourself".to_string())
            } else if is_unique_violation(&e) {
                AppError::Conflict(format!("The {} already exists", kind.describe()))
            } else {
                AppError::DatabaseError(format!("Failed to create {} edge: {}", kind, e))
            }
        })?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query(&format!("SELECT 1 FROM {} WHERE id = ?", kind.target_table()))
                .bind(target)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
            return Err(if exists {
                AppError::Conflict(format!("The {} already exists", kind.describe()))
            } else {
                AppError::NotFound(format!(
                    "{} {} does not exist",
                    kind.target_table().trim_end_matches('s'),
                    target
                ))
            });
        }

        info!("Edge added: {} -[{}]-> {}", source, kind, target);
        Ok(())
    }

    /// Delete the edge `source -> target`; `NotFound` if it does not exist.
    pub async fn remove_edge(
        &self,
        source: UserId,
        target: impl Into<i64>,
        kind: EdgeKind,
    ) -> AppResult<()> {
        let target = target.into();
        let result =
            sqlx::query("DELETE FROM edges WHERE source_id = ? AND kind = ? AND target_id = ?")
                .bind(source)
                .bind(kind.as_str())
                .bind(target)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to delete {} edge: {}", kind, e))
                })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("The {} does not exist", kind.describe())));
        }

        info!("Edge removed: {} -[{}]-> {}", source, kind, target);
        Ok(())
    }

    pub async fn has_edge(
        &self,
        source: UserId,
        target: impl Into<i64>,
        kind: EdgeKind,
    ) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM edges WHERE source_id = ? AND kind = ? AND target_id = ?")
            .bind(source)
            .bind(kind.as_str())
            .bind(target.into())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Targets of every `kind` edge owned by `source`, oldest first.
    pub async fn list_targets(&self, source: UserId, kind: EdgeKind) -> AppResult<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT target_id FROM edges WHERE source_id = ? AND kind = ?
             ORDER BY created_at, target_id",
        )
        .bind(source)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Drop every edge of the given kinds that points at `target`, inside an open transaction.
    pub async fn remove_edges_to_tx(
        tx: &mut Transaction<'_, Sqlite>,
        target: impl Into<i64>,
        kinds: &[EdgeKind],
    ) -> AppResult<u64> {
        let target = target.into();
        let mut removed = 0;
        for kind in kinds {
            let result = sqlx::query("DELETE FROM edges WHERE target_id = ? AND kind = ?")
                .bind(target)
                .bind(kind.as_str())
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to delete {} edges: {}", kind, e))
                })?;
            removed += result.rows_affected();
        }
        Ok(removed)
    }
}
