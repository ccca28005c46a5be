// Ingredient and tag catalog - reference data looked up by recipes

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashSet;
use tracing::info;

use crate::core::{IngredientId, TagId};
use crate::database::is_unique_violation;
use crate::error::{AppError, AppResult};
use crate::models::{Ingredient, NewIngredient, NewTag, Tag};

pub const MAX_INGREDIENT_NAME_LEN: usize = 128;
pub const MAX_UNIT_LEN: usize = 64;
pub const MAX_TAG_LEN: usize = 64;
pub const DEFAULT_TAG_COLOR: &str = "#49B64E";

fn is_hex_color(value: &str) -> bool {
    value.len() == 7 && value.starts_with('#') && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Escape `%`, `_` and `\` so user input is matched literally by `LIKE ... ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        let tags = sqlx::query_as("SELECT * FROM tags ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    pub async fn get_tag(&self, id: TagId) -> AppResult<Tag> {
        sqlx::query_as("SELECT * FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))
    }

    pub async fn get_tag_by_slug(&self, slug: &str) -> AppResult<Option<Tag>> {
        let tag = sqlx::query_as("SELECT * FROM tags WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    pub async fn create_tag(&self, new_tag: NewTag) -> AppResult<Tag> {
        let name = new_tag.name.trim();
        let slug = new_tag.slug.trim();
        if name.is_empty() || name.chars().count() > MAX_TAG_LEN {
            return Err(AppError::Validation(format!(
                "Tag name is required and must be at most {} characters",
                MAX_TAG_LEN
            )));
        }
        if !is_slug(slug) || slug.len() > MAX_TAG_LEN {
            return Err(AppError::Validation(format!("Invalid tag slug: {}", slug)));
        }
        let color = new_tag
            .color
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_TAG_COLOR)
            .to_uppercase();
        if !is_hex_color(&color) {
            return Err(AppError::Validation(format!("Invalid tag color: {}", color)));
        }

        let tag: Tag = sqlx::query_as("INSERT INTO tags (name, slug, color) VALUES (?, ?, ?) RETURNING *")
            .bind(name)
            .bind(slug)
            .bind(&color)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Tag with slug {} already exists", slug))
                } else {
                    AppError::DatabaseError(format!("Failed to create tag: {}", e))
                }
            })?;
        info!("Created tag {} ({})", tag.slug, tag.id);
        Ok(tag)
    }

    /// Ingredients ordered by name; `name_prefix` filters case-insensitively.
    pub async fn list_ingredients(&self, name_prefix: Option<&str>) -> AppResult<Vec<Ingredient>> {
        let prefix = name_prefix.map(str::trim).filter(|p| !p.is_empty());

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM ingredients");
        // SQLite LIKE folds ASCII only, so non-ASCII prefixes are matched below instead
        if let Some(prefix) = prefix.filter(|p| p.is_ascii()) {
            qb.push(" WHERE name LIKE ");
            qb.push_bind(format!("{}%", escape_like(prefix)));
            qb.push(" ESCAPE '\\'");
        }
        qb.push(" ORDER BY name, id");

        let mut ingredients: Vec<Ingredient> = qb.build_query_as().fetch_all(&self.pool).await?;
        if let Some(prefix) = prefix.filter(|p| !p.is_ascii()) {
            let prefix = prefix.to_lowercase();
            ingredients.retain(|i| i.name.to_lowercase().starts_with(&prefix));
        }
        Ok(ingredients)
    }

    pub async fn get_ingredient(&self, id: IngredientId) -> AppResult<Ingredient> {
        sqlx::query_as("SELECT * FROM ingredients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ingredient {} not found", id)))
    }

    pub async fn find_ingredient(&self, name: &str, unit: &str) -> AppResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as("SELECT * FROM ingredients WHERE name = ? AND measurement_unit = ?")
            .bind(name)
            .bind(unit)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ingredient)
    }

    pub async fn create_ingredient(&self, new_ingredient: NewIngredient) -> AppResult<Ingredient> {
        let name = new_ingredient.name.trim();
        let unit = new_ingredient.measurement_unit.trim();
        if name.is_empty() || name.chars().count() > MAX_INGREDIENT_NAME_LEN {
            return Err(AppError::Validation(format!(
                "Ingredient name is required and must be at most {} characters",
                MAX_INGREDIENT_NAME_LEN
            )));
        }
        if unit.is_empty() || unit.chars().count() > MAX_UNIT_LEN {
            return Err(AppError::Validation(format!(
                "Measurement unit is required and must be at most {} characters",
                MAX_UNIT_LEN
            )));
        }

        let ingredient: Ingredient = sqlx::query_as(
            "INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?) RETURNING *",
        )
        .bind(name)
        .bind(unit)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Ingredient {} ({}) already exists", name, unit))
            } else {
                AppError::DatabaseError(format!("Failed to create ingredient: {}", e))
            }
        })?;
        Ok(ingredient)
    }

    /// Ids from `ids` that are not in the ingredient catalog.
    pub async fn missing_ingredients(&self, ids: &[IngredientId]) -> AppResult<Vec<IngredientId>> {
        let known = self.existing_ids("ingredients", ids.iter().map(|id| id.value())).await?;
        Ok(ids.iter().copied().filter(|id| !known.contains(&id.value())).collect())
    }

    /// Ids from `ids` that are not in the tag catalog.
    pub async fn missing_tags(&self, ids: &[TagId]) -> AppResult<Vec<TagId>> {
        let known = self.existing_ids("tags", ids.iter().map(|id| id.value())).await?;
        Ok(ids.iter().copied().filter(|id| !known.contains(&id.value())).collect())
    }

    async fn existing_ids(
        &self,
        table: &str,
        ids: impl Iterator<Item = i64>,
    ) -> AppResult<HashSet<i64>> {
        let ids: Vec<i64> = ids.collect();
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {} WHERE id IN (", table));
        let mut separated = qb.separated(",");
        for id in &ids {
            separated.push_bind(*id);
        }
        qb.push(")");
        let rows: Vec<(i64,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
