// Recipe entity store - recipes and their ingredient/tag links

use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;
use tracing::info;

use crate::core::{current_time_millis, IngredientId, RecipeId, TagId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::catalog::Catalog;
use crate::infrastructure::graph::{EdgeKind, RelationshipGraph, RECIPE_EDGE_KINDS};
use crate::infrastructure::security::generate_short_code;
use crate::infrastructure::shopping_list::RecipePart;
use crate::infrastructure::users::UserStore;
use crate::models::{
    IngredientAmount, RecipeCreate, RecipeFilter, RecipeIngredientView, RecipePatch, RecipeRead,
    RecipeRow, ShortRecipe, Tag,
};

pub const MAX_RECIPE_NAME_LEN: usize = 256;
const SHORT_CODE_ATTEMPTS: usize = 8;

#[derive(Clone)]
pub struct RecipeStore {
    pool: SqlitePool,
    catalog: Catalog,
    users: UserStore,
    graph: RelationshipGraph,
}

impl RecipeStore {
    pub fn new(pool: SqlitePool, catalog: Catalog, users: UserStore, graph: RelationshipGraph) -> Self {
        Self {
            pool,
            catalog,
            users,
            graph,
        }
    }

    /// Validate the fields present in `patch`.
    ///
    /// Checks shapes first (lengths, positive numbers, non-empty and duplicate-free
    /// link lists), then that every referenced ingredient and tag exists.
    pub async fn validate(&self, patch: &RecipePatch) -> AppResult<()> {
        if let Some(name) = &patch.name {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > MAX_RECIPE_NAME_LEN {
                return Err(AppError::Validation(format!(
                    "name is required and must be at most {} characters",
                    MAX_RECIPE_NAME_LEN
                )));
            }
        }
        if patch.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(AppError::Validation("text must not be empty".to_string()));
        }
        if patch.image.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(AppError::Validation("image must not be empty".to_string()));
        }
        if patch.cooking_time.is_some_and(|t| t < 1) {
            return Err(AppError::Validation("cooking_time must be at least 1".to_string()));
        }

        if let Some(ingredients) = &patch.ingredients {
            if ingredients.is_empty() {
                return Err(AppError::Validation("At least one ingredient is required".to_string()));
            }
            let mut seen = HashSet::new();
            for item in ingredients {
                if item.amount < 1 {
                    return Err(AppError::Validation(format!(
                        "Amount of ingredient {} must be at least 1",
                        item.id
                    )));
                }
                if !seen.insert(item.id) {
                    return Err(AppError::Validation(format!("Ingredient {} is listed twice", item.id)));
                }
            }
            let ids: Vec<IngredientId> = ingredients.iter().map(|i| i.id).collect();
            let missing = self.catalog.missing_ingredients(&ids).await?;
            if let Some(id) = missing.first() {
                return Err(AppError::Validation(format!("Ingredient {} does not exist", id)));
            }
        }

        if let Some(tags) = &patch.tags {
            if tags.is_empty() {
                return Err(AppError::Validation("At least one tag is required".to_string()));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = tags.iter().find(|id| !seen.insert(**id)) {
                return Err(AppError::Validation(format!("Tag {} is listed twice", dup)));
            }
            let missing = self.catalog.missing_tags(tags).await?;
            if let Some(id) = missing.first() {
                return Err(AppError::Validation(format!("Tag {} does not exist", id)));
            }
        }
        Ok(())
    }

    pub async fn create(&self, author: UserId, recipe: RecipeCreate) -> AppResult<RecipeId> {
        let patch = RecipePatch::from(recipe);
        self.validate(&patch).await?;

        let short_code = self.unused_short_code().await?;
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO recipes (author_id, name, image, text, cooking_time, short_code, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(author)
        .bind(patch.name.as_deref().map(str::trim).unwrap_or_default())
        .bind(patch.image.as_deref().unwrap_or_default())
        .bind(patch.text.as_deref().unwrap_or_default())
        .bind(patch.cooking_time.unwrap_or_default())
        .bind(&short_code)
        .bind(current_time_millis())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create recipe: {}", e)))?;
        let id = RecipeId::new(id);

        replace_links(&mut tx, id, patch.ingredients.as_deref(), patch.tags.as_deref()).await?;
        tx.commit().await?;

        info!("Recipe {} created by {}", id, author);
        Ok(id)
    }

    /// Apply a partial update. Supplied link lists replace the existing ones wholesale.
    pub async fn update(&self, id: RecipeId, patch: RecipePatch) -> AppResult<()> {
        self.validate(&patch).await?;
        self.get_row(id).await?;

        let mut tx = self.pool.begin().await?;
        let has_scalar_fields = patch.name.is_some()
            || patch.text.is_some()
            || patch.image.is_some()
            || patch.cooking_time.is_some();

        if has_scalar_fields {
            let mut qb = QueryBuilder::<Sqlite>::new("UPDATE recipes SET ");
            let mut fields = qb.separated(", ");
            if let Some(name) = &patch.name {
                fields.push("name = ").push_bind_unseparated(name.trim().to_string());
            }
            if let Some(text) = &patch.text {
                fields.push("text = ").push_bind_unseparated(text.clone());
            }
            if let Some(image) = &patch.image {
                fields.push("image = ").push_bind_unseparated(image.clone());
            }
            if let Some(cooking_time) = patch.cooking_time {
                fields.push("cooking_time = ").push_bind_unseparated(cooking_time);
            }
            qb.push(" WHERE id = ").push_bind(id);
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to update recipe {}: {}", id, e)))?;
        }

        replace_links(&mut tx, id, patch.ingredients.as_deref(), patch.tags.as_deref()).await?;
        tx.commit().await?;

        info!("Recipe {} updated", id);
        Ok(())
    }

    /// Delete a recipe together with its links and every favorite/cart edge pointing at it.
    pub async fn delete(&self, id: RecipeId) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let edges = RelationshipGraph::remove_edges_to_tx(&mut tx, id, &RECIPE_EDGE_KINDS).await?;
        // recipe_ingredients and recipe_tags go with the row (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete recipe {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Recipe {} not found", id)));
        }
        tx.commit().await?;

        info!("Recipe {} deleted ({} edges removed)", id, edges);
        Ok(())
    }

    pub async fn get_row(&self, id: RecipeId) -> AppResult<RecipeRow> {
        sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))
    }

    pub async fn find_by_short_code(&self, code: &str) -> AppResult<Option<RecipeId>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM recipes WHERE short_code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| RecipeId::new(id)))
    }

    /// Id of the recipe `author` published under `name`, if any.
    pub async fn find_by_author_and_name(&self, author: UserId, name: &str) -> AppResult<Option<RecipeId>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM recipes WHERE author_id = ? AND name = ?")
            .bind(author)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| RecipeId::new(id)))
    }

    pub async fn short(&self, id: RecipeId) -> AppResult<ShortRecipe> {
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))
    }

    /// Up to `limit` recipes of `author` in short form, ordered by name.
    pub async fn by_author(&self, author: UserId, limit: Option<i64>) -> AppResult<Vec<ShortRecipe>> {
        let recipes = sqlx::query_as(
            "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = ?
             ORDER BY name, id LIMIT ?",
        )
        .bind(author)
        // SQLite treats a negative LIMIT as "no limit"
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        Ok(recipes)
    }

    pub async fn count_by_author(&self, author: UserId) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
            .bind(author)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn tags_of(&self, id: RecipeId) -> AppResult<Vec<Tag>> {
        let tags = sqlx::query_as(
            "SELECT t.* FROM tags t INNER JOIN recipe_tags rt ON rt.tag_id = t.id
             WHERE rt.recipe_id = ? ORDER BY t.name, t.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    pub async fn ingredients_of(&self, id: RecipeId) -> AppResult<Vec<RecipeIngredientView>> {
        let ingredients = sqlx::query_as(
            "SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
             FROM recipe_ingredients ri INNER JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = ? ORDER BY i.name, i.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ingredients)
    }

    /// Ingredient lines of every recipe in `ids`, the input of shopping-list aggregation.
    pub async fn ingredient_lines(&self, ids: &[RecipeId]) -> AppResult<Vec<RecipePart>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT ri.recipe_id AS recipe_id, ri.ingredient_id AS ingredient_id, i.name AS name,
                    i.measurement_unit AS measurement_unit, ri.amount AS amount
             FROM recipe_ingredients ri INNER JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id IN (",
        );
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");
        let parts = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(parts)
    }

    /// Full read form of one recipe as seen by `viewer`.
    pub async fn read(&self, viewer: Option<UserId>, id: RecipeId) -> AppResult<RecipeRead> {
        let row = self.get_row(id).await?;
        self.hydrate(viewer, row).await
    }

    /// One page of recipes matching `filter`, with the total number of matches.
    pub async fn list(
        &self,
        viewer: Option<UserId>,
        filter: &RecipeFilter,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<RecipeRead>, i64)> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r WHERE 1 = 1");
        push_filters(&mut count_qb, viewer, filter);
        let (count,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT r.* FROM recipes r WHERE 1 = 1");
        push_filters(&mut qb, viewer, filter);
        qb.push(" ORDER BY r.name, r.id LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);
        let rows: Vec<RecipeRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            recipes.push(self.hydrate(viewer, row).await?);
        }
        Ok((recipes, count))
    }

    async fn hydrate(&self, viewer: Option<UserId>, row: RecipeRow) -> AppResult<RecipeRead> {
        let author = self.users.require(row.author_id).await?;
        let author = self.users.profile_for(viewer, &author).await?;
        let (is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => (
                self.graph.has_edge(viewer, row.id, EdgeKind::Favorite).await?,
                self.graph.has_edge(viewer, row.id, EdgeKind::CartItem).await?,
            ),
            None => (false, false),
        };

        Ok(RecipeRead {
            id: row.id,
            author,
            tags: self.tags_of(row.id).await?,
            ingredients: self.ingredients_of(row.id).await?,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
            is_favorited,
            is_in_shopping_cart,
        })
    }

    async fn unused_short_code(&self) -> AppResult<String> {
        for _ in 0..SHORT_CODE_ATTEMPTS {
            let code = generate_short_code();
            if self.find_by_short_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(AppError::Internal("Could not allocate a unique short code".to_string()))
    }
}

/// Append the `AND ...` clauses of `filter`. Viewer-relative filters are ignored for anonymous viewers.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, viewer: Option<UserId>, filter: &RecipeFilter) {
    if let Some(author) = filter.author {
        qb.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id
              WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = qb.separated(",");
        for slug in &filter.tags {
            separated.push_bind(slug.clone());
        }
        qb.push("))");
    }
    if let Some(viewer) = viewer {
        for (enabled, kind) in [
            (filter.is_favorited, EdgeKind::Favorite),
            (filter.is_in_shopping_cart, EdgeKind::CartItem),
        ] {
            if enabled {
                qb.push(" AND EXISTS (SELECT 1 FROM edges e WHERE e.target_id = r.id AND e.source_id = ")
                    .push_bind(viewer)
                    .push(" AND e.kind = ")
                    .push_bind(kind.as_str())
                    .push(")");
            }
        }
    }
}

async fn replace_links(
    tx: &mut Transaction<'_, Sqlite>,
    id: RecipeId,
    ingredients: Option<&[IngredientAmount]>,
    tags: Option<&[TagId]>,
) -> AppResult<()> {
    if let Some(ingredients) = ingredients {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        qb.push_values(ingredients, |mut row, item| {
            row.push_bind(id).push_bind(item.id).push_bind(item.amount);
        });
        qb.build()
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to link ingredients to recipe {}: {}", id, e)))?;
    }

    if let Some(tags) = tags {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        qb.push_values(tags, |mut row, tag| {
            row.push_bind(id).push_bind(*tag);
        });
        qb.build()
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to link tags to recipe {}: {}", id, e)))?;
    }
    Ok(())
}
