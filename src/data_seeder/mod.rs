// Fixture loader - inserts users, catalog entries and recipes from a JSON file.
// Entries that already exist are skipped, so loading the same file twice is a no-op.

use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    core::{IngredientId, TagId},
    error::{AppError, AppResult},
    models::{IngredientAmount, NewIngredient, NewTag, NewUser, RecipeCreate},
};

pub const PLACEHOLDER_IMAGE: &str = "recipes/images/placeholder.png";

#[derive(Debug, Default, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
    #[serde(default)]
    pub tags: Vec<NewTag>,
    #[serde(default)]
    pub recipes: Vec<FixtureRecipe>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Deserialize)]
pub struct FixtureRecipe {
    pub name: String,
    /// Username of the author.
    pub author: String,
    pub text: String,
    pub cooking_time: i64,
    #[serde(default)]
    pub image: Option<String>,
    /// Tag slugs.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<FixtureIngredientLine>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureIngredientLine {
    pub name: String,
    #[serde(default)]
    pub measurement_unit: Option<String>,
    pub amount: i64,
}

/// Number of rows created per section, plus recipes rejected as invalid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub ingredients: usize,
    pub tags: usize,
    pub recipes: usize,
    pub skipped_recipes: usize,
}

pub async fn load_fixture_file(state: &AppState, path: &Path) -> anyhow::Result<SeedReport> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let data: FixtureData = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid fixture file {}: {}", path.display(), e))?;
    Ok(load_fixture(state, data).await?)
}

pub async fn load_fixture(state: &AppState, data: FixtureData) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    for user in data.users {
        if state.users.get_by_username(&user.username).await?.is_some() {
            continue;
        }
        state
            .users
            .create_user(
                NewUser {
                    email: user.email,
                    username: user.username,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    password: user.password,
                },
                user.is_staff,
            )
            .await?;
        report.users += 1;
    }

    for ingredient in data.ingredients {
        let existing = state
            .catalog
            .find_ingredient(ingredient.name.trim(), ingredient.measurement_unit.trim())
            .await?;
        if existing.is_none() {
            state.catalog.create_ingredient(ingredient).await?;
            report.ingredients += 1;
        }
    }

    for tag in data.tags {
        if state.catalog.get_tag_by_slug(tag.slug.trim()).await?.is_none() {
            state.catalog.create_tag(tag).await?;
            report.tags += 1;
        }
    }

    for recipe in data.recipes {
        let author = state
            .users
            .get_by_username(&recipe.author)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown recipe author {}", recipe.author)))?;
        if state
            .recipes
            .find_by_author_and_name(author.id, &recipe.name)
            .await?
            .is_some()
        {
            continue;
        }

        let mut tags: Vec<TagId> = Vec::with_capacity(recipe.tags.len());
        for slug in &recipe.tags {
            let tag = state
                .catalog
                .get_tag_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::Validation(format!("Unknown tag {}", slug)))?;
            tags.push(tag.id);
        }

        let mut ingredients = Vec::with_capacity(recipe.ingredients.len());
        for line in &recipe.ingredients {
            ingredients.push(IngredientAmount {
                id: resolve_ingredient(state, line).await?,
                amount: line.amount,
            });
        }

        let name = recipe.name.clone();
        let created = state
            .recipes
            .create(
                author.id,
                RecipeCreate {
                    ingredients,
                    tags,
                    image: recipe.image.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
                    name: recipe.name,
                    text: recipe.text,
                    cooking_time: recipe.cooking_time,
                },
            )
            .await;
        match created {
            Ok(_) => report.recipes += 1,
            // Invalid recipe content only drops that recipe; storage failures abort the load
            Err(AppError::Validation(e)) | Err(AppError::Conflict(e)) => {
                warn!("Skipping fixture recipe {}: {}", name, e);
                report.skipped_recipes += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Fixture loaded: {} users, {} ingredients, {} tags, {} recipes ({} skipped)",
        report.users, report.ingredients, report.tags, report.recipes, report.skipped_recipes
    );
    Ok(report)
}

/// Look an ingredient line up by name and unit, or by name alone when no unit is given.
async fn resolve_ingredient(state: &AppState, line: &FixtureIngredientLine) -> AppResult<IngredientId> {
    let name = line.name.trim();
    let found = match line.measurement_unit.as_deref() {
        Some(unit) => state.catalog.find_ingredient(name, unit.trim()).await?,
        None => state
            .catalog
            .list_ingredients(Some(name))
            .await?
            .into_iter()
            .find(|i| i.name == name),
    };
    found
        .map(|i| i.id)
        .ok_or_else(|| AppError::Validation(format!("Unknown ingredient {}", name)))
}
