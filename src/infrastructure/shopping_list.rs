//! Shopping-list aggregation.
//!
//! The recipes in a user's cart are expanded into their ingredient lines,
//! grouped by ingredient identity (name + measurement unit) and summed. The
//! result is ordered by ingredient name so exports are deterministic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::core::{IngredientId, RecipeId, UserId};
use crate::error::AppResult;
use crate::infrastructure::graph::{EdgeKind, RelationshipGraph};
use crate::infrastructure::recipes::RecipeStore;

/// One ingredient line of one recipe, as fed to the aggregator.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct RecipePart {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Sum ingredient amounts across recipes.
///
/// A `(recipe, ingredient)` line seen twice is counted once, so passing the
/// same recipe more than once does not inflate the totals.
pub fn aggregate<I>(parts: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = RecipePart>,
{
    let mut seen: HashSet<(RecipeId, IngredientId)> = HashSet::new();
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

    for part in parts {
        if !seen.insert((part.recipe_id, part.ingredient_id)) {
            continue;
        }
        let total = totals.entry((part.name, part.measurement_unit)).or_insert(0);
        *total = total.saturating_add(part.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListItem {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

/// Plain-text export, one `name (unit) — total` line per ingredient.
pub fn render_text(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} ({}) — {}", item.name, item.measurement_unit, item.total))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct ShoppingListService {
    graph: RelationshipGraph,
    recipes: RecipeStore,
}

impl ShoppingListService {
    pub fn new(graph: RelationshipGraph, recipes: RecipeStore) -> Self {
        Self { graph, recipes }
    }

    /// Aggregated list for everything currently in `user`'s cart. An empty cart gives an empty list.
    pub async fn build(&self, user: UserId) -> AppResult<Vec<ShoppingListItem>> {
        let cart: Vec<RecipeId> = self
            .graph
            .list_targets(user, EdgeKind::CartItem)
            .await?
            .into_iter()
            .map(RecipeId::new)
            .collect();
        if cart.is_empty() {
            return Ok(Vec::new());
        }
        let parts = self.recipes.ingredient_lines(&cart).await?;
        Ok(aggregate(parts))
    }
}
