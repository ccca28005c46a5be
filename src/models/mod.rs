// Foodgram data model - rows read from the store and the JSON shapes served over HTTP

use serde::{Deserialize, Serialize};

use crate::core::{IngredientId, RecipeId, TagId, UserId};

/// A row of `users`. Never serialized directly: it carries the password hash.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub is_staff: bool,
    pub created_at: i64,
}

/// Public view of a user, as seen by the current viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Response to a successful registration; the password is never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for RegisteredUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A row of `recipes` without its links.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub short_code: String,
    pub created_at: i64,
}

/// One ingredient line of a recipe, joined with the catalog entry.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeIngredientView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Full read form of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRead {
    pub id: RecipeId,
    pub author: UserProfile,
    pub name: String,
    pub image: String,
    pub text: String,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredientView>,
    pub cooking_time: i64,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Compact recipe form used in favorites, cart and subscription listings.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShortRecipe {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

/// An author the viewer follows, with a preview of their recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: IngredientId,
    pub amount: i64,
}

/// Body of `POST /recipes/`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeCreate {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<TagId>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Body of `PATCH /recipes/{id}/`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePatch {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<TagId>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

impl From<RecipeCreate> for RecipePatch {
    fn from(create: RecipeCreate) -> Self {
        Self {
            ingredients: Some(create.ingredients),
            tags: Some(create.tags),
            image: Some(create.image),
            name: Some(create.name),
            text: Some(create.text),
            cooking_time: Some(create.cooking_time),
        }
    }
}

/// Read-side filters for the recipe list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}
