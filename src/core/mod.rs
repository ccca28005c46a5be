// Core types and primitives shared by every layer

pub mod strong_types;

pub use strong_types::{current_time_millis, IngredientId, RecipeId, TagId, UserId};
