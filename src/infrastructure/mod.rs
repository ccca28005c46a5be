// Core infrastructure modules
pub mod catalog;               // Ingredient and tag catalog
pub mod graph;                 // Follow / favorite / cart edges
pub mod middleware;            // Viewer resolution, host filtering
pub mod privacy;               // Write access rules
pub mod recipes;               // Recipe entity store
pub mod security;              // Password hashing and key generation
pub mod shopping_list;         // Cart aggregation
pub mod users;                 // Accounts and tokens
pub mod viewer;                // Viewer context

pub use catalog::Catalog;
pub use graph::{EdgeKind, RelationshipGraph};
pub use recipes::RecipeStore;
pub use shopping_list::ShoppingListService;
pub use users::UserStore;
pub use viewer::ViewerContext;
