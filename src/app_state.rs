use crate::{
    config::Config,
    database::FoodgramDatabase,
    infrastructure::{
        middleware::{HasConfig, HasUserStore},
        security::PasswordService,
        Catalog, RecipeStore, RelationshipGraph, ShoppingListService, UserStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub database: FoodgramDatabase,
    pub graph: RelationshipGraph,
    pub catalog: Catalog,
    pub users: UserStore,
    pub recipes: RecipeStore,
    pub shopping_list: ShoppingListService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let database = if config.database.url == "sqlite::memory:" {
            FoodgramDatabase::new_in_memory().await?
        } else {
            let database =
                FoodgramDatabase::new(&config.database.url, config.database.max_connections).await?;
            database.init().await?;
            database
        };
        Ok(Self::with_database(config, database))
    }

    /// Wire the stores on top of an already initialised database.
    pub fn with_database(config: Config, database: FoodgramDatabase) -> Self {
        let pool = database.pool.clone();
        let graph = RelationshipGraph::new(pool.clone());
        let catalog = Catalog::new(pool.clone());
        let passwords = PasswordService::new(config.security.secret_key.clone());
        let users = UserStore::new(pool.clone(), passwords, graph.clone());
        let recipes = RecipeStore::new(pool, catalog.clone(), users.clone(), graph.clone());
        let shopping_list = ShoppingListService::new(graph.clone(), recipes.clone());

        Self {
            config,
            database,
            graph,
            catalog,
            users,
            recipes,
            shopping_list,
        }
    }
}

impl HasUserStore for AppState {
    fn user_store(&self) -> &UserStore {
        &self.users
    }
}

impl HasConfig for AppState {
    fn config(&self) -> &Config {
        &self.config
    }
}
