// Foodgram API server

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foodgram::{api::create_app, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing; RUST_LOG wins over the DEBUG default
    let default_filter = if config.server.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    let app = create_app(app_state);

    let addr = config.server_address();
    info!("Foodgram server starting on http://{}", addr);
    info!("  POST   /api/users/                         - Register");
    info!("  POST   /api/auth/token/login/              - Obtain token");
    info!("  GET    /api/recipes/                       - List recipes");
    info!("  GET    /api/recipes/download_shopping_cart/ - Shopping list");
    info!("  GET    /r/{{code}}/                          - Short link redirect");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
