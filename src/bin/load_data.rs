// Loads a JSON fixture file ({users, ingredients, tags, recipes}) into the configured database.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use foodgram::{app_state::AppState, config::Config, data_seeder::load_fixture_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/initial_data.json"));

    let config = Config::from_env()?;
    let state = AppState::new(config).await?;
    let report = load_fixture_file(&state, &path).await?;

    println!(
        "Loaded {}: {} users, {} ingredients, {} tags, {} recipes ({} skipped)",
        path.display(),
        report.users,
        report.ingredients,
        report.tags,
        report.recipes,
        report.skipped_recipes
    );
    Ok(())
}
