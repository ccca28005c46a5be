// Recipe short links: /r/{code}/ redirects to the recipe page

use axum::{
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{
    api::ApiPath,
    app_state::AppState,
    error::{AppError, AppResult},
};

pub fn short_link(base_url: &str, code: &str) -> String {
    format!("{}/r/{}", base_url.trim_end_matches('/'), code)
}

async fn follow_short_link(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> AppResult<Response> {
    let id = state
        .recipes
        .find_by_short_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Short link {} not found", code)))?;
    Ok((StatusCode::FOUND, [(LOCATION, format!("/recipes/{}/", id))]).into_response())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/r/{code}", get(follow_short_link))
        .route("/r/{code}/", get(follow_short_link))
        .with_state(state)
}
