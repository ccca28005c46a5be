// HTTP surface - axum routers for users, catalog, recipes and short links

pub mod auth;
pub mod catalog;
pub mod links;
pub mod recipes;
pub mod users;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request, State},
    http::request::Parts,
    middleware::from_fn_with_state,
    response::Json,
    routing::get,
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::middleware::{allowed_hosts_middleware, viewer_context_middleware},
};

/// JSON body extractor whose rejections use the `AppError` body and a 400 status.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Path extractor; a segment that fails to parse is a 400 with the `AppError` body.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.database.health_check().await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Everything under `/api`, with the viewer resolved for every request.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/health/", get(health))
        .merge(auth::router())
        .merge(users::router())
        .merge(catalog::router())
        .merge(recipes::router())
        .layer(from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .with_state(state)
}

/// The complete application: API, short-link redirects, optional media files.
pub fn create_app(state: AppState) -> Router {
    let mut app = Router::new()
        .nest("/api", create_api_router(state.clone()))
        .merge(links::router(state.clone()));

    if let Some(media_root) = &state.config.server.media_root {
        app = app.nest_service("/media", ServeDir::new(media_root));
    }

    app.layer(from_fn_with_state(
        state.clone(),
        allowed_hosts_middleware::<AppState>,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}
