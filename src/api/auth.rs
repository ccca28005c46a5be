// Token login/logout

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{api::ApiJson, app_state::AppState, error::AppResult, infrastructure::middleware::Vc};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Json<Value>> {
    let user = state.users.authenticate(req.email.trim(), &req.password).await?;
    let key = state.users.issue_token(user.id).await?;
    info!("User {} logged in", user.username);
    Ok(Json(json!({ "auth_token": key })))
}

async fn logout(State(state): State<AppState>, vc: Vc) -> AppResult<StatusCode> {
    let user = vc.require_user()?;
    state.users.revoke_token(user.id).await?;
    info!("User {} logged out", user.username);
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login/", post(login))
        .route("/auth/token/logout/", post(logout))
}
