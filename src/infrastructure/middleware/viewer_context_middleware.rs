// ViewerContext middleware - resolves the caller from the Authorization header
// and injects the context into request extensions

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    infrastructure::{users::UserStore, viewer::viewer::ViewerContext},
};

/// Application state that can resolve token keys to users.
pub trait HasUserStore {
    fn user_store(&self) -> &UserStore;
}

/// Credentials found on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthInfo {
    Anonymous,
    Token(String),
}

/// Builds a request-scoped `ViewerContext`.
///
/// No `Authorization` header means an anonymous viewer. A token that does not
/// belong to any user is rejected with 401 rather than downgraded to anonymous.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasUserStore + Clone + Send + Sync + 'static,
{
    let auth_info = extract_auth_from_request(request.headers())?;
    let viewer_context = create_viewer_context(auth_info, app_state.user_store()).await?;
    debug!(
        request_id = %viewer_context.request_id,
        user = ?viewer_context.user_id(),
        "viewer resolved"
    );

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

/// Accepts `Token <key>` and `Bearer <key>`.
fn extract_auth_from_request(headers: &HeaderMap) -> AppResult<AuthInfo> {
    let Some(auth_header) = headers.get("authorization") else {
        return Ok(AuthInfo::Anonymous);
    };
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    let key = auth_str
        .strip_prefix("Token ")
        .or_else(|| auth_str.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?;
    Ok(AuthInfo::Token(key.to_string()))
}

async fn create_viewer_context(
    auth_info: AuthInfo,
    users: &UserStore,
) -> AppResult<Arc<ViewerContext>> {
    let request_id = ViewerContext::new_request_id();

    let viewer_context = match auth_info {
        AuthInfo::Anonymous => ViewerContext::anonymous(request_id),
        AuthInfo::Token(key) => {
            let user = users
                .user_for_token(&key)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;
            ViewerContext::authenticated(user, request_id)
        }
    };

    Ok(Arc::new(viewer_context))
}
