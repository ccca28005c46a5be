// Host header filtering against ALLOWED_HOSTS

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{config::Config, error::AppError};

pub trait HasConfig {
    fn config(&self) -> &Config;
}

/// Rejects requests whose `Host` is not in the configured allow-list with 400.
pub async fn allowed_hosts_middleware<T>(
    State(app_state): State<T>,
    request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasConfig + Clone + Send + Sync + 'static,
{
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string();

    if !app_state.config().is_host_allowed(&host) {
        warn!("Rejected request for disallowed host {:?}", host);
        return Err(AppError::Validation(format!("Invalid HTTP_HOST header: {:?}", host)));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{self, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[derive(Clone)]
    struct TestState(Config);

    impl HasConfig for TestState {
        fn config(&self) -> &Config {
            &self.0
        }
    }

    fn app(allowed: &[&str]) -> Router {
        let mut config = Config::for_testing();
        config.server.allowed_hosts = allowed.iter().map(|h| h.to_string()).collect();
        let state = TestState(config);
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(state, allowed_hosts_middleware::<TestState>))
    }

    async fn status_for(app: Router, host: &str) -> StatusCode {
        let request = http::Request::builder()
            .uri("/")
            .header(HOST, host)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_host_filter() {
        assert_eq!(status_for(app(&["foodgram.example"]), "foodgram.example:8000").await, StatusCode::OK);
        assert_eq!(status_for(app(&["foodgram.example"]), "evil.example").await, StatusCode::BAD_REQUEST);
        assert_eq!(status_for(app(&["*"]), "evil.example").await, StatusCode::OK);
    }
}
