use uuid::Uuid;

use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::models::User;

/// Who is making the current request.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user: Option<User>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        ViewerContext {
            user: None,
            request_id,
        }
    }

    pub fn authenticated(user: User, request_id: String) -> Self {
        ViewerContext {
            user: Some(user),
            request_id,
        }
    }

    pub fn new_request_id() -> String {
        format!("req-{}", Uuid::new_v4())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_staff)
    }

    /// The authenticated user, or `Unauthorized` for anonymous viewers.
    pub fn require_user(&self) -> AppResult<&User> {
        self.user.as_ref().ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided".to_string())
        })
    }
}
