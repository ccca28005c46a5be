// User store - accounts, credentials and API tokens

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::core::{current_time_millis, UserId};
use crate::database::is_unique_violation;
use crate::error::{AppError, AppResult};
use crate::infrastructure::graph::{EdgeKind, RelationshipGraph};
use crate::infrastructure::security::{generate_token_key, PasswordService};
use crate::models::{NewUser, User, UserProfile};

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_NAME_LEN: usize = 150;
pub const MAX_EMAIL_LEN: usize = 254;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Check a username against the allowed alphabet and reserved words.
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if username.eq_ignore_ascii_case("me") {
        return Err(AppError::Validation("Username \"me\" is reserved".to_string()));
    }
    if !USERNAME_RE.is_match(username) {
        let invalid: String = username
            .chars()
            .filter(|c| !(c.is_alphanumeric() || "_.@+-".contains(*c)))
            .collect();
        return Err(AppError::Validation(format!(
            "Username contains invalid characters: {}",
            invalid
        )));
    }
    Ok(())
}

fn validate_new_user(user: &NewUser) -> AppResult<()> {
    validate_username(&user.username)?;

    let email = user.email.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(AppError::Validation(format!(
            "Email is required and must be at most {} characters",
            MAX_EMAIL_LEN
        )));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(AppError::Validation("Enter a valid email address".to_string())),
    }

    for (field, value) in [("first_name", &user.first_name), ("last_name", &user.last_name)] {
        if value.trim().is_empty() || value.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Validation(format!(
                "{} is required and must be at most {} characters",
                field, MAX_NAME_LEN
            )));
        }
    }
    if user.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
    passwords: PasswordService,
    graph: RelationshipGraph,
}

impl UserStore {
    pub fn new(pool: SqlitePool, passwords: PasswordService, graph: RelationshipGraph) -> Self {
        Self {
            pool,
            passwords,
            graph,
        }
    }

    pub async fn register(&self, new_user: NewUser) -> AppResult<User> {
        self.create_user(new_user, false).await
    }

    /// Insert a validated user; `Conflict` when the email or username is taken.
    pub async fn create_user(&self, new_user: NewUser, is_staff: bool) -> AppResult<User> {
        validate_new_user(&new_user)?;
        let email = new_user.email.trim().to_lowercase();

        if self.get_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("A user with this email already exists".to_string()));
        }
        if self.get_by_username(&new_user.username).await?.is_some() {
            return Err(AppError::Conflict("A user with this username already exists".to_string()));
        }

        let password_hash = self.passwords.hash_password(&new_user.password)?;
        let user: User = sqlx::query_as(
            "INSERT INTO users (email, username, first_name, last_name, password, is_staff, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&email)
        .bind(&new_user.username)
        .bind(new_user.first_name.trim())
        .bind(new_user.last_name.trim())
        .bind(password_hash)
        .bind(is_staff)
        .bind(current_time_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A user with this email or username already exists".to_string())
            } else {
                AppError::DatabaseError(format!("Failed to create user: {}", e))
            }
        })?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Like [`get`](Self::get) but a missing user is `NotFound`.
    pub async fn require(&self, id: UserId) -> AppResult<User> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// One page of users ordered by username, with the total count.
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<User>, i64)> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let users = sqlx::query_as("SELECT * FROM users ORDER BY username LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok((users, count))
    }

    /// Fetch users by id, keeping the order of `ids` and skipping unknown ids.
    pub async fn get_many(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE id IN (");
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let rows: Vec<User> = qb.build_query_as().fetch_all(&self.pool).await?;
        let mut by_id: HashMap<UserId, User> = rows.into_iter().map(|u| (u.id, u)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Profile of `user` as seen by `viewer` (anonymous viewers are never subscribed).
    pub async fn profile_for(&self, viewer: Option<UserId>, user: &User) -> AppResult<UserProfile> {
        let is_subscribed = match viewer {
            Some(viewer) if viewer != user.id => {
                self.graph.has_edge(viewer, user.id, EdgeKind::Follow).await?
            }
            _ => false,
        };
        Ok(UserProfile::from_user(user, is_subscribed))
    }

    /// Check email and password; a mismatch of either is the same `Validation` error.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let invalid = || AppError::Validation("Unable to log in with provided credentials".to_string());
        let user = self.get_by_email(email).await?.ok_or_else(invalid)?;
        if !self.passwords.verify_password(password, &user.password)? {
            warn!("Failed login for {}", user.username);
            return Err(invalid());
        }
        Ok(user)
    }

    /// Return the user's token key, creating one on first login.
    pub async fn issue_token(&self, user_id: UserId) -> AppResult<String> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT key FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some((key,)) = existing {
            return Ok(key);
        }

        let key = generate_token_key();
        sqlx::query("INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&key)
            .bind(user_id)
            .bind(current_time_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store token: {}", e)))?;
        Ok(key)
    }

    pub async fn revoke_token(&self, user_id: UserId) -> AppResult<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn user_for_token(&self, key: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as(
            "SELECT u.* FROM users u INNER JOIN auth_tokens t ON t.user_id = u.id WHERE t.key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn set_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if !self.passwords.verify_password(current_password, &user.password)? {
            return Err(AppError::Validation("Current password is incorrect".to_string()));
        }
        if new_password.is_empty() {
            return Err(AppError::Validation("New password is required".to_string()));
        }
        let hash = self.passwords.hash_password(new_password)?;
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(hash)
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        info!("Password changed for {}", user.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::FoodgramDatabase;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            email: format!("{}@example.com", username),
            username: username.to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    async fn store() -> UserStore {
        let db = FoodgramDatabase::new_in_memory().await.unwrap();
        UserStore::new(
            db.pool.clone(),
            PasswordService::new("test"),
            RelationshipGraph::new(db.pool.clone()),
        )
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("chef.john+1@home").is_ok());
        assert!(validate_username("повар_42").is_ok());
        assert!(matches!(validate_username("me"), Err(AppError::Validation(_))));
        assert!(matches!(validate_username("ME"), Err(AppError::Validation(_))));
        assert!(matches!(validate_username("bad name!"), Err(AppError::Validation(_))));
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[tokio::test]
    async fn test_register_and_duplicates() {
        let store = store().await;
        let user = store.register(new_user("alice")).await.unwrap();
        assert!(!user.is_staff);
        assert_ne!(user.password, "s3cret-pass");

        let err = store.register(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let mut same_email = new_user("alice2");
        same_email.email = "ALICE@example.com".to_string();
        let err = store.register(same_email).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_and_tokens() {
        let store = store().await;
        let user = store.register(new_user("bob")).await.unwrap();

        let err = store.authenticate("bob@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let authed = store.authenticate("Bob@Example.com", "s3cret-pass").await.unwrap();
        assert_eq!(authed.id, user.id);

        let key = store.issue_token(user.id).await.unwrap();
        assert_eq!(store.issue_token(user.id).await.unwrap(), key);
        assert_eq!(store.user_for_token(&key).await.unwrap().unwrap().id, user.id);

        store.revoke_token(user.id).await.unwrap();
        assert!(store.user_for_token(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_password() {
        let store = store().await;
        let user = store.register(new_user("carol")).await.unwrap();
        let err = store.set_password(&user, "wrong", "next").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        store.set_password(&user, "s3cret-pass", "next-pass").await.unwrap();
        assert!(store.authenticate("carol@example.com", "next-pass").await.is_ok());
    }

    #[tokio::test]
    async fn test_get_many_keeps_order() {
        let store = store().await;
        let a = store.register(new_user("a1")).await.unwrap();
        let b = store.register(new_user("b1")).await.unwrap();
        let users = store.get_many(&[b.id, UserId::new(999), a.id]).await.unwrap();
        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
