// Users, profiles and subscriptions

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::{
    api::{ApiJson, ApiPath},
    app_state::AppState,
    core::UserId,
    error::{AppError, AppResult},
    infrastructure::{graph::EdgeKind, middleware::Vc},
    models::{NewUser, RegisteredUser, Subscription, User, UserProfile},
    pagination::{Page, PageParams, QueryParams},
};

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Subscription view of `author` for `viewer`, previewing at most `recipes_limit` recipes.
pub async fn subscription_view(
    state: &AppState,
    viewer: UserId,
    author: &User,
    recipes_limit: Option<i64>,
) -> AppResult<Subscription> {
    Ok(Subscription {
        profile: state.users.profile_for(Some(viewer), author).await?,
        recipes: state.recipes.by_author(author.id, recipes_limit).await?,
        recipes_count: state.recipes.count_by_author(author.id).await?,
    })
}

fn recipes_limit(params: &QueryParams) -> AppResult<Option<i64>> {
    match params.get_i64("recipes_limit")? {
        Some(limit) if limit < 0 => Err(AppError::Validation(
            "recipes_limit must not be negative".to_string(),
        )),
        limit => Ok(limit),
    }
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewUser>,
) -> AppResult<(StatusCode, Json<RegisteredUser>)> {
    let user = state.users.register(req).await?;
    Ok((StatusCode::CREATED, Json(RegisteredUser::from(&user))))
}

async fn list_users(
    State(state): State<AppState>,
    vc: Vc,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<Page<UserProfile>>> {
    let params = PageParams::from_query(&QueryParams(pairs), &state.config.pagination)?;
    let (users, count) = state.users.list(params.offset(), params.limit).await?;

    let mut profiles = Vec::with_capacity(users.len());
    for user in &users {
        profiles.push(state.users.profile_for(vc.user_id(), user).await?);
    }
    Ok(Json(Page::new(profiles, count, params)))
}

async fn get_user(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<UserId>,
) -> AppResult<Json<UserProfile>> {
    let user = state.users.require(id).await?;
    Ok(Json(state.users.profile_for(vc.user_id(), &user).await?))
}

async fn me(State(state): State<AppState>, vc: Vc) -> AppResult<Json<UserProfile>> {
    let user = vc.require_user()?;
    Ok(Json(state.users.profile_for(Some(user.id), user).await?))
}

async fn set_password(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<SetPasswordRequest>,
) -> AppResult<StatusCode> {
    let user = vc.require_user()?;
    state
        .users
        .set_password(user, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn subscribe(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<UserId>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    let viewer = vc.require_user()?;
    let limit = recipes_limit(&QueryParams(pairs))?;
    state.graph.add_edge(viewer.id, id, EdgeKind::Follow).await?;

    let author = state.users.require(id).await?;
    let view = subscription_view(&state, viewer.id, &author, limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn unsubscribe(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<UserId>,
) -> AppResult<StatusCode> {
    let viewer = vc.require_user()?;
    state.graph.remove_edge(viewer.id, id, EdgeKind::Follow).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn subscriptions(
    State(state): State<AppState>,
    vc: Vc,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<Page<Subscription>>> {
    let viewer = vc.require_user()?;
    let query = QueryParams(pairs);
    let params = PageParams::from_query(&query, &state.config.pagination)?;
    let limit = recipes_limit(&query)?;

    let followed: Vec<UserId> = state
        .graph
        .list_targets(viewer.id, EdgeKind::Follow)
        .await?
        .into_iter()
        .map(UserId::new)
        .collect();
    let page = Page::from_vec(followed, params);
    let authors = state.users.get_many(&page.results).await?;

    let mut views = Vec::with_capacity(authors.len());
    for author in &authors {
        views.push(subscription_view(&state, viewer.id, author, limit).await?);
    }
    Ok(Json(Page::new(views, page.count, params)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(register))
        .route("/users/me/", get(me))
        .route("/users/set_password/", post(set_password))
        .route("/users/subscriptions/", get(subscriptions))
        .route("/users/{id}/", get(get_user))
        .route("/users/{id}/subscribe/", post(subscribe).delete(unsubscribe))
}
