// Tags and ingredients

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

use crate::{
    api::{ApiJson, ApiPath},
    app_state::AppState,
    core::{IngredientId, TagId},
    error::AppResult,
    infrastructure::{middleware::Vc, privacy::check_staff},
    models::{Ingredient, NewIngredient, NewTag, Tag},
    pagination::QueryParams,
};

async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(state.catalog.list_tags().await?))
}

async fn get_tag(State(state): State<AppState>, ApiPath(id): ApiPath<TagId>) -> AppResult<Json<Tag>> {
    Ok(Json(state.catalog.get_tag(id).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<NewTag>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    check_staff(&vc)?;
    let tag = state.catalog.create_tag(req).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn list_ingredients(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let params = QueryParams(pairs);
    Ok(Json(state.catalog.list_ingredients(params.get("name")).await?))
}

async fn get_ingredient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<IngredientId>,
) -> AppResult<Json<Ingredient>> {
    Ok(Json(state.catalog.get_ingredient(id).await?))
}

async fn create_ingredient(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<NewIngredient>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    check_staff(&vc)?;
    let ingredient = state.catalog.create_ingredient(req).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags).post(create_tag))
        .route("/tags/{id}/", get(get_tag))
        .route("/ingredients/", get(list_ingredients).post(create_ingredient))
        .route("/ingredients/{id}/", get(get_ingredient))
}
