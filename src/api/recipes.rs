// Recipes: CRUD, favorites, shopping cart and short links

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use crate::{
    api::{links::short_link, ApiJson, ApiPath},
    app_state::AppState,
    core::{RecipeId, UserId},
    error::AppResult,
    infrastructure::{
        graph::EdgeKind,
        middleware::Vc,
        privacy::{check_recipe_write, PrivacyOperation},
        shopping_list::render_text,
    },
    models::{RecipeCreate, RecipeFilter, RecipePatch, RecipeRead, ShortRecipe},
    pagination::{Page, PageParams, QueryParams},
};

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

fn recipe_filter(params: &QueryParams) -> AppResult<RecipeFilter> {
    Ok(RecipeFilter {
        author: params.get_i64("author")?.map(UserId::new),
        tags: params.get_all("tags"),
        is_favorited: params.flag("is_favorited"),
        is_in_shopping_cart: params.flag("is_in_shopping_cart"),
    })
}

async fn list_recipes(
    State(state): State<AppState>,
    vc: Vc,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<Page<RecipeRead>>> {
    let query = QueryParams(pairs);
    let params = PageParams::from_query(&query, &state.config.pagination)?;
    let filter = recipe_filter(&query)?;
    let (recipes, count) = state
        .recipes
        .list(vc.user_id(), &filter, params.offset(), params.limit)
        .await?;
    Ok(Json(Page::new(recipes, count, params)))
}

async fn create_recipe(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(req): ApiJson<RecipeCreate>,
) -> AppResult<(StatusCode, Json<RecipeRead>)> {
    let author = vc.require_user()?;
    let id = state.recipes.create(author.id, req).await?;
    let recipe = state.recipes.read(Some(author.id), id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<RecipeId>,
) -> AppResult<Json<RecipeRead>> {
    Ok(Json(state.recipes.read(vc.user_id(), id).await?))
}

async fn update_recipe(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<RecipeId>,
    ApiJson(patch): ApiJson<RecipePatch>,
) -> AppResult<Json<RecipeRead>> {
    let row = state.recipes.get_row(id).await?;
    check_recipe_write(&vc, &row, PrivacyOperation::Update)?;
    state.recipes.update(id, patch).await?;
    Ok(Json(state.recipes.read(vc.user_id(), id).await?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<RecipeId>,
) -> AppResult<StatusCode> {
    let row = state.recipes.get_row(id).await?;
    check_recipe_write(&vc, &row, PrivacyOperation::Delete)?;
    state.recipes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_recipe_edge(
    state: &AppState,
    vc: &Vc,
    id: RecipeId,
    kind: EdgeKind,
) -> AppResult<(StatusCode, Json<ShortRecipe>)> {
    let user = vc.require_user()?;
    state.graph.add_edge(user.id, id, kind).await?;
    Ok((StatusCode::CREATED, Json(state.recipes.short(id).await?)))
}

async fn remove_recipe_edge(
    state: &AppState,
    vc: &Vc,
    id: RecipeId,
    kind: EdgeKind,
) -> AppResult<StatusCode> {
    let user = vc.require_user()?;
    state.graph.remove_edge(user.id, id, kind).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_favorite(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<RecipeId>,
) -> AppResult<(StatusCode, Json<ShortRecipe>)> {
    add_recipe_edge(&state, &vc, id, EdgeKind::Favorite).await
}

async fn remove_favorite(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<RecipeId>,
) -> AppResult<StatusCode> {
    remove_recipe_edge(&state, &vc, id, EdgeKind::Favorite).await
}

async fn add_to_cart(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<RecipeId>,
) -> AppResult<(StatusCode, Json<ShortRecipe>)> {
    add_recipe_edge(&state, &vc, id, EdgeKind::CartItem).await
}

async fn remove_from_cart(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(id): ApiPath<RecipeId>,
) -> AppResult<StatusCode> {
    remove_recipe_edge(&state, &vc, id, EdgeKind::CartItem).await
}

async fn download_shopping_cart(State(state): State<AppState>, vc: Vc) -> AppResult<Response> {
    let user = vc.require_user()?;
    let items = state.shopping_list.build(user.id).await?;
    let body = render_text(&items);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
            ),
        ],
        body,
    )
        .into_response())
}

async fn get_link(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RecipeId>,
) -> AppResult<Json<Value>> {
    let row = state.recipes.get_row(id).await?;
    let link = short_link(&state.config.server.public_base_url, &row.short_code);
    Ok(Json(json!({ "short-link": link })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route("/recipes/download_shopping_cart/", get(download_shopping_cart))
        .route(
            "/recipes/{id}/",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/{id}/favorite/", post(add_favorite).delete(remove_favorite))
        .route("/recipes/{id}/shopping_cart/", post(add_to_cart).delete(remove_from_cart))
        .route("/recipes/{id}/get-link/", get(get_link))
}
