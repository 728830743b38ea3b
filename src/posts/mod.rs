mod de;
mod filter;
pub mod repo;
mod shape;

pub use filter::ListingQuery;
pub use shape::{OwnerInfo, ShapedPost};

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{AppResult, AppState, auth::AuthUser};

use self::repo::{CreatePost, UpdatePost};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
}

#[debug_handler(state = AppState)]
async fn list_posts(
    State(db_pool): State<SqlitePool>,
    Query(filter): Query<ListingQuery>,
) -> Json<Vec<ShapedPost>> {
    Json(repo::list(&db_pool, &filter).await)
}

// ids are opaque strings to the repository; an id that never existed and a
// malformed one both answer 404
#[debug_handler(state = AppState)]
async fn get_post(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> AppResult<Json<ShapedPost>> {
    Ok(Json(repo::get(&db_pool, &id).await?))
}

#[debug_handler(state = AppState)]
async fn create_post(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Json(body): Json<CreatePost>,
) -> AppResult<(StatusCode, Json<ShapedPost>)> {
    let post = repo::create(&db_pool, &user.id, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[debug_handler(state = AppState)]
async fn update_post(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdatePost>,
) -> AppResult<Json<ShapedPost>> {
    let post = repo::update(&db_pool, &id, &user.id, body).await?;
    Ok(Json(post))
}

#[debug_handler(state = AppState)]
async fn delete_post(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    repo::delete(&db_pool, &id, &user.id).await?;
    Ok(Json(json!({ "message": "post deleted" })))
}
