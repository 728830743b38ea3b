use axum::{
    Json, Router, debug_handler,
    extract::State,
    routing::get,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    AppError, AppResult, AppState, auth,
    auth::AuthUser,
    db,
    posts::{ShapedPost, repo},
};

/// Account projection returned by the API; never carries the credential hash.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub display_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub async fn fetch_public(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<PublicUser>> {
    sqlx::query_as(
        "SELECT id,username,email,avatar,display_name,created_at,updated_at \
         FROM users WHERE id=?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).put(update_me))
        .route("/me/posts", get(my_posts))
}

#[debug_handler(state = AppState)]
async fn me(State(db_pool): State<SqlitePool>, user: AuthUser) -> AppResult<Json<PublicUser>> {
    fetch_public(&db_pool, &user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUser {
    display_name: Option<String>,
    avatar: Option<String>,
    password: Option<String>,
}

#[debug_handler(state = AppState)]
async fn update_me(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Json(body): Json<UpdateUser>,
) -> AppResult<Json<PublicUser>> {
    let hash = match &body.password {
        Some(password) if !password.is_empty() => Some(auth::hash_password(password)?),
        _ => None,
    };

    sqlx::query(
        "UPDATE users SET \
         display_name=COALESCE(?, display_name), \
         avatar=COALESCE(?, avatar), \
         password_hash=COALESCE(?, password_hash), \
         updated_at=? WHERE id=?",
    )
    .bind(&body.display_name)
    .bind(&body.avatar)
    .bind(&hash)
    .bind(db::unix_now())
    .bind(&user.id)
    .execute(&db_pool)
    .await?;

    fetch_public(&db_pool, &user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

#[debug_handler(state = AppState)]
async fn my_posts(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<Vec<ShapedPost>>> {
    Ok(Json(repo::list_for_owner(&db_pool, &user.id).await?))
}
