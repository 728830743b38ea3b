//! Operational debugging endpoints: raw row counts per table and a
//! decode-and-echo of the presented bearer token. Not end-user surface.

use axum::{Json, Router, debug_handler, extract::State, routing::get};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::{AppResult, AppState, auth::AuthUser, auth::Claims};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/claims", get(claims))
}

#[debug_handler(state = AppState)]
async fn stats(State(db_pool): State<SqlitePool>) -> AppResult<Json<Value>> {
    let users = count(&db_pool, "users").await?;
    let posts = count(&db_pool, "posts").await?;
    let post_details = count(&db_pool, "post_details").await?;
    let chats = count(&db_pool, "chats").await?;
    let messages = count(&db_pool, "messages").await?;

    Ok(Json(json!({
        "users": users,
        "posts": posts,
        "postDetails": post_details,
        "chats": chats,
        "messages": messages,
    })))
}

async fn count(pool: &SqlitePool, table: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
}

#[debug_handler(state = AppState)]
async fn claims(user: AuthUser) -> Json<Claims> {
    Json(user.claims)
}
