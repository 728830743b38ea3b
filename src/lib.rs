pub mod admin;
pub mod appresult;
pub mod auth;
pub mod chats;
pub mod db;
pub mod posts;
pub mod users;

use axum::{Router, extract::FromRef};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

pub use appresult::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub jwt: auth::JwtKeys,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/posts", posts::router())
        .nest("/chats", chats::router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
