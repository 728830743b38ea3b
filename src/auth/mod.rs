mod token;

pub use token::{AuthUser, Claims, JwtKeys};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState, db, users::PublicUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(db_pool): State<SqlitePool>,
    Json(body): Json<RegisterBody>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    if body.username.is_empty() || body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("username, email and password are required"));
    }

    let id = Uuid::now_v7().to_string();
    let now = db::unix_now();
    let hash = hash_password(&body.password)?;

    let inserted = sqlx::query(
        "INSERT INTO users (id,username,email,password_hash,created_at,updated_at) VALUES (?,?,?,?,?,?)",
    )
    .bind(&id)
    .bind(&body.username)
    .bind(&body.email)
    .bind(&hash)
    .bind(now)
    .bind(now)
    .execute(&db_pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::bad_request("username or email already taken"));
        }
        Err(err) => return Err(err.into()),
    }

    let user = crate::users::fetch_public(&db_pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: PublicUser,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> AppResult<Json<LoginResponse>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT id,password_hash FROM users WHERE username=?")
            .bind(&body.username)
            .fetch_optional(&state.db_pool)
            .await?;

    // a wrong username and a wrong password are indistinguishable to the caller
    let Some((id, hash)) = row else {
        return Err(AppError::unauthorized("invalid credentials"));
    };

    if !verify_password(&body.password, &hash) {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let token = state.jwt.issue(&id)?;
    let user = crate::users::fetch_public(&state.db_pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(LoginResponse { token, user }))
}

// the token is stateless; the endpoint exists for client symmetry
async fn logout() -> Json<Value> {
    Json(json!({ "message": "logged out" }))
}

pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    use argon2::Argon2;
    use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(anyhow::anyhow!("password hashing failed: {err}")))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::Argon2;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
