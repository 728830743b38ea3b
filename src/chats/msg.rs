use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState, auth::AuthUser, db};

use super::fetch_chat;

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: i64,
}

#[derive(Deserialize)]
pub(crate) struct SendMessage {
    text: String,
}

/// Appends a message, bumps the peer's unread counter and refreshes the
/// chat's cached last message.
#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(body): Json<SendMessage>,
) -> AppResult<(StatusCode, Json<MessageBody>)> {
    if body.text.is_empty() {
        return Err(AppError::bad_request("message text is required"));
    }

    let chat = fetch_chat(&db_pool, &chat_id).await?;
    if !chat.is_participant(&user.id) {
        return Err(AppError::forbidden("not a participant of this chat"));
    }

    let id = Uuid::now_v7().to_string();
    let now = db::unix_now();

    sqlx::query("INSERT INTO messages (id,chat_id,sender_id,text,created_at) VALUES (?,?,?,?,?)")
        .bind(&id)
        .bind(&chat.id)
        .bind(&user.id)
        .bind(&body.text)
        .bind(now)
        .execute(&db_pool)
        .await?;

    let unread_col = if chat.peer_id(&user.id) == chat.user_one_id {
        "unread_one"
    } else {
        "unread_two"
    };
    sqlx::query(&format!(
        "UPDATE chats SET last_message=?, updated_at=?, {unread_col}={unread_col}+1 WHERE id=?"
    ))
    .bind(&body.text)
    .bind(now)
    .bind(&chat.id)
    .execute(&db_pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageBody {
            id,
            chat_id: chat.id,
            sender_id: user.id,
            text: body.text,
            created_at: now,
        }),
    ))
}
