mod msg;

pub use msg::MessageBody;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState, auth::AuthUser, db};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chats).post(open_chat))
        .route("/{id}", get(get_chat))
        .route("/{id}/messages", post(msg::send_message))
}

#[derive(sqlx::FromRow)]
pub(crate) struct ChatRow {
    pub id: String,
    pub user_one_id: String,
    pub user_two_id: String,
    pub post_id: Option<String>,
    pub unread_one: i64,
    pub unread_two: i64,
    pub last_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatRow {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.user_one_id == user_id || self.user_two_id == user_id
    }

    pub fn peer_id(&self, user_id: &str) -> &str {
        if self.user_one_id == user_id {
            &self.user_two_id
        } else {
            &self.user_one_id
        }
    }

    fn unread_for(&self, user_id: &str) -> i64 {
        if self.user_one_id == user_id {
            self.unread_one
        } else {
            self.unread_two
        }
    }
}

/// Restricted projection of the other participant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
}

impl PeerInfo {
    fn unknown() -> Self {
        Self {
            id: "unknown".to_owned(),
            username: "unknown".to_owned(),
            display_name: "Unknown user".to_owned(),
            avatar: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub id: String,
    pub post_id: Option<String>,
    pub peer: PeerInfo,
    pub unread: i64,
    pub last_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

async fn shape_chat(pool: &SqlitePool, chat: ChatRow, user_id: &str) -> sqlx::Result<ChatBody> {
    let peer: Option<(String, String, Option<String>, Option<String>)> =
        sqlx::query_as("SELECT id,username,display_name,avatar FROM users WHERE id=?")
            .bind(chat.peer_id(user_id))
            .fetch_optional(pool)
            .await?;

    let peer = match peer {
        Some((id, username, display_name, avatar)) => PeerInfo {
            id,
            display_name: display_name.unwrap_or_else(|| username.clone()),
            username,
            avatar,
        },
        None => PeerInfo::unknown(),
    };

    Ok(ChatBody {
        unread: chat.unread_for(user_id),
        id: chat.id,
        post_id: chat.post_id,
        peer,
        last_message: chat.last_message,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    })
}

pub(crate) async fn fetch_chat(pool: &SqlitePool, id: &str) -> AppResult<ChatRow> {
    sqlx::query_as::<_, ChatRow>(
        "SELECT id,user_one_id,user_two_id,post_id,unread_one,unread_two,last_message,created_at,updated_at \
         FROM chats WHERE id=?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("chat not found"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenChat {
    receiver_id: String,
    post_id: Option<String>,
}

/// Returns the existing chat between the pair when there is one, otherwise
/// creates it. The receiver must resolve to an existing account.
#[debug_handler(state = AppState)]
async fn open_chat(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Json(body): Json<OpenChat>,
) -> AppResult<Json<ChatBody>> {
    if body.receiver_id == user.id {
        return Err(AppError::bad_request("cannot open a chat with yourself"));
    }

    let receiver: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id=?")
        .bind(&body.receiver_id)
        .fetch_optional(&db_pool)
        .await?;
    if receiver.is_none() {
        return Err(AppError::not_found("receiver not found"));
    }

    let existing: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM chats WHERE (user_one_id=? AND user_two_id=?) OR (user_one_id=? AND user_two_id=?)",
    )
    .bind(&user.id)
    .bind(&body.receiver_id)
    .bind(&body.receiver_id)
    .bind(&user.id)
    .fetch_optional(&db_pool)
    .await?;

    let id = match existing {
        Some((id,)) => id,
        None => {
            let id = Uuid::now_v7().to_string();
            let now = db::unix_now();
            sqlx::query(
                "INSERT INTO chats (id,user_one_id,user_two_id,post_id,created_at,updated_at) \
                 VALUES (?,?,?,?,?,?)",
            )
            .bind(&id)
            .bind(&user.id)
            .bind(&body.receiver_id)
            .bind(&body.post_id)
            .bind(now)
            .bind(now)
            .execute(&db_pool)
            .await?;
            id
        }
    };

    let chat = fetch_chat(&db_pool, &id).await?;
    Ok(Json(shape_chat(&db_pool, chat, &user.id).await?))
}

#[debug_handler(state = AppState)]
async fn list_chats(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<Vec<ChatBody>>> {
    let rows: Vec<ChatRow> = sqlx::query_as(
        "SELECT id,user_one_id,user_two_id,post_id,unread_one,unread_two,last_message,created_at,updated_at \
         FROM chats WHERE user_one_id=? OR user_two_id=? ORDER BY updated_at DESC",
    )
    .bind(&user.id)
    .bind(&user.id)
    .fetch_all(&db_pool)
    .await?;

    let mut chats = Vec::with_capacity(rows.len());
    for row in rows {
        chats.push(shape_chat(&db_pool, row, &user.id).await?);
    }

    Ok(Json(chats))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatWithMessages {
    #[serde(flatten)]
    chat: ChatBody,
    messages: Vec<MessageBody>,
}

/// Participant-gated. Reading a chat resets the caller's unread counter.
#[debug_handler(state = AppState)]
async fn get_chat(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ChatWithMessages>> {
    let chat = fetch_chat(&db_pool, &id).await?;
    if !chat.is_participant(&user.id) {
        return Err(AppError::forbidden("not a participant of this chat"));
    }

    let unread_col = if chat.user_one_id == user.id {
        "unread_one"
    } else {
        "unread_two"
    };
    sqlx::query(&format!("UPDATE chats SET {unread_col}=0 WHERE id=?"))
        .bind(&chat.id)
        .execute(&db_pool)
        .await?;

    let messages: Vec<MessageBody> = sqlx::query_as(
        "SELECT id,chat_id,sender_id,text,created_at \
         FROM messages WHERE chat_id=? ORDER BY created_at ASC, id ASC",
    )
    .bind(&chat.id)
    .fetch_all(&db_pool)
    .await?;

    let mut chat = shape_chat(&db_pool, chat, &user.id).await?;
    chat.unread = 0;

    Ok(Json(ChatWithMessages { chat, messages }))
}
