use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

/// Relationships between the tables are by identifier reference only and
/// checked in the handlers, never by the database.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        avatar TEXT,
        display_name TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    // latitude/longitude are TEXT, not REAL. The create path never writes
    // them; the columns stay reserved until coordinate support is settled.
    "CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        price INTEGER NOT NULL,
        images TEXT NOT NULL DEFAULT '[]',
        address TEXT,
        city TEXT NOT NULL,
        bedroom INTEGER,
        bathroom INTEGER,
        latitude TEXT,
        longitude TEXT,
        type TEXT NOT NULL DEFAULT 'rent',
        property TEXT,
        user_id TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS post_details (
        post_id TEXT PRIMARY KEY,
        description TEXT,
        utilities TEXT,
        pet_policy TEXT,
        income_policy TEXT,
        size INTEGER,
        school INTEGER,
        bus INTEGER,
        restaurant INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS chats (
        id TEXT PRIMARY KEY,
        user_one_id TEXT NOT NULL,
        user_two_id TEXT NOT NULL,
        post_id TEXT,
        unread_one INTEGER NOT NULL DEFAULT 0,
        unread_two INTEGER NOT NULL DEFAULT 0,
        last_message TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
];

pub async fn connect(url: &str) -> sqlx::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(url)
        .await?;

    for stmt in SCHEMA {
        sqlx::query(stmt).execute(&pool).await?;
    }

    Ok(pool)
}

pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
