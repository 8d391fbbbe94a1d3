//! libSQL backend: async `Database` trait implementation.
//!
//! Uses libsql's native async API over a single shared connection.
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params::IntoParams;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::chat::model::{NewTurn, Sender, Turn, TurnType};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{ChatRecord, Database, UserRecord};

/// libSQL database backend.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        // Chat deletion relies on ON DELETE CASCADE.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Run an `INSERT ... RETURNING id` and read the id from that statement's
/// own row. `last_insert_rowid()` is connection-wide and races with other
/// tasks sharing the connection.
async fn insert_returning_id(
    conn: &Connection,
    sql: &str,
    params: impl IntoParams,
    map_err: impl Fn(libsql::Error) -> DatabaseError,
) -> Result<i64, DatabaseError> {
    let mut rows = conn.query(sql, params).await.map_err(&map_err)?;
    let row = rows
        .next()
        .await
        .map_err(&map_err)?
        .ok_or_else(|| DatabaseError::Query(format!("insert returned no id: {sql}")))?;
    row.get::<i64>(0).map_err(&map_err)
}

fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

/// Column order matches USER_COLUMNS.
fn row_to_user(row: &libsql::Row) -> Result<UserRecord, libsql::Error> {
    Ok(UserRecord {
        id: row.get(0)?,
        user_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        photo_url: row.get(4).ok(),
    })
}

/// Column order matches CHAT_COLUMNS.
fn row_to_chat(row: &libsql::Row) -> Result<ChatRecord, libsql::Error> {
    let created_str: String = row.get(3)?;
    Ok(ChatRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_datetime(&created_str),
    })
}

/// Column order matches MESSAGE_COLUMNS.
fn row_to_turn(row: &libsql::Row) -> Result<Turn, libsql::Error> {
    let sender: String = row.get(1)?;
    let turn_type: String = row.get::<String>(3).unwrap_or_else(|_| "text".into());
    Ok(Turn {
        id: row.get(0)?,
        sender: Sender::from_db(&sender),
        text: row.get(2)?,
        turn_type: TurnType::from_db(&turn_type),
        url: row.get(4).ok(),
        context: row.get(5).ok(),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const USER_COLUMNS: &str = "id, user_name, email, password_hash, photo_url";

const CHAT_COLUMNS: &str = "id, user_id, title, created_at";

const MESSAGE_COLUMNS: &str = "id, sender, text, type, url, context";

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(
        &self,
        user_name: &str,
        email: &str,
        password_hash: &str,
        photo_url: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let id = insert_returning_id(
            self.conn(),
            "INSERT INTO users (user_name, email, password_hash, photo_url)
             VALUES (?1, ?2, ?3, ?4) RETURNING id",
            params![user_name, email, password_hash, opt_text(photo_url)],
            |e| {
                if is_unique_violation(&e) {
                    DatabaseError::Constraint(format!("email already registered: {email}"))
                } else {
                    DatabaseError::Query(format!("create_user: {e}"))
                }
            },
        )
        .await?;
        debug!(user_id = id, "User created");
        Ok(id)
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row_to_user(&row).map_err(|e| DatabaseError::Query(format!("get_user: {e}")))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user: {e}"))),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row).map_err(|e| {
                DatabaseError::Query(format!("get_user_by_email: {e}"))
            })?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user_by_email: {e}"))),
        }
    }

    async fn update_user_photo(&self, id: i64, photo_url: &str) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE users SET photo_url = ?2 WHERE id = ?1",
                params![id, photo_url],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_user_photo: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "user".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn create_session(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                params![token, user_id, expires_at.to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_session: {e}")))?;
        debug!(user_id, "Session created");
        Ok(())
    }

    async fn get_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT user_id, expires_at FROM sessions WHERE token = ?1",
                params![token],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session_user: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session_user: {e}")))?
        else {
            return Ok(None);
        };

        let user_id: i64 = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("get_session_user: {e}")))?;
        let expires_str: String = row.get(1).unwrap_or_default();
        if parse_datetime(&expires_str) <= now {
            return Ok(None);
        }
        Ok(Some(user_id))
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query("SELECT token, expires_at FROM sessions", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_expired_sessions: {e}")))?;

        let mut expired = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_expired_sessions: {e}")))?
        {
            let token: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("delete_expired_sessions: {e}")))?;
            let expires_str: String = row.get(1).unwrap_or_default();
            if parse_datetime(&expires_str) <= now {
                expired.push(token);
            }
        }

        for token in &expired {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token.as_str()])
                .await
                .map_err(|e| DatabaseError::Query(format!("delete_expired_sessions: {e}")))?;
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Pruned expired sessions");
        }
        Ok(expired.len())
    }

    // ── Chats ───────────────────────────────────────────────────────

    async fn create_chat(&self, user_id: i64, title: &str) -> Result<i64, DatabaseError> {
        let id = insert_returning_id(
            self.conn(),
            "INSERT INTO chats (user_id, title, created_at) VALUES (?1, ?2, ?3) RETURNING id",
            params![user_id, title, Utc::now().to_rfc3339()],
            |e| DatabaseError::Query(format!("create_chat: {e}")),
        )
        .await?;
        debug!(chat_id = id, user_id, "Chat created");
        Ok(id)
    }

    async fn get_chat(&self, id: i64) -> Result<Option<ChatRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_chat: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row_to_chat(&row).map_err(|e| DatabaseError::Query(format!("get_chat: {e}")))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_chat: {e}"))),
        }
    }

    async fn list_chats(&self, user_id: i64) -> Result<Vec<ChatRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_chats: {e}")))?;

        let mut chats = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_chats: {e}")))?
        {
            chats.push(
                row_to_chat(&row).map_err(|e| DatabaseError::Query(format!("list_chats: {e}")))?,
            );
        }
        Ok(chats)
    }

    async fn delete_chat(&self, id: i64) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM chats WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_chat: {e}")))?;
        debug!(chat_id = id, deleted = affected > 0, "Chat delete");
        Ok(affected > 0)
    }

    // ── Messages ────────────────────────────────────────────────────

    async fn insert_message(&self, chat_id: i64, turn: &NewTurn) -> Result<i64, DatabaseError> {
        let id = insert_returning_id(
            self.conn(),
            "INSERT INTO messages (chat_id, sender, text, type, url, context, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
            params![
                chat_id,
                turn.sender.as_str(),
                turn.text.as_str(),
                turn.turn_type.as_str(),
                opt_text(turn.url.as_deref()),
                opt_text(turn.context.as_deref()),
                Utc::now().to_rfc3339(),
            ],
            |e| DatabaseError::Query(format!("insert_message: {e}")),
        )
        .await?;
        debug!(chat_id, message_id = id, turn_type = %turn.turn_type, "Message stored");
        Ok(id)
    }

    async fn list_messages(&self, chat_id: i64) -> Result<Vec<Turn>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = ?1 ORDER BY id ASC"),
                params![chat_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_messages: {e}")))?;

        let mut turns = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_messages: {e}")))?
        {
            turns.push(
                row_to_turn(&row)
                    .map_err(|e| DatabaseError::Query(format!("list_messages: {e}")))?,
            );
        }
        Ok(turns)
    }
}
