//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::chat::model::{NewTurn, Turn};
use crate::error::DatabaseError;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub photo_url: Option<String>,
}

/// A conversation header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic database trait covering users, sessions, chats and
/// their messages.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Insert a user. A duplicate email is `DatabaseError::Constraint`.
    async fn create_user(
        &self,
        user_name: &str,
        email: &str,
        password_hash: &str,
        photo_url: Option<&str>,
    ) -> Result<i64, DatabaseError>;

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;

    async fn update_user_photo(&self, id: i64, photo_url: &str) -> Result<(), DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    async fn create_session(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Resolve a token to its user id if the session is still valid at `now`.
    async fn get_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, DatabaseError>;

    /// Delete sessions that expired before `now`. Returns the number removed.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError>;

    // ── Chats ───────────────────────────────────────────────────────

    async fn create_chat(&self, user_id: i64, title: &str) -> Result<i64, DatabaseError>;

    async fn get_chat(&self, id: i64) -> Result<Option<ChatRecord>, DatabaseError>;

    /// A user's chats, newest first.
    async fn list_chats(&self, user_id: i64) -> Result<Vec<ChatRecord>, DatabaseError>;

    /// Delete a chat and, by cascade, its messages.
    async fn delete_chat(&self, id: i64) -> Result<bool, DatabaseError>;

    // ── Messages ────────────────────────────────────────────────────

    /// Append a turn to a chat. Returns the new message id.
    async fn insert_message(&self, chat_id: i64, turn: &NewTurn) -> Result<i64, DatabaseError>;

    /// All turns of a chat in insertion order.
    async fn list_messages(&self, chat_id: i64) -> Result<Vec<Turn>, DatabaseError>;
}
