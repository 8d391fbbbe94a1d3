//! Password hashing, session tokens and the bearer-token middleware.
//!
//! Passwords are stored as Argon2 PHC strings. Login and registration issue
//! an opaque 32-hex-char token kept in the `sessions` table until it
//! expires.

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::{debug, error};

use crate::api::state::AppState;
use crate::error::{AuthError, DatabaseError};
use crate::store::Database;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Hash a password on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(format!("hashing task failed: {e}")))?
}

/// Check a password against a stored PHC string. A malformed hash never
/// verifies.
pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

/// Issues and resolves session tokens.
#[derive(Clone)]
pub struct SessionManager {
    db: Arc<dyn Database>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(db: Arc<dyn Database>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Start a session for `user_id` and return its token.
    pub async fn issue(&self, user_id: i64) -> Result<String, DatabaseError> {
        let token = generate_token();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(24));
        self.db
            .create_session(&token, user_id, Utc::now() + ttl)
            .await?;
        debug!(user_id, "Session issued");
        Ok(token)
    }

    /// The user behind a live token.
    pub async fn resolve(&self, token: &str) -> Result<Option<i64>, DatabaseError> {
        self.db.get_session_user(token, Utc::now()).await
    }

    /// Drop expired sessions.
    pub async fn prune(&self) -> Result<usize, DatabaseError> {
        self.db.delete_expired_sessions(Utc::now()).await
    }
}

fn unauthorized(err: AuthError) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "message": err.to_string() })),
    )
        .into_response()
}

/// Middleware that validates `Authorization: Bearer <token>`.
///
/// On success the caller's id is available to handlers as
/// `Extension<AuthUser>`. Missing or unknown tokens get 401.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return unauthorized(AuthError::MissingToken);
    };

    match state.sessions.resolve(&token).await {
        Ok(Some(user_id)) => {
            req.extensions_mut().insert(AuthUser(user_id));
            next.run(req).await
        }
        Ok(None) => unauthorized(AuthError::InvalidToken),
        Err(e) => {
            error!(error = %e, "Session lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "Server error" })),
            )
                .into_response()
        }
    }
}
