//! Account routes: registration, login and profile photo.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{self, AuthUser};
use crate::error::DatabaseError;
use crate::store::UserRecord;
use crate::uploads::UPLOAD_FILE_SIZE_LIMIT;

use super::error::ApiError;
use super::state::AppState;

/// Multipart overhead allowance on top of the file limit.
pub(super) const MULTIPART_SLACK: usize = 64 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: i64,
    pub user_name: String,
    pub email: String,
    pub user_photo: Option<String>,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            user_id: user.id,
            user_name: user.user_name,
            email: user.email,
            user_photo: user.photo_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    user_pass: String,
}

/// An uploaded file pulled out of a multipart body.
pub(super) struct FilePart {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and the named file field of a multipart body.
#[derive(Default)]
pub(super) struct MultipartForm {
    fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Multipart read error: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read upload body: {e}")))?;
                if !bytes.is_empty() {
                    form.file = Some(FilePart {
                        name: file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Multipart read error: {e}")))?;
                form.fields.push((name, value));
            }
        }
        Ok(form)
    }

    /// A trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// POST /api/register
async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let form = MultipartForm::read(multipart, "userPhoto").await?;
    let (Some(user_name), Some(email), Some(password)) =
        (form.text("userName"), form.text("email"), form.text("userPass"))
    else {
        return Err(ApiError::bad_request(
            "All fields (userName, email, userPass) are required.",
        ));
    };

    let photo_url = match &form.file {
        Some(file) => Some(state.uploads.save_photo(&file.name, &file.bytes).await?.public_url),
        None => None,
    };

    let hash = auth::hash_password(password.to_string()).await?;
    let user_id = match state
        .db
        .create_user(user_name, email, &hash, photo_url.as_deref())
        .await
    {
        Ok(id) => id,
        Err(DatabaseError::Constraint(_)) => {
            warn!("Registration with existing email");
            return Err(ApiError::bad_request("Email already exists."));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.sessions.issue(user_id).await?;
    info!(user_id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User registered successfully!",
            "userId": user_id,
            "token": token,
        })),
    ))
}

/// POST /api/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = body.email.trim();
    if email.is_empty() || body.user_pass.is_empty() {
        return Err(ApiError::bad_request("Email and password are required."));
    }

    let Some(user) = state.db.get_user_by_email(email).await? else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "User not found. Please check your email.",
        ));
    };

    if !auth::verify_password(body.user_pass, user.password_hash.clone()).await {
        warn!(user_id = user.id, "Login with wrong password");
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Invalid credentials. Please check your password.",
        ));
    }

    let token = state.sessions.issue(user.id).await?;
    info!(user_id = user.id, "User logged in");
    Ok(Json(serde_json::json!({
        "message": "Login successful!",
        "token": token,
        "user": UserView::from(user),
    })))
}

/// POST /api/photo
async fn update_photo(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = MultipartForm::read(multipart, "userPhoto").await?;
    let Some(file) = form.file else {
        return Err(ApiError::bad_request("No file uploaded."));
    };

    let stored = state.uploads.save_photo(&file.name, &file.bytes).await?;
    match state.db.update_user_photo(user_id, &stored.public_url).await {
        Ok(()) => {}
        Err(DatabaseError::NotFound { .. }) => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, "User not found."));
        }
        Err(e) => return Err(e.into()),
    }
    let Some(user) = state.db.get_user(user_id).await? else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "User not found."));
    };

    info!(user_id, url = %stored.public_url, "Profile photo updated");
    Ok(Json(serde_json::json!({
        "message": "Photo updated successfully!",
        "user": UserView::from(user),
    })))
}

pub fn user_routes(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(UPLOAD_FILE_SIZE_LIMIT + MULTIPART_SLACK);
    let protected = Router::new()
        .route("/api/photo", post(update_photo).layer(upload_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/api/register", post(register).layer(upload_limit))
        .route("/api/login", post(login))
        .merge(protected)
        .with_state(state)
}
