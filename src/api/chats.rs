//! Chat routes: history, messaging, reports and PDF uploads.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::auth::{self, AuthUser};
use crate::chat::guest::{self, GuestTurn};
use crate::chat::{Turn, UploadedPdf};
use crate::error::ChatError;
use crate::store::ChatRecord;
use crate::uploads::UPLOAD_FILE_SIZE_LIMIT;

use super::error::ApiError;
use super::state::AppState;
use super::users::{MULTIPART_SLACK, MultipartForm};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatSummary {
    chat_id: i64,
    title: String,
}

impl From<ChatRecord> for ChatSummary {
    fn from(chat: ChatRecord) -> Self {
        Self {
            chat_id: chat.id,
            title: chat.title,
        }
    }
}

/// `{message}`; any other client fields are ignored.
#[derive(Debug, Deserialize)]
struct MessageRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest {
    #[serde(default)]
    chat_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GuestRequest {
    messages: Option<Vec<GuestTurn>>,
}

/// GET /api/chats
async fn list_chats(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    let chats = state.chat.list_chats(user_id).await?;
    Ok(Json(chats.into_iter().map(ChatSummary::from).collect()))
}

/// GET /api/chat/{chatId}
async fn get_history(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(chat_id): Path<i64>,
) -> Result<Json<Vec<Turn>>, ApiError> {
    Ok(Json(state.chat.history(user_id, chat_id).await?))
}

/// POST /api/chat/new
async fn new_chat(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(body): Json<MessageRequest>,
) -> Result<Response, ApiError> {
    let chat = state.chat.start_chat(user_id, &body.message).await?;
    Ok((StatusCode::CREATED, Json(chat)).into_response())
}

/// POST /api/chat/{chatId}
async fn send_message(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(chat_id): Path<i64>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<Turn>, ApiError> {
    Ok(Json(
        state.chat.send_message(user_id, chat_id, &body.message).await?,
    ))
}

/// DELETE /api/chat/{chatId}
async fn delete_chat(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(chat_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.chat.delete_chat(user_id, chat_id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Chat deleted successfully" }),
    ))
}

/// POST /api/chat/generate-pdf
///
/// The body is optional; without a `chatId` the turn is returned unsaved.
async fn generate_report(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ReportRequest = if body.is_empty() {
        ReportRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?
    };

    let turn = state
        .chat
        .generate_report(user_id, request.chat_id)
        .await
        .map_err(|e| match e {
            ChatError::Report(e) => {
                error!(error = %e, "Report generation failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate PDF.")
            }
            other => other.into(),
        })?;
    Ok(Json(turn).into_response())
}

/// POST /api/upload/pdf
async fn upload_pdf(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = MultipartForm::read(multipart, "userPdf").await?;
    let chat_id = match form.text("chatId") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| ApiError::bad_request("Invalid chatId."))?,
        ),
        None => None,
    };
    let Some(file) = form.file else {
        return Err(ApiError::bad_request("No file uploaded."));
    };

    info!(user_id, file = %file.name, size = file.bytes.len(), "PDF upload");
    let uploaded = state
        .chat
        .attach_pdf(user_id, chat_id, &file.name, file.bytes)
        .await?;

    let response = match uploaded {
        UploadedPdf::NewChat(chat) => (StatusCode::CREATED, Json(chat)).into_response(),
        UploadedPdf::Existing(turn) => (StatusCode::CREATED, Json(turn)).into_response(),
    };
    Ok(response)
}

/// POST /api/chat/guest
async fn guest_chat(Json(body): Json<GuestRequest>) -> Result<Json<Turn>, ApiError> {
    let Some(messages) = body.messages else {
        return Err(ApiError::bad_request("Messages array is required."));
    };
    let reply = guest::guest_reply(&messages);
    Ok(Json(reply.persisted(Utc::now().timestamp_millis())))
}

/// POST /api/chat/generate-pdf/guest
async fn guest_report() -> impl IntoResponse {
    let reply = guest::guest_report_reply();
    (
        StatusCode::FORBIDDEN,
        Json(reply.persisted(Utc::now().timestamp_millis())),
    )
}

pub fn chat_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/chats", get(list_chats))
        .route("/api/chat/new", post(new_chat))
        .route("/api/chat/generate-pdf", post(generate_report))
        .route(
            "/api/chat/{chatId}",
            get(get_history).post(send_message).delete(delete_chat),
        )
        .route(
            "/api/upload/pdf",
            post(upload_pdf).layer(DefaultBodyLimit::max(UPLOAD_FILE_SIZE_LIMIT + MULTIPART_SLACK)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/api/chat/guest", post(guest_chat))
        .route("/api/chat/generate-pdf/guest", post(guest_report))
        .merge(protected)
        .with_state(state)
}
