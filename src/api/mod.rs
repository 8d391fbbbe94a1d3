//! HTTP API.
//!
//! Public routes: health, register, login and the guest endpoints.
//! Everything else sits behind [`crate::auth::require_auth`]. Uploaded
//! files and generated reports are served from `/uploads`.

pub mod chats;
pub mod error;
pub mod state;
pub mod users;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::uploads::PUBLIC_PREFIX;

pub use error::ApiError;
pub use state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let uploads = ServeDir::new(state.uploads.root());

    Router::new()
        .route("/health", get(health))
        .merge(users::user_routes(state.clone()))
        .merge(chats::chat_routes(state))
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ai-chat",
    }))
}
