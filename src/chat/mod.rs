//! Conversational turn routing.
//!
//! Each incoming message is classified, routed against the persisted
//! conversation state and materialized into exactly one AI turn.

pub mod conversation;
pub mod guest;
pub mod intent;
pub mod materializer;
pub mod model;
pub mod router;
pub mod service;

pub use conversation::Conversation;
pub use materializer::Materializer;
pub use model::{NewTurn, Sender, Turn, TurnType};
pub use router::{Decision, RouterState, decide, decide_message, route};
pub use service::{ChatService, NewChat, ReportTurn, UploadedPdf};
