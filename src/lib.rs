//! AI chat backend: turn routing, news reports and document-grounded answers.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod news;
pub mod report;
pub mod store;
pub mod uploads;
