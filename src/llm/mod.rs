//! LLM integration.
//!
//! The chat service talks to an `LlmProvider`. The production backend is
//! Google Gemini through rig-core, bridged by `RigAdapter`.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::config::AppConfig;
use crate::error::LlmError;

/// Safety categories relaxed to `BLOCK_NONE`; news summaries routinely
/// quote violent or political content.
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub timeout: Duration,
}

impl From<&AppConfig> for LlmConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            timeout: config.llm_timeout,
        }
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    create_gemini_provider(config)
}

fn create_gemini_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::gemini;

    let client: rig::client::Client<gemini::client::GeminiExt> =
        gemini::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("Failed to create Gemini client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(
        RigAdapter::new(model, &config.model, "gemini")
            .with_additional_params(gemini_safety_params())
            .with_timeout(config.timeout),
    ))
}

/// Extra `generateContent` fields passed through rig's additional params.
fn gemini_safety_params() -> serde_json::Value {
    let settings: Vec<serde_json::Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| serde_json::json!({ "category": category, "threshold": "BLOCK_NONE" }))
        .collect();
    serde_json::json!({ "safetySettings": settings })
}
