//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::message::{AssistantContent, Message};
use rig::completion::{CompletionError, CompletionModel};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};

/// Default upper bound on a single completion call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Wraps any rig completion model as an `LlmProvider`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
    additional_params: Option<serde_json::Value>,
    timeout: Duration,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
            additional_params: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Provider-specific request fields merged into every call.
    pub fn with_additional_params(mut self, params: serde_json::Value) -> Self {
        self.additional_params = Some(params);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(
            model = %self.model_name,
            history_len = request.history.len(),
            "Sending completion request"
        );

        let mut builder = self
            .model
            .completion_request(Message::user(request.message))
            .messages(to_rig_messages(&request.history));
        if let Some(instruction) = request.system_instruction {
            builder = builder.preamble(instruction);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(params) = &self.additional_params {
            builder = builder.additional_params(params.clone());
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| {
                warn!(provider = self.provider, error = %e, "Completion failed");
                map_completion_error(self.provider, e)
            })?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        if content.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "no text in response".to_string(),
            });
        }

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}

fn to_rig_messages(history: &[ChatMessage]) -> Vec<Message> {
    history
        .iter()
        .map(|m| match m.role {
            Role::User => Message::user(m.content.clone()),
            Role::Model => Message::assistant(m.content.clone()),
        })
        .collect()
}

/// Sort rig's error into our taxonomy. Provider errors carry the HTTP
/// error body, which names the status (`RESOURCE_EXHAUSTED`, ...).
pub(crate) fn map_completion_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::ProviderError(body) => {
            if body.contains("RESOURCE_EXHAUSTED") {
                LlmError::RateLimited {
                    provider: provider.to_string(),
                    retry_after: None,
                }
            } else if ["API_KEY_INVALID", "PERMISSION_DENIED", "UNAUTHENTICATED"]
                .iter()
                .any(|status| body.contains(status))
            {
                LlmError::AuthFailed {
                    provider: provider.to_string(),
                }
            } else {
                LlmError::RequestFailed {
                    provider: provider.to_string(),
                    reason: body,
                }
            }
        }
        CompletionError::ResponseError(reason) => {
            let lower = reason.to_lowercase();
            if lower.contains("safety") || lower.contains("blocked") {
                LlmError::Blocked {
                    provider: provider.to_string(),
                    reason,
                }
            } else {
                LlmError::InvalidResponse {
                    provider: provider.to_string(),
                    reason,
                }
            }
        }
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_roles_map_to_rig_messages() {
        let messages = to_rig_messages(&[ChatMessage::user("hi"), ChatMessage::model("hello")]);
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], Message::User { .. }));
        assert!(matches!(messages[1], Message::Assistant { .. }));
    }

    #[test]
    fn rate_limit_body_maps_to_rate_limited() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = map_completion_error("gemini", CompletionError::ProviderError(body.into()));
        assert!(matches!(err, LlmError::RateLimited { retry_after: None, .. }));
    }

    #[test]
    fn invalid_key_maps_to_auth_failure() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT", "details": [{"reason": "API_KEY_INVALID"}]}}"#;
        let err = map_completion_error("gemini", CompletionError::ProviderError(body.into()));
        assert!(matches!(err, LlmError::AuthFailed { ref provider } if provider == "gemini"));
    }

    #[test]
    fn other_provider_errors_keep_the_body() {
        let err = map_completion_error("gemini", CompletionError::ProviderError("boom".into()));
        assert!(matches!(err, LlmError::RequestFailed { ref reason, .. } if reason == "boom"));
    }

    #[test]
    fn safety_response_maps_to_blocked() {
        let err = map_completion_error(
            "gemini",
            CompletionError::ResponseError("Prompt blocked: SAFETY".into()),
        );
        assert!(matches!(err, LlmError::Blocked { .. }));

        let err = map_completion_error(
            "gemini",
            CompletionError::ResponseError("No response candidates".into()),
        );
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}
