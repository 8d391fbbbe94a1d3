//! Provider-agnostic LLM request/response types and the `LlmProvider` trait.

use async_trait::async_trait;

use crate::error::LlmError;

/// Speaker of a transcript entry, in the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One entry of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// A single chat completion: prior transcript plus the new user message.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(history: Vec<ChatMessage>, message: impl Into<String>) -> Self {
        Self {
            history,
            message: message.into(),
            system_instruction: None,
            temperature: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text returned by the provider, with token usage for logging.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A hosted chat model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Send a transcript plus a new message and return the model's reply.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
