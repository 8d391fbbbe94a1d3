//! Response materializer: turns a routing decision into an AI turn.
//!
//! Only `GeneralChat` and `GroundedAnswer` reach the LLM; every other
//! decision has a fixed reply.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::model::{NewTurn, Sender, Turn};
use super::router::Decision;

pub const OFFER_REPORT_TEXT: &str =
    "There's so much news! I can generate a detailed PDF report for you. Shall I proceed?";
pub const START_REPORT_TEXT: &str = "Great! I will start generating the report. Please wait...";
pub const DECLINE_REPORT_TEXT: &str = "Okay, no problem. What else can I help you with?";
pub const OFFER_CLOSE_TEXT: &str = "You're welcome! Shall I close the PDF preview now?";
pub const CLOSE_REPORT_TEXT: &str = "Okay, closing the preview. The context is now cleared.";
pub const KEEP_DISCUSSING_TEXT: &str = "No problem! We can keep discussing the report.";
pub const EMPTY_CHAT_TEXT: &str = "Hello! How can I help you?";

pub const NOT_IN_DOCUMENT_TEXT: &str = "I'm sorry, that information is not in the provided document. We can only discuss the opened PDF.";

const GROUNDED_SYSTEM_INSTRUCTION: &str = "You are an assistant answering questions about a specific context, but you can also handle simple polite conversation.";

const NO_CONTEXT_PLACEHOLDER: &str = "No context available.";

/// Produces AI turns for routing decisions.
pub struct Materializer {
    llm: Arc<dyn LlmProvider>,
}

impl Materializer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Build the AI turn for `decision`.
    ///
    /// `history` holds the turns before `message`; `message` itself has
    /// not been added to it.
    pub async fn materialize(
        &self,
        decision: Decision,
        message: &str,
        history: &[Turn],
        document_context: Option<&str>,
    ) -> Result<NewTurn, LlmError> {
        let category = decision.category();
        let text = match decision {
            Decision::GeneralChat => self.general_chat(message, history).await?,
            Decision::GroundedAnswer => {
                self.grounded_answer(message, history, document_context)
                    .await?
            }
            Decision::StartReport => START_REPORT_TEXT.to_string(),
            Decision::DeclineReport => DECLINE_REPORT_TEXT.to_string(),
            Decision::OfferReport => OFFER_REPORT_TEXT.to_string(),
            Decision::OfferClose => OFFER_CLOSE_TEXT.to_string(),
            Decision::CloseReport => CLOSE_REPORT_TEXT.to_string(),
            Decision::KeepDiscussing => KEEP_DISCUSSING_TEXT.to_string(),
        };
        debug!(decision = ?decision, category = %category, "Materialized reply");
        Ok(NewTurn::ai(category, text))
    }

    async fn general_chat(&self, message: &str, history: &[Turn]) -> Result<String, LlmError> {
        let transcript = build_transcript(history);
        if transcript.is_empty() && message.trim().is_empty() {
            return Ok(EMPTY_CHAT_TEXT.to_string());
        }
        info!(
            model = %self.llm.model_name(),
            history_len = transcript.len(),
            "General chat completion"
        );
        let response = self
            .llm
            .complete(CompletionRequest::new(transcript, message))
            .await?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "General chat usage"
        );
        Ok(response.content)
    }

    async fn grounded_answer(
        &self,
        message: &str,
        history: &[Turn],
        document_context: Option<&str>,
    ) -> Result<String, LlmError> {
        let transcript = build_transcript(history);
        let prompt = grounded_prompt(document_context, message);
        info!(
            model = %self.llm.model_name(),
            history_len = transcript.len(),
            context_len = document_context.map(str::len).unwrap_or(0),
            "Grounded completion"
        );
        let request = CompletionRequest::new(transcript, prompt)
            .with_system_instruction(GROUNDED_SYSTEM_INSTRUCTION);
        let response = self.llm.complete(request).await?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Grounded usage"
        );
        Ok(response.content)
    }
}

/// Map turns to provider roles and drop any leading model entries; the
/// provider requires the transcript to open with a user turn.
pub fn build_transcript(history: &[Turn]) -> Vec<ChatMessage> {
    history
        .iter()
        .skip_while(|t| t.sender != Sender::User)
        .map(|t| match t.sender {
            Sender::User => ChatMessage::user(&t.text),
            Sender::Ai => ChatMessage::model(&t.text),
        })
        .collect()
}

/// Prompt that embeds the document context and the user's question.
pub fn grounded_prompt(document_context: Option<&str>, question: &str) -> String {
    let context = document_context.unwrap_or(NO_CONTEXT_PLACEHOLDER);
    format!(
        "You are a helpful assistant. A user is asking questions about a specific news report or a user-uploaded PDF.\n\
         Use the following context to answer the user's question.\n\
         \n\
         CONTEXT:\n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         USER'S QUESTION:\n\
         {question}\n\
         \n\
         IMPORTANT:\n\
         - If the user's question is *directly related* to the context, answer it using *only* the context.\n\
         - If the context is '{NO_CONTEXT_PLACEHOLDER}', politely state that you cannot answer questions about the PDF as its content could not be read.\n\
         - If the user's question is a simple greeting, farewell, or polite message (like \"hello\", \"thank you\", \"bye\"), just respond politely as a normal AI assistant. Do NOT say \"I'm sorry...\".\n\
         - If the question is *not* related to the context and is *not* a simple greeting, politely say \"{NOT_IN_DOCUMENT_TEXT}\"\n"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::chat::model::TurnType;
    use crate::llm::{CompletionResponse, Role};

    /// Records every request and echoes a fixed reply.
    struct RecordingLlm {
        requests: Mutex<Vec<CompletionRequest>>,
        fail: bool,
    }

    impl RecordingLlm {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(LlmError::RequestFailed {
                    provider: "recording".into(),
                    reason: "boom".into(),
                });
            }
            Ok(CompletionResponse {
                content: "model says hi".into(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    fn turns(specs: &[(Sender, &str)]) -> Vec<Turn> {
        specs
            .iter()
            .enumerate()
            .map(|(i, (sender, text))| {
                let t = match sender {
                    Sender::User => NewTurn::user(*text),
                    Sender::Ai => NewTurn::ai(TurnType::Text, *text),
                };
                t.persisted(i as i64)
            })
            .collect()
    }

    #[test]
    fn transcript_drops_leading_model_turns() {
        let history = turns(&[
            (Sender::Ai, "welcome"),
            (Sender::Ai, "pdf uploaded"),
            (Sender::User, "hi"),
            (Sender::Ai, "hello"),
        ]);
        let transcript = build_transcript(&history);
        assert_eq!(
            transcript,
            vec![ChatMessage::user("hi"), ChatMessage::model("hello")]
        );
    }

    #[test]
    fn transcript_of_only_model_turns_is_empty() {
        let history = turns(&[(Sender::Ai, "a"), (Sender::Ai, "b")]);
        assert!(build_transcript(&history).is_empty());
    }

    #[test]
    fn grounded_prompt_embeds_context_and_question() {
        let prompt = grounded_prompt(Some("The sky report"), "What colour is the sky?");
        assert!(prompt.contains("CONTEXT:\n---\nThe sky report\n---"));
        assert!(prompt.contains("USER'S QUESTION:\nWhat colour is the sky?"));
        assert!(prompt.contains(NOT_IN_DOCUMENT_TEXT));
    }

    #[test]
    fn grounded_prompt_without_context_uses_placeholder() {
        let prompt = grounded_prompt(None, "q");
        assert!(prompt.contains("---\nNo context available.\n---"));
    }

    #[tokio::test]
    async fn canned_decisions_skip_the_llm() {
        let llm = RecordingLlm::new();
        let m = Materializer::new(llm.clone());
        let cases = [
            (Decision::OfferReport, TurnType::PdfPrompt, OFFER_REPORT_TEXT),
            (Decision::StartReport, TurnType::PdfLoading, START_REPORT_TEXT),
            (Decision::DeclineReport, TurnType::Text, DECLINE_REPORT_TEXT),
            (Decision::OfferClose, TurnType::PdfClosePrompt, OFFER_CLOSE_TEXT),
            (Decision::CloseReport, TurnType::PdfClose, CLOSE_REPORT_TEXT),
            (Decision::KeepDiscussing, TurnType::Text, KEEP_DISCUSSING_TEXT),
        ];
        for (decision, category, text) in cases {
            let turn = m.materialize(decision, "msg", &[], None).await.unwrap();
            assert_eq!(turn.sender, Sender::Ai);
            assert_eq!(turn.turn_type, category);
            assert_eq!(turn.text, text);
            assert!(turn.url.is_none() && turn.context.is_none());
        }
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn general_chat_forwards_transcript_and_message() {
        let llm = RecordingLlm::new();
        let m = Materializer::new(llm.clone());
        let history = turns(&[(Sender::Ai, "greeting"), (Sender::User, "hi"), (Sender::Ai, "hey")]);

        let turn = m
            .materialize(Decision::GeneralChat, "how are you?", &history, None)
            .await
            .unwrap();
        assert_eq!(turn.turn_type, TurnType::Text);
        assert_eq!(turn.text, "model says hi");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "how are you?");
        assert_eq!(requests[0].history.len(), 2);
        assert_eq!(requests[0].history[0].role, Role::User);
        assert!(requests[0].system_instruction.is_none());
    }

    #[tokio::test]
    async fn empty_general_chat_is_canned() {
        let llm = RecordingLlm::new();
        let m = Materializer::new(llm.clone());
        let turn = m
            .materialize(Decision::GeneralChat, "  ", &[], None)
            .await
            .unwrap();
        assert_eq!(turn.text, EMPTY_CHAT_TEXT);
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn grounded_answer_sends_prompt_with_system_instruction() {
        let llm = RecordingLlm::new();
        let m = Materializer::new(llm.clone());
        let history = turns(&[(Sender::User, "news"), (Sender::Ai, "report ready")]);

        m.materialize(
            Decision::GroundedAnswer,
            "summarise chapter 2",
            &history,
            Some("chapter 2: rain"),
        )
        .await
        .unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].message.contains("chapter 2: rain"));
        assert!(requests[0].message.contains("summarise chapter 2"));
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some(GROUNDED_SYSTEM_INSTRUCTION)
        );
        assert_eq!(requests[0].history.len(), 2);
    }

    #[tokio::test]
    async fn llm_failure_propagates() {
        let m = Materializer::new(RecordingLlm::failing());
        let err = m
            .materialize(Decision::GeneralChat, "hi", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }
}
