//! Request-level chat orchestration.
//!
//! Every call reloads the conversation from the database, so the service
//! keeps no per-chat state. The user turn is persisted before the
//! materializer runs and the AI turn only after it returns; a failed or
//! cancelled completion leaves no AI turn behind.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ChatError;
use crate::report::ReportBuilder;
use crate::store::{ChatRecord, Database};
use crate::uploads::UploadStore;

use super::conversation::Conversation;
use super::materializer::Materializer;
use super::model::{NewTurn, Turn};
use super::router;

pub const REPORT_READY_TEXT: &str = "Your detailed news report is ready! You can view it here.";

const TITLE_CHARS: usize = 40;

/// Chat title: the first 40 characters followed by `...`.
pub fn chat_title(source: &str) -> String {
    let head: String = source.chars().take(TITLE_CHARS).collect();
    format!("{head}...")
}

/// A freshly created chat and its opening turns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChat {
    pub chat_id: i64,
    pub messages: Vec<Turn>,
}

/// A report turn; persisted only when it was generated for a chat.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportTurn {
    Saved(Turn),
    Unsaved(NewTurn),
}

/// Result of attaching an uploaded PDF.
#[derive(Debug, Clone)]
pub enum UploadedPdf {
    /// No chat was given; one was created around the upload.
    NewChat(NewChat),
    Existing(Turn),
}

pub struct ChatService {
    db: Arc<dyn Database>,
    materializer: Materializer,
    reports: Arc<ReportBuilder>,
    uploads: UploadStore,
}

impl ChatService {
    pub fn new(
        db: Arc<dyn Database>,
        materializer: Materializer,
        reports: Arc<ReportBuilder>,
        uploads: UploadStore,
    ) -> Self {
        Self {
            db,
            materializer,
            reports,
            uploads,
        }
    }

    /// The chat, if it exists and belongs to `user_id`.
    async fn owned_chat(&self, user_id: i64, chat_id: i64) -> Result<ChatRecord, ChatError> {
        match self.db.get_chat(chat_id).await? {
            Some(chat) if chat.user_id == user_id => Ok(chat),
            _ => {
                warn!(user_id, chat_id, "Chat access denied");
                Err(ChatError::AccessDenied)
            }
        }
    }

    pub async fn list_chats(&self, user_id: i64) -> Result<Vec<ChatRecord>, ChatError> {
        Ok(self.db.list_chats(user_id).await?)
    }

    pub async fn history(&self, user_id: i64, chat_id: i64) -> Result<Vec<Turn>, ChatError> {
        self.owned_chat(user_id, chat_id).await?;
        Ok(self.db.list_messages(chat_id).await?)
    }

    pub async fn delete_chat(&self, user_id: i64, chat_id: i64) -> Result<(), ChatError> {
        self.owned_chat(user_id, chat_id).await?;
        self.db.delete_chat(chat_id).await?;
        info!(user_id, chat_id, "Chat deleted");
        Ok(())
    }

    /// Create a chat from its first message and answer it.
    pub async fn start_chat(&self, user_id: i64, message: &str) -> Result<NewChat, ChatError> {
        let chat_id = self.db.create_chat(user_id, &chat_title(message)).await?;
        info!(user_id, chat_id, "Chat started");

        let (user_turn, ai_turn) = self.answer(chat_id, &Conversation::default(), message).await?;
        Ok(NewChat {
            chat_id,
            messages: vec![user_turn, ai_turn],
        })
    }

    /// Answer a message in an existing chat. Returns the AI turn.
    pub async fn send_message(
        &self,
        user_id: i64,
        chat_id: i64,
        message: &str,
    ) -> Result<Turn, ChatError> {
        self.owned_chat(user_id, chat_id).await?;
        let conversation = Conversation::new(self.db.list_messages(chat_id).await?);
        let (_, ai_turn) = self.answer(chat_id, &conversation, message).await?;
        Ok(ai_turn)
    }

    async fn answer(
        &self,
        chat_id: i64,
        conversation: &Conversation,
        message: &str,
    ) -> Result<(Turn, Turn), ChatError> {
        let state = conversation.router_state();
        let decision = router::decide_message(message, state);
        info!(
            chat_id,
            decision = ?decision,
            prior = ?state.prior_turn_type,
            has_context = state.has_document_context,
            "Routed message"
        );

        let user_turn = NewTurn::user(message);
        let user_turn_id = self.db.insert_message(chat_id, &user_turn).await?;

        let reply = self
            .materializer
            .materialize(
                decision,
                message,
                conversation.turns(),
                conversation.document_context(),
            )
            .await
            .inspect_err(|e| warn!(chat_id, error = %e, "Materializer failed"))?;

        let reply_id = self.db.insert_message(chat_id, &reply).await?;
        Ok((user_turn.persisted(user_turn_id), reply.persisted(reply_id)))
    }

    /// Build a news report, attaching it to `chat_id` when given.
    pub async fn generate_report(
        &self,
        user_id: i64,
        chat_id: Option<i64>,
    ) -> Result<ReportTurn, ChatError> {
        if let Some(chat_id) = chat_id {
            self.owned_chat(user_id, chat_id).await?;
        }

        let report = self.reports.build().await?;
        let turn = NewTurn::pdf(REPORT_READY_TEXT, report.public_url, Some(report.summary));

        match chat_id {
            Some(chat_id) => {
                let id = self.db.insert_message(chat_id, &turn).await?;
                Ok(ReportTurn::Saved(turn.persisted(id)))
            }
            None => Ok(ReportTurn::Unsaved(turn)),
        }
    }

    /// Store an uploaded PDF and post it as a `pdf` turn. The extracted
    /// text becomes the document context.
    pub async fn attach_pdf(
        &self,
        user_id: i64,
        chat_id: Option<i64>,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedPdf, ChatError> {
        if let Some(chat_id) = chat_id {
            self.owned_chat(user_id, chat_id).await?;
        }

        let stored = self.uploads.save_pdf(&bytes).await?;
        let context = extract_pdf_text(bytes).await;
        let turn = NewTurn::pdf(
            format!("PDF Uploaded: {original_name}. Here is the preview."),
            stored.public_url,
            context,
        );

        match chat_id {
            Some(chat_id) => {
                let id = self.db.insert_message(chat_id, &turn).await?;
                Ok(UploadedPdf::Existing(turn.persisted(id)))
            }
            None => {
                let chat_id = self
                    .db
                    .create_chat(user_id, &chat_title(original_name))
                    .await?;
                let id = self.db.insert_message(chat_id, &turn).await?;
                info!(user_id, chat_id, "Chat started from PDF upload");
                Ok(UploadedPdf::NewChat(NewChat {
                    chat_id,
                    messages: vec![turn.persisted(id)],
                }))
            }
        }
    }
}

/// Plain text of a PDF, or `None` if nothing readable comes out.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Option<String> {
    let result =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(error = %e, "PDF text extraction failed");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "PDF text extraction panicked");
            return None;
        }
    };

    let cleaned = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::chat::materializer::{
        CLOSE_REPORT_TEXT, OFFER_CLOSE_TEXT, OFFER_REPORT_TEXT, START_REPORT_TEXT,
    };
    use crate::chat::model::{Sender, TurnType};
    use crate::error::{LlmError, NewsError};
    use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider};
    use crate::news::{Article, NewsProvider};
    use crate::store::LibSqlBackend;

    struct EchoLlm {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for EchoLlm {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::RequestFailed {
                    provider: "echo".into(),
                    reason: "down".into(),
                });
            }
            let content = if request.system_instruction.is_some()
                && request.message.contains("news analyst")
            {
                "# Brief\nOverview\n## 1: Story\nBody".to_string()
            } else {
                format!("echo: {}", request.message.lines().next().unwrap_or_default())
            };
            Ok(CompletionResponse {
                content,
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    struct NoNews;

    #[async_trait]
    impl NewsProvider for NoNews {
        async fn fetch_top_headlines(&self, _count: usize) -> Result<Vec<Article>, NewsError> {
            Ok(vec![Article {
                title: "Story".into(),
                description: "d".into(),
                source: "S".into(),
                content: "c".into(),
                url: "https://example.com".into(),
            }])
        }
    }

    struct Fixture {
        service: ChatService,
        db: Arc<dyn Database>,
        llm: Arc<EchoLlm>,
        user: i64,
        _dir: tempfile::TempDir,
    }

    async fn fixture(fail: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let user = db.create_user("U", "u@example.com", "h", None).await.unwrap();
        let llm = Arc::new(EchoLlm {
            calls: AtomicUsize::new(0),
            fail,
        });
        let uploads = UploadStore::new(dir.path());
        let reports = Arc::new(ReportBuilder::new(
            Arc::new(NoNews),
            llm.clone(),
            uploads.clone(),
            5,
        ));
        let service = ChatService::new(db.clone(), Materializer::new(llm.clone()), reports, uploads);
        Fixture {
            service,
            db,
            llm,
            user,
            _dir: dir,
        }
    }

    #[test]
    fn title_is_truncated_to_forty_chars() {
        assert_eq!(chat_title("hi"), "hi...");
        let long = "a".repeat(50);
        assert_eq!(chat_title(&long), format!("{}...", "a".repeat(40)));
    }

    #[tokio::test]
    async fn start_chat_persists_both_turns() {
        let f = fixture(false).await;
        let chat = f.service.start_chat(f.user, "What's the latest news today?").await.unwrap();

        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].sender, Sender::User);
        assert_eq!(chat.messages[1].turn_type, TurnType::PdfPrompt);
        assert_eq!(chat.messages[1].text, OFFER_REPORT_TEXT);

        let stored = f.service.history(f.user, chat.chat_id).await.unwrap();
        assert_eq!(stored, chat.messages);
        let chats = f.service.list_chats(f.user).await.unwrap();
        assert_eq!(chats[0].title, "What's the latest news today?...");
    }

    #[tokio::test]
    async fn full_report_flow_uses_persisted_state() {
        let f = fixture(false).await;
        let chat = f.service.start_chat(f.user, "news").await.unwrap();

        let loading = f.service.send_message(f.user, chat.chat_id, "yes").await.unwrap();
        assert_eq!(loading.turn_type, TurnType::PdfLoading);
        assert_eq!(loading.text, START_REPORT_TEXT);

        let report = f.service.generate_report(f.user, Some(chat.chat_id)).await.unwrap();
        let ReportTurn::Saved(pdf) = report else {
            panic!("report should be saved to the chat");
        };
        assert_eq!(pdf.turn_type, TurnType::Pdf);
        assert!(pdf.context.as_deref().unwrap().starts_with("# Brief"));

        let answer = f.service.send_message(f.user, chat.chat_id, "what happened?").await.unwrap();
        assert_eq!(answer.turn_type, TurnType::Text);
        assert!(answer.text.starts_with("echo: You are a helpful assistant."));

        let offer = f.service.send_message(f.user, chat.chat_id, "thank you").await.unwrap();
        assert_eq!(offer.text, OFFER_CLOSE_TEXT);

        let closed = f.service.send_message(f.user, chat.chat_id, "sure").await.unwrap();
        assert_eq!(closed.turn_type, TurnType::PdfClose);
        assert_eq!(closed.text, CLOSE_REPORT_TEXT);

        let after = f.service.send_message(f.user, chat.chat_id, "tell me a joke").await.unwrap();
        assert_eq!(after.text, "echo: tell me a joke");
    }

    #[tokio::test]
    async fn foreign_chat_is_denied() {
        let f = fixture(false).await;
        let other = f.db.create_user("O", "o@example.com", "h", None).await.unwrap();
        let chat = f.service.start_chat(other, "hello").await.unwrap();

        assert!(matches!(
            f.service.history(f.user, chat.chat_id).await,
            Err(ChatError::AccessDenied)
        ));
        assert!(matches!(
            f.service.send_message(f.user, chat.chat_id, "hi").await,
            Err(ChatError::AccessDenied)
        ));
        assert!(matches!(
            f.service.delete_chat(f.user, chat.chat_id).await,
            Err(ChatError::AccessDenied)
        ));
        assert!(matches!(
            f.service.history(f.user, 9999).await,
            Err(ChatError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn llm_failure_keeps_user_turn_only() {
        let f = fixture(true).await;
        let chat_id = f.db.create_chat(f.user, "t...").await.unwrap();

        let err = f.service.send_message(f.user, chat_id, "hello there").await.unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));

        let stored = f.db.list_messages(chat_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sender, Sender::User);
        assert_eq!(f.llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn report_without_chat_is_not_persisted() {
        let f = fixture(false).await;
        let report = f.service.generate_report(f.user, None).await.unwrap();
        let ReportTurn::Unsaved(turn) = report else {
            panic!("report without chat must not be saved");
        };
        assert_eq!(turn.text, REPORT_READY_TEXT);
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["type"], "pdf");
        assert!(json.get("id").is_none());
    }

    #[tokio::test]
    async fn unreadable_upload_creates_chat_without_context() {
        let f = fixture(false).await;
        let uploaded = f
            .service
            .attach_pdf(f.user, None, "notes.pdf", b"not really a pdf".to_vec())
            .await
            .unwrap();
        let UploadedPdf::NewChat(chat) = uploaded else {
            panic!("expected a new chat");
        };
        let turn = &chat.messages[0];
        assert_eq!(turn.text, "PDF Uploaded: notes.pdf. Here is the preview.");
        assert!(turn.url.as_deref().unwrap().starts_with("/uploads/pdfs/uploaded-"));
        assert!(turn.context.is_none());

        // No context attached, so plain chat continues.
        let reply = f.service.send_message(f.user, chat.chat_id, "hi").await.unwrap();
        assert_eq!(reply.text, "echo: hi");
        let chats = f.service.list_chats(f.user).await.unwrap();
        assert_eq!(chats[0].title, "notes.pdf...");
    }

    #[tokio::test]
    async fn delete_removes_chat() {
        let f = fixture(false).await;
        let chat = f.service.start_chat(f.user, "news").await.unwrap();
        f.service.delete_chat(f.user, chat.chat_id).await.unwrap();
        assert!(f.service.list_chats(f.user).await.unwrap().is_empty());
    }
}
