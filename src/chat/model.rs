//! Chat data model: turns, their categories and senders.

use serde::{Deserialize, Serialize};

/// Category of a turn. Stored in the `messages.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnType {
    Text,
    PdfPrompt,
    PdfLoading,
    Pdf,
    PdfClosePrompt,
    PdfClose,
    LoginRequired,
}

impl TurnType {
    pub const ALL: [TurnType; 7] = [
        Self::Text,
        Self::PdfPrompt,
        Self::PdfLoading,
        Self::Pdf,
        Self::PdfClosePrompt,
        Self::PdfClose,
        Self::LoginRequired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::PdfPrompt => "pdf_prompt",
            Self::PdfLoading => "pdf_loading",
            Self::Pdf => "pdf",
            Self::PdfClosePrompt => "pdf_close_prompt",
            Self::PdfClose => "pdf_close",
            Self::LoginRequired => "login_required",
        }
    }

    /// Parse a stored type string. Unknown values degrade to `Text`.
    pub fn from_db(s: &str) -> Self {
        match s {
            "pdf_prompt" => Self::PdfPrompt,
            "pdf_loading" => Self::PdfLoading,
            "pdf" => Self::Pdf,
            "pdf_close_prompt" => Self::PdfClosePrompt,
            "pdf_close" => Self::PdfClose,
            "login_required" => Self::LoginRequired,
            _ => Self::Text,
        }
    }
}

impl Default for TurnType {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for TurnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    /// Anything that is not `user` is treated as the assistant side.
    pub fn from_db(s: &str) -> Self {
        if s == "user" { Self::User } else { Self::Ai }
    }
}

/// A persisted turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub sender: Sender,
    pub text: String,
    #[serde(rename = "type")]
    pub turn_type: TurnType,
    pub url: Option<String>,
    pub context: Option<String>,
}

impl Turn {
    pub fn is_ai(&self) -> bool {
        self.sender == Sender::Ai
    }
}

/// A turn that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTurn {
    pub sender: Sender,
    pub text: String,
    #[serde(rename = "type")]
    pub turn_type: TurnType,
    pub url: Option<String>,
    pub context: Option<String>,
}

impl NewTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            turn_type: TurnType::Text,
            url: None,
            context: None,
        }
    }

    pub fn ai(turn_type: TurnType, text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
            turn_type,
            url: None,
            context: None,
        }
    }

    /// An AI `pdf` turn carrying the file URL and its document context.
    pub fn pdf(text: impl Into<String>, url: impl Into<String>, context: Option<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
            turn_type: TurnType::Pdf,
            url: Some(url.into()),
            context,
        }
    }

    pub fn persisted(self, id: i64) -> Turn {
        Turn {
            id,
            sender: self.sender,
            text: self.text,
            turn_type: self.turn_type,
            url: self.url,
            context: self.context,
        }
    }
}
