//! Turn router: picks exactly one response for each incoming message.
//!
//! There is no stored state machine. The "state" is rebuilt per call from
//! the type of the immediately preceding AI turn and whether a document
//! context is attached; the table below is evaluated top to bottom and
//! the first matching row wins:
//!
//! | # | Condition                                   | Decision        |
//! |---|---------------------------------------------|-----------------|
//! | 1 | context attached and gratitude              | `OfferClose`    |
//! | 2 | prior `pdf_close_prompt` and positive       | `CloseReport`   |
//! | 3 | prior `pdf_close_prompt`                    | `KeepDiscussing`|
//! | 4 | context attached                            | `GroundedAnswer`|
//! | 5 | prior `pdf_prompt` and positive             | `StartReport`   |
//! | 6 | prior `pdf_prompt`                          | `DeclineReport` |
//! | 7 | news                                        | `OfferReport`   |
//! | 8 | otherwise                                   | `GeneralChat`   |

use super::intent::Intents;
use super::model::{Turn, TurnType};

/// What the assistant should do with the incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Ask whether the open report can be closed.
    OfferClose,
    /// Close the open report and clear its context.
    CloseReport,
    /// The user declined closing; keep the report open.
    KeepDiscussing,
    /// Answer from the attached document context.
    GroundedAnswer,
    /// The user accepted the report offer; start building it.
    StartReport,
    /// The user declined the report offer.
    DeclineReport,
    /// Offer to build a news report.
    OfferReport,
    /// Plain conversation with the model.
    GeneralChat,
}

impl Decision {
    /// Category of the AI turn this decision produces.
    pub fn category(&self) -> TurnType {
        match self {
            Self::OfferClose => TurnType::PdfClosePrompt,
            Self::CloseReport => TurnType::PdfClose,
            Self::StartReport => TurnType::PdfLoading,
            Self::OfferReport => TurnType::PdfPrompt,
            Self::KeepDiscussing | Self::GroundedAnswer | Self::DeclineReport | Self::GeneralChat => {
                TurnType::Text
            }
        }
    }
}

/// Reconstructed router state for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterState {
    /// Type of the immediately preceding turn, only if it was an AI turn.
    pub prior_turn_type: Option<TurnType>,
    pub has_document_context: bool,
}

impl RouterState {
    pub fn new(prior_turn: Option<&Turn>, has_document_context: bool) -> Self {
        Self {
            prior_turn_type: prior_turn.filter(|t| t.is_ai()).map(|t| t.turn_type),
            has_document_context,
        }
    }
}

/// Evaluate the decision table.
pub fn decide(intents: Intents, state: RouterState) -> Decision {
    let prior = state.prior_turn_type;

    if state.has_document_context && intents.gratitude {
        return Decision::OfferClose;
    }
    if prior == Some(TurnType::PdfClosePrompt) {
        return if intents.positive {
            Decision::CloseReport
        } else {
            Decision::KeepDiscussing
        };
    }
    if state.has_document_context {
        return Decision::GroundedAnswer;
    }
    if prior == Some(TurnType::PdfPrompt) {
        return if intents.positive {
            Decision::StartReport
        } else {
            Decision::DeclineReport
        };
    }
    if intents.news {
        return Decision::OfferReport;
    }
    Decision::GeneralChat
}

/// Decide for a raw message.
pub fn decide_message(message: &str, state: RouterState) -> Decision {
    decide(Intents::classify(message), state)
}

/// Category of the response to `message`.
pub fn route(message: &str, prior_turn: Option<&Turn>, has_document_context: bool) -> TurnType {
    decide_message(message, RouterState::new(prior_turn, has_document_context)).category()
}
