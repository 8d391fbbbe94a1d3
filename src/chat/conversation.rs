//! Conversation state derived from persisted turns.

use super::model::{Turn, TurnType};
use super::router::RouterState;

/// An ordered, persisted conversation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The active document context.
    ///
    /// A `pdf` turn replaces the context with its own (possibly empty) one;
    /// a `pdf_close` turn clears it.
    pub fn document_context(&self) -> Option<&str> {
        let mut context: Option<&str> = None;
        for turn in &self.turns {
            match turn.turn_type {
                TurnType::Pdf => context = turn.context.as_deref().filter(|c| !c.trim().is_empty()),
                TurnType::PdfClose => context = None,
                _ => {}
            }
        }
        context
    }

    pub fn router_state(&self) -> RouterState {
        RouterState::new(self.last_turn(), self.document_context().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::model::NewTurn;

    fn conv(turns: Vec<NewTurn>) -> Conversation {
        Conversation::new(
            turns
                .into_iter()
                .enumerate()
                .map(|(i, t)| t.persisted(i as i64 + 1))
                .collect(),
        )
    }

    #[test]
    fn empty_conversation_has_no_state() {
        let c = Conversation::default();
        assert!(c.document_context().is_none());
        assert_eq!(c.router_state(), RouterState::default());
    }

    #[test]
    fn pdf_turn_sets_context() {
        let c = conv(vec![
            NewTurn::user("news"),
            NewTurn::pdf("ready", "/uploads/pdfs/a.pdf", Some("summary A".into())),
            NewTurn::user("what is chapter 1?"),
            NewTurn::ai(TurnType::Text, "chapter 1 is..."),
        ]);
        assert_eq!(c.document_context(), Some("summary A"));
        let state = c.router_state();
        assert!(state.has_document_context);
        assert_eq!(state.prior_turn_type, Some(TurnType::Text));
    }

    #[test]
    fn pdf_close_clears_context() {
        let c = conv(vec![
            NewTurn::pdf("ready", "/a.pdf", Some("summary".into())),
            NewTurn::user("thanks"),
            NewTurn::ai(TurnType::PdfClosePrompt, "close?"),
            NewTurn::user("sure"),
            NewTurn::ai(TurnType::PdfClose, "closed"),
        ]);
        assert!(c.document_context().is_none());
        assert_eq!(c.router_state().prior_turn_type, Some(TurnType::PdfClose));
    }

    #[test]
    fn latest_pdf_wins() {
        let c = conv(vec![
            NewTurn::pdf("first", "/a.pdf", Some("A".into())),
            NewTurn::ai(TurnType::PdfClose, "closed"),
            NewTurn::pdf("second", "/b.pdf", Some("B".into())),
        ]);
        assert_eq!(c.document_context(), Some("B"));
    }

    #[test]
    fn pdf_without_context_detaches_previous_one() {
        let c = conv(vec![
            NewTurn::pdf("first", "/a.pdf", Some("A".into())),
            NewTurn::pdf("upload", "/b.pdf", None),
        ]);
        assert!(c.document_context().is_none());
    }

    #[test]
    fn trailing_user_turn_hides_prior_type() {
        let c = conv(vec![
            NewTurn::ai(TurnType::PdfPrompt, "shall I?"),
            NewTurn::user("hmm"),
        ]);
        assert_eq!(c.router_state().prior_turn_type, None);
    }
}
