//! Replies for visitors without an account.
//!
//! Guests never reach the LLM. A handful of pleasantries get a canned
//! answer; everything else asks them to log in.

use serde::Deserialize;

use super::model::{NewTurn, Sender, TurnType};

pub const GUEST_GREETING_TEXT: &str =
    "Hello! To access my full capabilities, please log in or sign up.";
pub const GUEST_FAREWELL_TEXT: &str = "Goodbye! Hope to see you again as a registered user.";
pub const GUEST_THANKS_TEXT: &str = "You're welcome! Please log in to access all features.";
pub const GUEST_LOGIN_TEXT: &str =
    "This feature is available for registered users. Please log in or create an account to continue.";
pub const GUEST_REPORT_TEXT: &str =
    "This feature is available for registered users. Please log in to continue.";

const GREETINGS: &[&str] = &["hello", "hii", "hey"];
const FAREWELLS: &[&str] = &["bye", "goodbye"];
const THANKS: &[&str] = &["thank", "thanks"];

/// A turn as the guest client sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestTurn {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub text: String,
}

/// Answer the latest guest message.
pub fn guest_reply(messages: &[GuestTurn]) -> NewTurn {
    let last = messages
        .iter()
        .rev()
        .find(|m| Sender::from_db(&m.sender) == Sender::User)
        .map(|m| m.text.to_lowercase())
        .unwrap_or_default();

    let matches = |words: &[&str]| words.iter().any(|w| last.contains(w));

    if matches(GREETINGS) {
        NewTurn::ai(TurnType::Text, GUEST_GREETING_TEXT)
    } else if matches(FAREWELLS) {
        NewTurn::ai(TurnType::Text, GUEST_FAREWELL_TEXT)
    } else if matches(THANKS) {
        NewTurn::ai(TurnType::Text, GUEST_THANKS_TEXT)
    } else {
        NewTurn::ai(TurnType::LoginRequired, GUEST_LOGIN_TEXT)
    }
}

/// Guests asking for a report are told to log in.
pub fn guest_report_reply() -> NewTurn {
    NewTurn::ai(TurnType::LoginRequired, GUEST_REPORT_TEXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> GuestTurn {
        GuestTurn {
            sender: "user".into(),
            text: text.into(),
        }
    }

    #[test]
    fn greeting_gets_signup_nudge() {
        let reply = guest_reply(&[user("Hey there")]);
        assert_eq!(reply.turn_type, TurnType::Text);
        assert_eq!(reply.text, GUEST_GREETING_TEXT);
    }

    #[test]
    fn farewell_and_thanks() {
        assert_eq!(guest_reply(&[user("ok BYE")]).text, GUEST_FAREWELL_TEXT);
        assert_eq!(guest_reply(&[user("thank you")]).text, GUEST_THANKS_TEXT);
    }

    #[test]
    fn anything_else_requires_login() {
        let reply = guest_reply(&[user("what's the latest news?")]);
        assert_eq!(reply.turn_type, TurnType::LoginRequired);
        assert_eq!(reply.text, GUEST_LOGIN_TEXT);
    }

    #[test]
    fn only_the_last_user_message_counts() {
        let messages = vec![
            user("hello"),
            GuestTurn {
                sender: "ai".into(),
                text: "thanks for stopping by".into(),
            },
            user("summarise this pdf"),
        ];
        assert_eq!(guest_reply(&messages).turn_type, TurnType::LoginRequired);
    }

    #[test]
    fn empty_transcript_requires_login() {
        assert_eq!(guest_reply(&[]).turn_type, TurnType::LoginRequired);
    }

    #[test]
    fn guest_turn_accepts_client_shape() {
        let turn: GuestTurn =
            serde_json::from_str(r#"{"sender":"user","text":"hii","type":"text"}"#).unwrap();
        assert_eq!(turn.sender, "user");
        assert_eq!(guest_reply(&[turn]).text, GUEST_GREETING_TEXT);
    }

    #[test]
    fn report_request_requires_login() {
        let reply = guest_report_reply();
        assert_eq!(reply.turn_type, TurnType::LoginRequired);
        assert_eq!(reply.sender, Sender::Ai);
    }
}
