//! Keyword intent classifiers.
//!
//! Matching is a case-insensitive substring test, not a word-boundary
//! test: "okays" matches "ok" and "finesse" matches "fine".

const NEWS_KEYWORDS: &[&str] = &["news", "latest", "headlines", "today", "khabar"];

const POSITIVE_KEYWORDS: &[&str] = &[
    "yes", "sure", "ok", "please", "generate", "yep", "okay", "fine", "haan",
];

const GRATITUDE_KEYWORDS: &[&str] = &[
    "thank",
    "thanks",
    "shukriya",
    "dhanyavaad",
    "helpful",
    "appreciate",
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// The message asks for news.
pub fn is_news_intent(text: &str) -> bool {
    contains_any(text, NEWS_KEYWORDS)
}

/// The message agrees to a pending offer.
pub fn is_positive_intent(text: &str) -> bool {
    contains_any(text, POSITIVE_KEYWORDS)
}

/// The message thanks the assistant.
pub fn is_gratitude_intent(text: &str) -> bool {
    contains_any(text, GRATITUDE_KEYWORDS)
}

/// All classifier signals for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Intents {
    pub news: bool,
    pub positive: bool,
    pub gratitude: bool,
}

impl Intents {
    pub fn classify(text: &str) -> Self {
        Self {
            news: is_news_intent(text),
            positive: is_positive_intent(text),
            gratitude: is_gratitude_intent(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_keywords_any_case() {
        assert!(is_news_intent("What's the latest NEWS today?"));
        assert!(is_news_intent("Show me HEADLINES"));
        assert!(is_news_intent("aaj ki khabar"));
        assert!(!is_news_intent("tell me a joke"));
    }

    #[test]
    fn positive_keywords() {
        assert!(is_positive_intent("Yes"));
        assert!(is_positive_intent("ok please"));
        assert!(is_positive_intent("haan bhai"));
        assert!(!is_positive_intent("no"));
        assert!(!is_positive_intent("nope, skip it"));
    }

    #[test]
    fn gratitude_keywords() {
        assert!(is_gratitude_intent("Thank you!"));
        assert!(is_gratitude_intent("that was helpful"));
        assert!(is_gratitude_intent("Shukriya"));
        assert!(!is_gratitude_intent("what does chapter 2 say?"));
    }

    #[test]
    fn substring_matching_is_preserved() {
        // Not word-boundary aware.
        assert!(is_positive_intent("okays"));
        assert!(is_positive_intent("finesse"));
        assert!(is_positive_intent("no thanks, I'm okay"));
        assert!(is_news_intent("newsletter"));
    }

    #[test]
    fn no_thanks_is_not_positive() {
        assert!(!is_positive_intent("no thanks"));
        assert!(is_gratitude_intent("no thanks"));
    }

    #[test]
    fn classify_collects_all_signals() {
        let intents = Intents::classify("thanks, yes the latest please");
        assert_eq!(
            intents,
            Intents {
                news: true,
                positive: true,
                gratitude: true
            }
        );
        assert_eq!(Intents::classify(""), Intents::default());
    }
}
