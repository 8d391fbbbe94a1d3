//! Headline summarization into the markdown-like report text.

use tracing::info;

use crate::error::LlmError;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::news::Article;

/// Summary used when no headlines could be fetched.
pub const NO_NEWS_SUMMARY: &str =
    "# No News Found\nI'm sorry, but I couldn't find any recent top headlines for India.";

const ANALYST_SYSTEM_INSTRUCTION: &str =
    "You are a helpful news analyst. Format your output as a detailed, multi-paragraph report.";

const SUMMARY_TEMPERATURE: f32 = 0.7;

/// Ask the model for a chaptered report over `articles`.
///
/// An empty article list short-circuits to [`NO_NEWS_SUMMARY`].
pub async fn summarize(llm: &dyn LlmProvider, articles: &[Article]) -> Result<String, LlmError> {
    if articles.is_empty() {
        info!("No headlines available, using fallback summary");
        return Ok(NO_NEWS_SUMMARY.to_string());
    }

    let prompt = analyst_prompt(articles)?;
    let request = CompletionRequest::new(Vec::new(), prompt)
        .with_system_instruction(ANALYST_SYSTEM_INSTRUCTION)
        .with_temperature(SUMMARY_TEMPERATURE);

    info!(articles = articles.len(), model = %llm.model_name(), "Summarizing headlines");
    let response = llm.complete(request).await?;
    info!(
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "Summary generated"
    );
    Ok(response.content)
}

/// The analyst prompt, with the articles as pretty-printed JSON and the
/// exact markdown shape the layout parser expects.
pub fn analyst_prompt(articles: &[Article]) -> Result<String, LlmError> {
    let articles_json = serde_json::to_string_pretty(articles)?;

    let chapter = |i: usize, fallback: &str| {
        let article = articles.get(i);
        let title = article.map(|a| a.title.as_str()).unwrap_or(fallback);
        let source = article
            .map(|a| a.source.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("N/A");
        format!(
            "## {n}: {title}\n(Source: {source})\n#### Detailed Elaboration\n(Write 4-5 paragraphs here...)\n",
            n = i + 1
        )
    };

    Ok(format!(
        "You are a professional news analyst. A user asked for \"top news in India\".\n\
         Here are the top {count} articles I found:\n\
         {articles_json}\n\
         Please provide a very detailed, multi-page report. Format your response *exactly* like the example below, using markdown-style headers.\n\
         For each article, you MUST write a 4-5 paragraph \"Detailed Elaboration\".\n\
         # AI News Report: Top Headlines from India\n\
         (Start with a brief, one-paragraph overview...)\n\
         {first}\
         {second}\
         (Continue for all {count} articles...)\n",
        count = articles.len(),
        first = chapter(0, "First Article"),
        second = chapter(1, "Second Article"),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::CompletionResponse;

    struct CapturingLlm {
        last: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmProvider for CapturingLlm {
        fn model_name(&self) -> &str {
            "capture"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            *self.last.lock().unwrap() = Some(request);
            Ok(CompletionResponse {
                content: "# Report\nIntro".into(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    fn article(title: &str, source: &str) -> Article {
        Article {
            title: title.into(),
            description: "desc".into(),
            source: source.into(),
            content: "content".into(),
            url: "https://example.com".into(),
        }
    }

    #[tokio::test]
    async fn no_articles_skips_the_model() {
        let llm = CapturingLlm {
            last: Mutex::new(None),
        };
        let summary = summarize(&llm, &[]).await.unwrap();
        assert_eq!(summary, NO_NEWS_SUMMARY);
        assert!(llm.last.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn summary_request_carries_instruction_and_temperature() {
        let llm = CapturingLlm {
            last: Mutex::new(None),
        };
        let summary = summarize(&llm, &[article("Rain", "Daily")]).await.unwrap();
        assert_eq!(summary, "# Report\nIntro");

        let request = llm.last.lock().unwrap().clone().unwrap();
        assert!(request.history.is_empty());
        assert_eq!(
            request.system_instruction.as_deref(),
            Some(ANALYST_SYSTEM_INSTRUCTION)
        );
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.message.contains("\"title\": \"Rain\""));
    }

    #[test]
    fn prompt_names_first_two_chapters() {
        let prompt = analyst_prompt(&[article("Rain", "Daily"), article("Markets", "")]).unwrap();
        assert!(prompt.contains("## 1: Rain\n(Source: Daily)"));
        assert!(prompt.contains("## 2: Markets\n(Source: N/A)"));
        assert!(prompt.contains("Here are the top 2 articles"));

        let single = analyst_prompt(&[article("Only", "X")]).unwrap();
        assert!(single.contains("## 2: Second Article\n(Source: N/A)"));
    }
}
