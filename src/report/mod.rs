//! News report pipeline: headlines → LLM summary → layout → PDF file.

pub mod layout;
pub mod pdf;
pub mod summary;

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ReportError, UploadError};
use crate::llm::LlmProvider;
use crate::news::{Article, NewsProvider};
use crate::uploads::UploadStore;

pub use layout::ReportLayout;

/// A report written to the uploads tree.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    /// `/uploads/pdfs/news_report_<millis>.pdf`
    pub public_url: String,
    /// The summary text; becomes the document context of the `pdf` turn.
    pub summary: String,
    pub article_count: usize,
}

/// Builds news reports with injected collaborators.
pub struct ReportBuilder {
    news: Arc<dyn NewsProvider>,
    llm: Arc<dyn LlmProvider>,
    uploads: UploadStore,
    max_articles: usize,
}

impl ReportBuilder {
    pub fn new(
        news: Arc<dyn NewsProvider>,
        llm: Arc<dyn LlmProvider>,
        uploads: UploadStore,
        max_articles: usize,
    ) -> Self {
        Self {
            news,
            llm,
            uploads,
            max_articles,
        }
    }

    /// Fetch, summarize, render and store a report.
    pub async fn build(&self) -> Result<RenderedReport, ReportError> {
        let articles = self.fetch_articles().await;
        let summary = summary::summarize(self.llm.as_ref(), &articles).await?;

        let layout = ReportLayout::parse(&summary);
        let generated_on = chrono::Local::now()
            .format("%d/%m/%Y, %I:%M:%S %p")
            .to_string();
        let article_count = articles.len();

        let rendered = tokio::task::spawn_blocking(move || {
            pdf::render_report(&layout, &articles, &generated_on)
        })
        .await
        .map_err(|e| ReportError::Render(format!("render task failed: {e}")))??;

        let stored = self
            .uploads
            .save_report(&rendered.bytes)
            .await
            .map_err(|e| match e {
                UploadError::Io(io) => ReportError::Io(io),
                other => ReportError::Render(other.to_string()),
            })?;

        info!(
            url = %stored.public_url,
            pages = rendered.pages,
            articles = article_count,
            "News report generated"
        );
        Ok(RenderedReport {
            public_url: stored.public_url,
            summary,
            article_count,
        })
    }

    /// Headlines, or an empty list when the provider fails.
    async fn fetch_articles(&self) -> Vec<Article> {
        match self.news.fetch_top_headlines(self.max_articles).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(error = %e, "News fetch failed, reporting without headlines");
                Vec::new()
            }
        }
    }
}
