//! News headline provider.
//!
//! The report pipeline depends on `NewsProvider`; `GNewsClient` is the
//! production implementation over the GNews `top-headlines` endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::NewsConfig;
use crate::error::NewsError;

/// A headline as handed to the summarizer and the sources appendix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub source: String,
    pub content: String,
    pub url: String,
}

/// Source of top headlines.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_top_headlines(&self, count: usize) -> Result<Vec<Article>, NewsError>;
}

/// GNews REST client.
pub struct GNewsClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    country: String,
    lang: String,
}

impl GNewsClient {
    pub fn new(config: &NewsConfig) -> Result<Self, NewsError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NewsError::RequestFailed(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country: config.country.clone(),
            lang: config.lang.clone(),
        })
    }
}

#[async_trait]
impl NewsProvider for GNewsClient {
    async fn fetch_top_headlines(&self, count: usize) -> Result<Vec<Article>, NewsError> {
        let api_key = self.api_key.as_ref().ok_or(NewsError::MissingApiKey)?;
        let url = format!("{}/api/v4/top-headlines", self.base_url);
        let max = count.to_string();

        debug!(country = %self.country, lang = %self.lang, max = count, "Fetching headlines");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lang", self.lang.as_str()),
                ("country", self.country.as_str()),
                ("max", max.as_str()),
                ("apikey", api_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| NewsError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "News request failed");
            return Err(NewsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| NewsError::InvalidResponse(e.to_string()))?;
        let articles = parse_headlines(&body)?;
        debug!(count = articles.len(), "Headlines fetched");
        Ok(articles)
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<WireSource>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    name: Option<String>,
}

fn parse_headlines(body: &str) -> Result<Vec<Article>, NewsError> {
    let parsed: HeadlinesResponse =
        serde_json::from_str(body).map_err(|e| NewsError::InvalidResponse(e.to_string()))?;

    Ok(parsed
        .articles
        .into_iter()
        .map(|a| {
            let description = a.description.unwrap_or_default();
            let content = a
                .content
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| description.clone());
            Article {
                title: a.title.unwrap_or_default(),
                source: a.source.and_then(|s| s.name).unwrap_or_default(),
                url: a.url.unwrap_or_default(),
                description,
                content,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn parse_maps_source_name_and_content_fallback() {
        let body = json!({
            "totalArticles": 2,
            "articles": [
                {
                    "title": "Monsoon arrives",
                    "description": "Rain over Kerala",
                    "content": "Full text about rain",
                    "url": "https://example.com/rain",
                    "source": {"name": "Daily", "url": "https://example.com"}
                },
                {
                    "title": "Markets up",
                    "description": "Sensex rises",
                    "content": null,
                    "url": "https://example.com/markets",
                    "source": {"name": "Biz"}
                }
            ]
        })
        .to_string();

        let articles = parse_headlines(&body).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "Daily");
        assert_eq!(articles[0].content, "Full text about rain");
        assert_eq!(articles[1].content, "Sensex rises");
    }

    #[test]
    fn parse_without_articles_is_empty() {
        assert!(parse_headlines("{}").unwrap().is_empty());
        assert!(parse_headlines("not json").is_err());
    }

    async fn stub_headlines(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        Json(json!({
            "articles": [{
                "title": format!("{}-{}-{}", q["country"], q["lang"], q["max"]),
                "description": "d",
                "url": "https://example.com",
                "source": {"name": q["apikey"]}
            }]
        }))
    }

    fn config(base_url: String, api_key: Option<&str>) -> NewsConfig {
        NewsConfig {
            api_key: api_key.map(SecretString::from),
            base_url,
            timeout: Duration::from_secs(5),
            ..NewsConfig::default()
        }
    }

    #[tokio::test]
    async fn client_sends_query_parameters() {
        let app = Router::new().route("/api/v4/top-headlines", get(stub_headlines));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = GNewsClient::new(&config(format!("http://127.0.0.1:{port}"), Some("k1"))).unwrap();
        let articles = client.fetch_top_headlines(3).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "in-en-3");
        assert_eq!(articles[0].source, "k1");
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let client = GNewsClient::new(&config("http://127.0.0.1:9".into(), None)).unwrap();
        assert!(matches!(
            client.fetch_top_headlines(5).await,
            Err(NewsError::MissingApiKey)
        ));
    }
}
