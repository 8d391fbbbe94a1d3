//! Shared handler state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::SessionManager;
use crate::chat::{ChatService, Materializer};
use crate::config::AppConfig;
use crate::error::Result;
use crate::llm::{LlmConfig, create_provider};
use crate::news::GNewsClient;
use crate::report::ReportBuilder;
use crate::store::{Database, LibSqlBackend};
use crate::uploads::UploadStore;

/// Everything a handler can reach. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub chat: Arc<ChatService>,
    pub sessions: SessionManager,
    pub uploads: UploadStore,
}

impl AppState {
    /// Open the database, prepare the uploads tree and wire the production
    /// collaborators.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(crate::error::UploadError::from)?;
        }
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
        info!(path = %config.db_path.display(), "Database ready");

        let sessions = SessionManager::new(Arc::clone(&db), config.session_ttl);
        match sessions.prune().await {
            Ok(0) => {}
            Ok(n) => info!(removed = n, "Pruned expired sessions"),
            Err(e) => warn!(error = %e, "Session prune failed"),
        }

        let uploads = UploadStore::new(config.uploads_dir.clone());
        uploads.ensure_dirs().await?;

        let llm = create_provider(&LlmConfig::from(config))?;
        let news = Arc::new(GNewsClient::new(&config.news)?);
        let reports = Arc::new(ReportBuilder::new(
            news,
            llm.clone(),
            uploads.clone(),
            config.news.max_articles,
        ));
        let chat = Arc::new(ChatService::new(
            Arc::clone(&db),
            Materializer::new(llm),
            reports,
            uploads.clone(),
        ));

        Ok(Self {
            db,
            chat,
            sessions,
            uploads,
        })
    }
}
