//! On-disk storage for uploaded photos, uploaded PDFs and generated
//! reports.
//!
//! Layout under the uploads root:
//!
//! ```text
//! <root>/<millis>-<name>                      profile photos
//! <root>/pdfs/uploaded-<millis>-<rand>.pdf    user PDFs
//! <root>/pdfs/news_report_<millis>.pdf        generated reports
//! ```
//!
//! Everything under the root is served at `/uploads/...`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::error::UploadError;

/// Maximum size accepted for a single uploaded file (10 MiB).
pub const UPLOAD_FILE_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// URL prefix the uploads root is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

const PDF_SUBDIR: &str = "pdfs";

/// A file written into the uploads tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub file_name: String,
    pub public_url: String,
}

/// Uploads directory handle.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join(PDF_SUBDIR)
    }

    /// Create the root and `pdfs/` directories.
    pub async fn ensure_dirs(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(self.pdf_dir()).await?;
        Ok(())
    }

    /// Store a profile photo as `<millis>-<sanitized name>`.
    pub async fn save_photo(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, UploadError> {
        check_size(bytes)?;
        let file_name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(original_name, "photo")
        );
        self.write(self.root.clone(), None, file_name, bytes).await
    }

    /// Store a user PDF under a generated unique name.
    pub async fn save_pdf(&self, bytes: &[u8]) -> Result<StoredFile, UploadError> {
        check_size(bytes)?;
        let suffix: u32 = rand::random::<u32>() % 1_000_000_000;
        let file_name = format!("uploaded-{}-{suffix}.pdf", Utc::now().timestamp_millis());
        self.write(self.pdf_dir(), Some(PDF_SUBDIR), file_name, bytes)
            .await
    }

    /// Store a generated news report.
    pub async fn save_report(&self, bytes: &[u8]) -> Result<StoredFile, UploadError> {
        let file_name = format!("news_report_{}.pdf", Utc::now().timestamp_millis());
        self.write(self.pdf_dir(), Some(PDF_SUBDIR), file_name, bytes)
            .await
    }

    async fn write(
        &self,
        dir: PathBuf,
        subdir: Option<&str>,
        file_name: String,
        bytes: &[u8],
    ) -> Result<StoredFile, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        let public_url = match subdir {
            Some(sub) => format!("{PUBLIC_PREFIX}/{sub}/{file_name}"),
            None => format!("{PUBLIC_PREFIX}/{file_name}"),
        };
        debug!(path = %path.display(), size = bytes.len(), "Upload stored");
        Ok(StoredFile {
            path,
            file_name,
            public_url,
        })
    }
}

fn check_size(bytes: &[u8]) -> Result<(), UploadError> {
    if bytes.len() > UPLOAD_FILE_SIZE_LIMIT {
        return Err(UploadError::TooLarge {
            size: bytes.len(),
            limit: UPLOAD_FILE_SIZE_LIMIT,
        });
    }
    Ok(())
}

/// Basename only, alphanumerics plus `.`, `-`, `_`; spaces become `_`.
pub fn sanitize_file_name(raw: &str, fallback: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            ' ' => Some('_'),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}
