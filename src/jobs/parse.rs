//! Parse job scheduler
//!
//! Drives a document from Pending to Ready or Failed. The Pending -> Parsing
//! compare-and-set on the document row is the dedup claim: whichever trigger
//! wins the CAS owns the job, every other trigger is a no-op, and the
//! terminal transition releases the key for good (the registry's edge set
//! rejects re-triggering a terminal document).

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::JobConfig;
use crate::document::{ChunkStore, DocumentRegistry, DocumentStatus};
use crate::error::ApiError;
use crate::extract::{ExtractError, Extractor};

/// Schedules and runs parse jobs
#[derive(Clone)]
pub struct ParseScheduler {
    inner: Arc<ParseSchedulerInner>,
}

struct ParseSchedulerInner {
    pool: SqlitePool,
    extractor: Arc<dyn Extractor>,
    semaphore: Semaphore,
    timeout_secs: u64,
}

impl ParseScheduler {
    pub fn new(pool: SqlitePool, extractor: Arc<dyn Extractor>, config: &JobConfig) -> Self {
        Self {
            inner: Arc::new(ParseSchedulerInner {
                pool,
                extractor,
                semaphore: Semaphore::new(config.max_parse_workers),
                timeout_secs: config.extract_timeout_secs,
            }),
        }
    }

    /// Enqueue a parse job for a document and return immediately.
    ///
    /// The job's first act is the Pending -> Parsing compare-and-set; a
    /// duplicate trigger spawns a task that loses the CAS and exits without
    /// touching anything, so re-triggering is always a safe no-op.
    pub fn enqueue(&self, document_id: &str) {
        let inner = self.inner.clone();
        let document_id = document_id.to_string();
        tokio::spawn(async move {
            let _permit = match inner.semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            run_parse(&inner, &document_id).await;
        });
    }
}

async fn run_parse(inner: &ParseSchedulerInner, document_id: &str) {
    let registry = DocumentRegistry::new(&inner.pool);
    match registry
        .transition(document_id, DocumentStatus::Parsing, None)
        .await
    {
        Ok(_) => {}
        Err(ApiError::InvalidTransition(_)) => {
            // Lost the claim: another job owns the document, or it is terminal
            tracing::debug!(document_id, "Parse trigger is a no-op; claim already taken");
            return;
        }
        Err(e) => {
            tracing::error!(document_id, error = %e, "Failed to claim parse job");
            return;
        }
    }

    match parse_document(inner, document_id).await {
        Ok(pages) => {
            tracing::info!(document_id, pages, "Parse job succeeded");
        }
        Err(message) => {
            tracing::warn!(document_id, error = %message, "Parse job failed");
            if let Err(e) = registry
                .transition(document_id, DocumentStatus::Failed, Some(&message))
                .await
            {
                tracing::error!(document_id, error = %e, "Failed to record parse failure");
            }
        }
    }
}

/// Run one parse job to completion; the error string becomes the
/// document's captured error field
async fn parse_document(inner: &ParseSchedulerInner, document_id: &str) -> std::result::Result<usize, String> {
    let registry = DocumentRegistry::new(&inner.pool);
    let store = ChunkStore::new(&inner.pool);

    let document = registry.get(document_id).await.map_err(|e| e.to_string())?;

    let bytes = tokio::fs::read(&document.file_path)
        .await
        .map_err(|e| format!("Failed to read upload: {}", e))?;

    let pages = timeout(
        Duration::from_secs(inner.timeout_secs),
        inner.extractor.extract(&bytes),
    )
    .await
    .map_err(|_| ExtractError::Timeout(inner.timeout_secs).to_string())?
    .map_err(|e| e.to_string())?;

    // All-or-nothing: chunks become visible only after this commit
    store
        .write_all(document_id, &pages)
        .await
        .map_err(|e| e.to_string())?;

    registry
        .set_page_count(document_id, pages.len() as u32)
        .await
        .map_err(|e| e.to_string())?;

    registry
        .transition(document_id, DocumentStatus::Ready, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(pages.len())
}
