//! Translation job scheduler
//!
//! Drives translation entries from Pending to Ready or Failed. The cache
//! claim (insert-if-absent, or Failed -> Pending re-arm) is the dedup key:
//! at most one job is ever in flight per (document, page, lang), so
//! duplicate triggers cause at most one external translator invocation and
//! one Ready write.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::JobConfig;
use crate::document::ChunkStore;
use crate::error::Result;
use crate::translation::{TranslateError, TranslationCache, Translator};

/// Schedules and runs translation jobs
#[derive(Clone)]
pub struct TranslateScheduler {
    inner: Arc<TranslateSchedulerInner>,
}

struct TranslateSchedulerInner {
    pool: SqlitePool,
    translator: Arc<dyn Translator>,
    semaphore: Semaphore,
    timeout_secs: u64,
}

impl TranslateScheduler {
    pub fn new(pool: SqlitePool, translator: Arc<dyn Translator>, config: &JobConfig) -> Self {
        Self {
            inner: Arc::new(TranslateSchedulerInner {
                pool,
                translator,
                semaphore: Semaphore::new(config.max_translate_workers),
                timeout_secs: config.translate_timeout_secs,
            }),
        }
    }

    /// Enqueue translation jobs for one page, or for every page of the
    /// document when `page` is None.
    ///
    /// Each target page gets its own (document, page, lang) key; keys that
    /// are already in flight or Ready are skipped. Returns the number of
    /// jobs actually spawned. Never blocks on job completion.
    pub async fn enqueue(&self, document_id: &str, page: Option<u32>, lang: &str) -> Result<usize> {
        let store = ChunkStore::new(&self.inner.pool);
        let pages = match page {
            Some(page) => {
                // Fails with NotFound when the page has no committed chunks
                store.read_by_page(document_id, page).await?;
                vec![page]
            }
            None => store.pages(document_id).await?,
        };

        let cache = TranslationCache::new(&self.inner.pool);
        let mut spawned = 0;
        for page in pages {
            if !cache.claim(document_id, page, lang).await? {
                tracing::debug!(document_id, page, lang, "Translate trigger is a no-op");
                continue;
            }

            let inner = self.inner.clone();
            let document_id = document_id.to_string();
            let lang = lang.to_string();
            tokio::spawn(async move {
                let _permit = match inner.semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                run_translate(&inner, &document_id, page, &lang).await;
            });
            spawned += 1;
        }

        Ok(spawned)
    }
}

async fn run_translate(inner: &TranslateSchedulerInner, document_id: &str, page: u32, lang: &str) {
    let cache = TranslationCache::new(&inner.pool);
    match translate_page(inner, document_id, page, lang).await {
        Ok(texts) => {
            if let Err(e) = cache.complete(document_id, page, lang, &texts).await {
                tracing::error!(document_id, page, lang, error = %e, "Failed to store translation");
                // Settle the key as Failed so it stays re-triggerable
                // instead of wedging in Pending
                let message = format!("Failed to store translation: {}", e);
                if let Err(e) = cache.fail(document_id, page, lang, &message).await {
                    tracing::error!(document_id, page, lang, error = %e, "Failed to record translation failure");
                }
                return;
            }
            tracing::info!(document_id, page, lang, chunks = texts.len(), "Translation job succeeded");
        }
        Err(message) => {
            tracing::warn!(document_id, page, lang, error = %message, "Translation job failed");
            if let Err(e) = cache.fail(document_id, page, lang, &message).await {
                tracing::error!(document_id, page, lang, error = %e, "Failed to record translation failure");
            }
        }
    }
}

/// Run one translation job; the error string becomes the entry's captured
/// error field
async fn translate_page(
    inner: &TranslateSchedulerInner,
    document_id: &str,
    page: u32,
    lang: &str,
) -> std::result::Result<Vec<String>, String> {
    let store = ChunkStore::new(&inner.pool);
    let chunks = store
        .read_by_page(document_id, page)
        .await
        .map_err(|e| e.to_string())?;
    let texts: Vec<String> = chunks.into_iter().map(|c| c.text).collect();

    let translated = timeout(
        Duration::from_secs(inner.timeout_secs),
        inner.translator.translate(&texts, lang),
    )
    .await
    .map_err(|_| TranslateError::Timeout(inner.timeout_secs).to_string())?
    .map_err(|e| e.to_string())?;

    if translated.len() != texts.len() {
        return Err(TranslateError::ShapeMismatch {
            expected: texts.len(),
            got: translated.len(),
        }
        .to_string());
    }

    Ok(translated)
}
