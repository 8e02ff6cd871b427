//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::extract::Extractor;
use crate::jobs::{ParseScheduler, TranslateScheduler};
use crate::translation::Translator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    parse_scheduler: ParseScheduler,
    translate_scheduler: TranslateScheduler,
}

impl AppState {
    /// Create application state with the given external collaborators.
    ///
    /// The extractor and translator are injected so tests can run the full
    /// router against stub providers.
    pub fn new(
        config: Config,
        db: SqlitePool,
        extractor: Arc<dyn Extractor>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let parse_scheduler = ParseScheduler::new(db.clone(), extractor, &config.jobs);
        let translate_scheduler = TranslateScheduler::new(db.clone(), translator, &config.jobs);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                parse_scheduler,
                translate_scheduler,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn parse_scheduler(&self) -> &ParseScheduler {
        &self.inner.parse_scheduler
    }

    pub fn translate_scheduler(&self) -> &TranslateScheduler {
        &self.inner.translate_scheduler
    }
}
