//! Traductor Server Library
//!
//! Self-hosted PDF translation server: uploads are parsed asynchronously
//! into page-level text chunks, and translations into target languages are
//! produced on demand and memoized.
//!
//! # Modules
//!
//! - `document`: document lifecycle registry and write-once chunk store
//! - `translation`: translation cache and machine-translation providers
//! - `jobs`: parse and translation job schedulers
//! - `extract`: PDF text extraction
//! - `routes`: HTTP API

pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod routes;
pub mod state;
pub mod translation;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/health", get(routes::health::health_check))
        .nest("/api/documents", routes::documents::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
