//! Document API endpoints
//!
//! - `POST /api/documents` - upload a PDF and enqueue its parse job
//! - `GET /api/documents/{id}` - read lifecycle status
//! - `GET /api/documents/{id}/chunks?page=&lang=` - read extracted chunks,
//!   translated when `lang` is given and a cached translation exists,
//!   raw otherwise
//! - `POST /api/documents/{id}/translate?page=&lang=` - enqueue translation
//!   job(s) and return immediately
//!
//! Handlers never block on job completion; they only perform the atomic
//! registry/cache reads and writes of their own request.

use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Chunk, ChunkStore, Document, DocumentRegistry, DocumentStatus};
use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::translation::{is_valid_lang, TranslationCache};

/// Maximum accepted upload size (64 MiB)
const MAX_UPLOAD_SIZE: usize = 64 * 1024 * 1024;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Upload response
#[derive(Serialize)]
pub struct UploadResponse {
    pub document_id: String,
}

/// Document status response
#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub status: String,
    pub page_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            filename: doc.filename,
            status: doc.status,
            page_count: doc.page_count,
            error: doc.error,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Query parameters for chunk listing
#[derive(Debug, Deserialize)]
pub struct ChunksQuery {
    pub page: Option<u32>,
    pub lang: Option<String>,
}

/// One chunk in a listing, raw or translated
#[derive(Serialize)]
pub struct ChunkResponse {
    pub page: i64,
    pub chunk_index: i64,
    pub text: String,
    /// Whether `text` came from a cached translation rather than raw
    /// extracted text
    pub translated: bool,
}

/// Chunk listing response
#[derive(Serialize)]
pub struct ChunkListResponse {
    pub document_id: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    pub chunks: Vec<ChunkResponse>,
}

/// Query parameters for translation triggers
#[derive(Debug, Deserialize)]
pub struct TranslateQuery {
    pub page: Option<u32>,
    pub lang: Option<String>,
}

/// Translation trigger response
#[derive(Serialize)]
pub struct TranslateResponse {
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub lang: String,
    /// Number of jobs actually spawned; keys already in flight or already
    /// translated are skipped
    pub jobs: usize,
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_document))
        .route("/:id", get(get_document))
        .route("/:id/chunks", get(get_chunks))
        .route("/:id/translate", post(translate_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/documents
///
/// Accepts a multipart PDF upload, persists it, creates the document in
/// Pending, and enqueues the parse job.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut user_id = "default-user".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .unwrap_or("uploaded.pdf")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?;
                file = Some((filename, bytes.to_vec()));
            }
            "user_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read user_id: {}", e)))?;
                if !value.is_empty() {
                    user_id = value;
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::Validation("Missing 'file' field".to_string()))?;

    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::Validation(
            "Only PDF files are supported".to_string(),
        ));
    }

    let upload_dir = &state.config().upload.dir;
    tokio::fs::create_dir_all(upload_dir).await?;
    let file_path = upload_dir.join(format!("{}.pdf", Uuid::new_v4()));
    tokio::fs::write(&file_path, &bytes).await?;

    let registry = DocumentRegistry::new(state.db());
    let document = match registry
        .create(&user_id, &filename, &file_path.display().to_string())
        .await
    {
        Ok(document) => document,
        Err(e) => {
            // Nothing references the file if the record was never created
            let _ = tokio::fs::remove_file(&file_path).await;
            return Err(e);
        }
    };

    state.parse_scheduler().enqueue(&document.id);

    tracing::info!(
        document_id = %document.id,
        filename = %filename,
        size = bytes.len(),
        "Document uploaded and parse job enqueued"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            document_id: document.id,
        }),
    ))
}

/// GET /api/documents/:id
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>> {
    let document = DocumentRegistry::new(state.db()).get(&id).await?;
    Ok(Json(document.into()))
}

/// GET /api/documents/:id/chunks?page=&lang=
///
/// Returns the committed chunks in (page, chunk_index) order. With `lang`,
/// each page whose translation is Ready is served translated; every other
/// page falls back to raw text. A missing translation is never an error.
async fn get_chunks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChunksQuery>,
) -> Result<Json<ChunkListResponse>> {
    let document = DocumentRegistry::new(state.db()).get(&id).await?;
    // Chunks only become readable once the document is Ready, even if the
    // parse job has already committed them
    if document.status() != DocumentStatus::Ready {
        return Err(ApiError::NotFound(format!(
            "Document {} has no readable chunks (status: {})",
            id, document.status
        )));
    }

    if let Some(lang) = query.lang.as_deref() {
        if !is_valid_lang(lang) {
            return Err(ApiError::Validation(format!(
                "Invalid language code: {}",
                lang
            )));
        }
    }

    let store = ChunkStore::new(state.db());
    let chunks = match query.page {
        Some(page) => store.read_by_page(&id, page).await?,
        None => store.read_by_document(&id).await?,
    };

    let translations = match query.lang.as_deref() {
        Some(lang) => load_ready_translations(&state, &id, lang, &chunks).await?,
        None => HashMap::new(),
    };

    let responses: Vec<ChunkResponse> = chunks
        .into_iter()
        .map(|chunk| {
            let translated_text = translations
                .get(&chunk.page)
                .and_then(|texts| texts.get(chunk.chunk_index as usize));
            match translated_text {
                Some(text) => ChunkResponse {
                    page: chunk.page,
                    chunk_index: chunk.chunk_index,
                    text: text.clone(),
                    translated: true,
                },
                None => ChunkResponse {
                    page: chunk.page,
                    chunk_index: chunk.chunk_index,
                    text: chunk.text,
                    translated: false,
                },
            }
        })
        .collect();

    Ok(Json(ChunkListResponse {
        document_id: id,
        count: responses.len(),
        lang: query.lang,
        chunks: responses,
    }))
}

/// Collect Ready translations for every page present in the chunk listing
async fn load_ready_translations(
    state: &AppState,
    document_id: &str,
    lang: &str,
    chunks: &[Chunk],
) -> Result<HashMap<i64, Vec<String>>> {
    let cache = TranslationCache::new(state.db());
    let mut translations = HashMap::new();
    for chunk in chunks {
        if translations.contains_key(&chunk.page) {
            continue;
        }
        if let Some(texts) = cache
            .get_ready(document_id, chunk.page as u32, lang)
            .await?
        {
            translations.insert(chunk.page, texts);
        }
    }
    Ok(translations)
}

/// POST /api/documents/:id/translate?page=&lang=
///
/// Enqueues one translation job per target page and returns 202 without
/// waiting. Translating a document that is not Ready is a conflict.
async fn translate_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TranslateQuery>,
) -> Result<(StatusCode, Json<TranslateResponse>)> {
    let lang = query
        .lang
        .ok_or_else(|| ApiError::Validation("Missing 'lang' parameter".to_string()))?;
    if !is_valid_lang(&lang) {
        return Err(ApiError::Validation(format!(
            "Invalid language code: {}",
            lang
        )));
    }

    let document = DocumentRegistry::new(state.db()).get(&id).await?;
    if document.status() != DocumentStatus::Ready {
        return Err(ApiError::Conflict(format!(
            "Document {} is not ready for translation (status: {})",
            id, document.status
        )));
    }

    let jobs = state
        .translate_scheduler()
        .enqueue(&id, query.page, &lang)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TranslateResponse {
            document_id: id,
            page: query.page,
            lang,
            jobs,
        }),
    ))
}
