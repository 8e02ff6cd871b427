//! End-to-end API tests
//!
//! Runs the full router against stub extractor and translator providers
//! with a scratch SQLite database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use traductor_server::app;
use traductor_server::config::Config;
use traductor_server::db;
use traductor_server::document::{ChunkStore, DocumentRegistry, DocumentStatus, ExtractedPage};
use traductor_server::extract::{ExtractError, Extractor};
use traductor_server::state::AppState;
use traductor_server::translation::{TranslateError, Translator};

// ============================================================================
// Stub Providers
// ============================================================================

/// Extractor stub that waits on a gate before returning its fixed pages,
/// so tests can observe the document mid-parse
struct StubExtractor {
    pages: Vec<ExtractedPage>,
    gate: Semaphore,
    calls: AtomicUsize,
}

impl StubExtractor {
    fn open(pages: Vec<ExtractedPage>) -> Arc<Self> {
        Arc::new(Self {
            pages,
            gate: Semaphore::new(1000),
            calls: AtomicUsize::new(0),
        })
    }

    fn gated(pages: Vec<ExtractedPage>) -> Arc<Self> {
        Arc::new(Self {
            pages,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn extract(&self, _bytes: &[u8]) -> Result<Vec<ExtractedPage>, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(self.pages.clone())
    }
}

/// Translator stub with a fixed phrase table
struct StubTranslator {
    phrases: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubTranslator {
    fn zh() -> Arc<Self> {
        let mut phrases = HashMap::new();
        phrases.insert("Intro".to_string(), "介绍".to_string());
        phrases.insert("Body".to_string(), "正文".to_string());
        phrases.insert("Conclusion".to_string(), "结论".to_string());
        Arc::new(Self {
            phrases,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(&self, texts: &[String], _lang: &str) -> Result<Vec<String>, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| self.phrases.get(t).cloned().unwrap_or_else(|| t.clone()))
            .collect())
    }
}

fn sample_pages() -> Vec<ExtractedPage> {
    vec![
        ExtractedPage {
            page: 1,
            chunks: vec!["Intro".to_string(), "Body".to_string()],
        },
        ExtractedPage {
            page: 2,
            chunks: vec!["Conclusion".to_string()],
        },
    ]
}

// ============================================================================
// Harness
// ============================================================================

struct TestServer {
    router: Router,
    pool: sqlx::SqlitePool,
    // Holds the scratch database and upload dir for the test's lifetime
    dir: tempfile::TempDir,
}

async fn test_server(extractor: Arc<StubExtractor>, translator: Arc<StubTranslator>) -> TestServer {
    let dir = tempfile::TempDir::new().unwrap();

    let mut config = Config::default();
    config.database.url = format!("sqlite://{}", dir.path().join("test.db").display());
    config.upload.dir = dir.path().join("uploads");
    config.jobs.extract_timeout_secs = 5;
    config.jobs.translate_timeout_secs = 5;

    let pool = db::create_pool(&config.database.url).await.unwrap();
    let state = AppState::new(config, pool.clone(), extractor, translator);

    TestServer {
        router: app(state),
        pool,
        dir,
    }
}

fn multipart_body(filename: &str, content: &[u8], user_id: Option<&str>) -> (String, Vec<u8>) {
    let boundary = "traductor-test-boundary";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");

    if let Some(user_id) = user_id {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"user_id\"\r\n\r\n");
        body.extend_from_slice(user_id.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (
        format!("multipart/form-data; boundary={}", boundary),
        body,
    )
}

async fn upload(server: &TestServer, filename: &str) -> (StatusCode, Value) {
    let (content_type, body) = multipart_body(filename, b"%PDF-1.4 stub", Some("user-1"));
    let response = server
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/documents")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn get(server: &TestServer, uri: &str) -> (StatusCode, Value) {
    let response = server
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn post(server: &TestServer, uri: &str) -> (StatusCode, Value) {
    let response = server
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn wait_for_status(server: &TestServer, id: &str, wanted: &str) {
    for _ in 0..200 {
        let (status, body) = get(server, &format!("/api/documents/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document {} never reached status {}", id, wanted);
}

fn chunk_texts(body: &Value) -> Vec<String> {
    body["chunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let server = test_server(StubExtractor::open(sample_pages()), StubTranslator::zh()).await;
    let (status, body) = get(&server, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_upload_and_parse_lifecycle() {
    let extractor = StubExtractor::gated(sample_pages());
    let server = test_server(extractor.clone(), StubTranslator::zh()).await;

    let (status, body) = upload(&server, "a.pdf").await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["document_id"].as_str().unwrap().to_string();

    // Before the extractor returns, the document is not terminal and its
    // chunks are invisible
    let (status, body) = get(&server, &format!("/api/documents/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["status"] == "pending" || body["status"] == "parsing");
    let (status, _) = get(&server, &format!("/api/documents/{}/chunks", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    extractor.release();
    wait_for_status(&server, &id, "ready").await;

    let (status, body) = get(&server, &format!("/api/documents/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page_count"], 2);

    let (status, body) = get(&server, &format!("/api/documents/{}/chunks", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(chunk_texts(&body), vec!["Intro", "Body", "Conclusion"]);

    let (status, body) = get(&server, &format!("/api/documents/{}/chunks?page=1", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chunk_texts(&body), vec!["Intro", "Body"]);

    // Absent page
    let (status, _) = get(&server, &format!("/api/documents/{}/chunks?page=5", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_validation() {
    let server = test_server(StubExtractor::open(sample_pages()), StubTranslator::zh()).await;

    let (status, _) = upload(&server, "notes.txt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Multipart body without a file field
    let boundary = "traductor-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"user_id\"\r\n\r\nuser-1\r\n--{b}--\r\n",
        b = boundary
    );
    let response = server
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/documents")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_committed_chunks_stay_hidden_until_ready() {
    let server = test_server(StubExtractor::open(sample_pages()), StubTranslator::zh()).await;

    // Build the mid-parse state directly: the parse job has claimed the
    // document and committed its chunks, but not yet transitioned to ready
    let registry = DocumentRegistry::new(&server.pool);
    let doc = registry
        .create("user-1", "a.pdf", "/tmp/a.pdf")
        .await
        .unwrap();
    registry
        .transition(&doc.id, DocumentStatus::Parsing, None)
        .await
        .unwrap();
    ChunkStore::new(&server.pool)
        .write_all(&doc.id, &sample_pages())
        .await
        .unwrap();

    let (status, _) = get(&server, &format!("/api/documents/{}/chunks", doc.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&server, &format!("/api/documents/{}/chunks?page=1", doc.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The same chunks become readable the moment the document is ready
    registry
        .transition(&doc.id, DocumentStatus::Ready, None)
        .await
        .unwrap();
    let (status, body) = get(&server, &format!("/api/documents/{}/chunks", doc.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_failed_registration_removes_uploaded_file() {
    let server = test_server(StubExtractor::open(sample_pages()), StubTranslator::zh()).await;

    // Force the document insert to fail after the file is on disk
    sqlx::query("DROP TABLE documents")
        .execute(&server.pool)
        .await
        .unwrap();

    let (status, _) = upload(&server, "a.pdf").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // No orphaned upload is left behind
    let mut entries = tokio::fs::read_dir(server.dir.path().join("uploads"))
        .await
        .unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_document_is_404() {
    let server = test_server(StubExtractor::open(sample_pages()), StubTranslator::zh()).await;

    let (status, _) = get(&server, "/api/documents/no-such-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&server, "/api/documents/no-such-id/chunks").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = post(&server, "/api/documents/no-such-id/translate?lang=zh").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_translate_before_ready_conflicts() {
    let extractor = StubExtractor::gated(sample_pages());
    let server = test_server(extractor, StubTranslator::zh()).await;

    let (_, body) = upload(&server, "a.pdf").await;
    let id = body["document_id"].as_str().unwrap();

    // Still in flight: translate is rejected as a conflict
    let (status, _) = post(&server, &format!("/api/documents/{}/translate?lang=zh", id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_translation_flow_with_fallback() {
    let extractor = StubExtractor::open(sample_pages());
    let translator = StubTranslator::zh();
    let server = test_server(extractor, translator.clone()).await;

    let (_, body) = upload(&server, "a.pdf").await;
    let id = body["document_id"].as_str().unwrap().to_string();
    wait_for_status(&server, &id, "ready").await;

    // Before any translation exists, a lang read falls back to raw text
    let (status, body) = get(
        &server,
        &format!("/api/documents/{}/chunks?page=1&lang=zh", id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chunk_texts(&body), vec!["Intro", "Body"]);
    assert_eq!(body["chunks"][0]["translated"], false);

    // Trigger translation of page 1
    let (status, body) = post(
        &server,
        &format!("/api/documents/{}/translate?page=1&lang=zh", id),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["jobs"], 1);

    // Poll until the cached translation is served
    let mut translated = Vec::new();
    for _ in 0..200 {
        let (_, body) = get(
            &server,
            &format!("/api/documents/{}/chunks?page=1&lang=zh", id),
        )
        .await;
        if body["chunks"][0]["translated"] == true {
            translated = chunk_texts(&body);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(translated, vec!["介绍", "正文"]);

    // Page 2 was never translated: raw fallback, never an error
    let (status, body) = get(
        &server,
        &format!("/api/documents/{}/chunks?page=2&lang=zh", id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chunk_texts(&body), vec!["Conclusion"]);
    assert_eq!(body["chunks"][0]["translated"], false);

    // Re-triggering the memoized key spawns nothing new
    let (status, body) = post(
        &server,
        &format!("/api/documents/{}/translate?page=1&lang=zh", id),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["jobs"], 0);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_whole_document_translation() {
    let server = test_server(StubExtractor::open(sample_pages()), StubTranslator::zh()).await;

    let (_, body) = upload(&server, "a.pdf").await;
    let id = body["document_id"].as_str().unwrap().to_string();
    wait_for_status(&server, &id, "ready").await;

    let (status, body) = post(&server, &format!("/api/documents/{}/translate?lang=zh", id)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["jobs"], 2);

    let mut texts = Vec::new();
    for _ in 0..200 {
        let (_, body) = get(&server, &format!("/api/documents/{}/chunks?lang=zh", id)).await;
        let all_translated = body["chunks"]
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["translated"] == true);
        if all_translated {
            texts = chunk_texts(&body);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(texts, vec!["介绍", "正文", "结论"]);
}

#[tokio::test]
async fn test_translate_validation() {
    let server = test_server(StubExtractor::open(sample_pages()), StubTranslator::zh()).await;

    let (_, body) = upload(&server, "a.pdf").await;
    let id = body["document_id"].as_str().unwrap().to_string();
    wait_for_status(&server, &id, "ready").await;

    let (status, _) = post(&server, &format!("/api/documents/{}/translate", id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &server,
        &format!("/api/documents/{}/translate?lang=Not-A-Lang!", id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(
        &server,
        &format!("/api/documents/{}/chunks?lang=XX", id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Absent page on a single-page trigger
    let (status, _) = post(
        &server,
        &format!("/api/documents/{}/translate?page=9&lang=zh", id),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
