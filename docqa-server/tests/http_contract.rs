use std::sync::Arc;

use docqa_rag::{HashEmbeddingProvider, RagConfig, RagPipeline, StubCompletionProvider};
use docqa_server::{
    AppState, app_router,
    protocol::{AskResponse, ErrorResponse, UploadResponse},
    storage::UploadStore,
};
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::{Value, json};
use tempfile::TempDir;

const KEEPER_LOG: &str = "The lighthouse keeper logs the weather every morning. \
    Storms arrive from the west in autumn. The lamp uses a Fresnel lens.";
const BREAD_NOTES: &str = "Sourdough needs a lively starter. Feed it flour and water daily. \
    Bake at a high temperature with steam for a crisp crust.";

struct TestServer {
    base: String,
    uploads: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

async fn spawn_server() -> TestServer {
    spawn_server_with_limit(1024 * 1024).await
}

async fn spawn_server_with_limit(max_upload_bytes: usize) -> TestServer {
    let config = RagConfig::builder()
        .chunk_size(40)
        .chunk_overlap(10)
        .build()
        .expect("valid config");
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
        .completion_provider(Arc::new(StubCompletionProvider::new("stub answer")))
        .build()
        .expect("pipeline");

    let uploads = tempfile::tempdir().expect("upload dir");
    let state = AppState::new(pipeline, UploadStore::new(uploads.path()))
        .with_max_upload_bytes(max_upload_bytes);
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    TestServer { base: format!("http://{}", addr), uploads, handle }
}

async fn upload(
    client: &reqwest::Client,
    base: &str,
    filename: &str,
    bytes: &[u8],
) -> reqwest::Response {
    let form = Form::new().part("file", Part::bytes(bytes.to_vec()).file_name(filename.to_string()));
    client
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .expect("upload response")
}

async fn ask(client: &reqwest::Client, base: &str, question: &str) -> reqwest::Response {
    client
        .post(format!("{}/ask", base))
        .json(&json!({ "question": question }))
        .send()
        .await
        .expect("ask response")
}

#[tokio::test]
async fn root_and_health_report_running() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let root: Value = client
        .get(format!("{}/", server.base))
        .send()
        .await
        .expect("root response")
        .json()
        .await
        .expect("root json");
    assert_eq!(root, json!({"status": "running"}));

    let health: Value = client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(health, json!({"status": "ok", "service": "docqa"}));

    server.handle.abort();
}

#[tokio::test]
async fn ask_before_upload_asks_for_a_document() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = ask(&client, &server.base, "What is this about?").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: ErrorResponse = response.json().await.expect("error json");
    assert_eq!(body.error, "Upload document first");

    let status: Value = client
        .get(format!("{}/status", server.base))
        .send()
        .await
        .expect("status response")
        .json()
        .await
        .expect("status json");
    assert_eq!(status, json!({"state": "empty"}));

    server.handle.abort();
}

#[tokio::test]
async fn upload_then_ask_returns_answer_sources_and_text() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = upload(&client, &server.base, "keeper.txt", KEEPER_LOG.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = response.json().await.expect("upload json");
    let UploadResponse::Ok { chunks, characters } = body else {
        panic!("expected ok upload, got {body:?}");
    };
    assert_eq!(characters, KEEPER_LOG.chars().count());
    assert!(chunks > 3);

    let stored: Vec<_> = std::fs::read_dir(server.uploads.path())
        .expect("read upload dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ends_with("_keeper.txt"));

    let status: Value = client
        .get(format!("{}/status", server.base))
        .send()
        .await
        .expect("status response")
        .json()
        .await
        .expect("status json");
    assert_eq!(status["state"], "ready");
    assert_eq!(status["filename"], "keeper.txt");
    assert_eq!(status["chunks"], chunks);

    let response = ask(&client, &server.base, "Where do storms arrive from?").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: AskResponse = response.json().await.expect("ask json");
    assert_eq!(body.answer, "stub answer");
    assert_eq!(body.sources.len(), 3);
    assert!(body.sources.iter().all(|source| KEEPER_LOG.contains(&source.chunk_text)));
    assert_eq!(body.ocr_text, KEEPER_LOG);

    server.handle.abort();
}

#[tokio::test]
async fn second_upload_replaces_the_first() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    upload(&client, &server.base, "keeper.txt", KEEPER_LOG.as_bytes()).await;
    let response = upload(&client, &server.base, "bread.md", BREAD_NOTES.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: AskResponse = ask(&client, &server.base, "Where do storms arrive from?")
        .await
        .json()
        .await
        .expect("ask json");
    assert!(body.sources.iter().all(|source| BREAD_NOTES.contains(&source.chunk_text)));
    assert_eq!(body.ocr_text, BREAD_NOTES);

    server.handle.abort();
}

#[tokio::test]
async fn blank_upload_reports_error_status() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = upload(&client, &server.base, "blank.txt", b" \n\t\n ").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: UploadResponse = response.json().await.expect("upload json");
    assert_eq!(body, UploadResponse::Error { message: "No text extracted".to_string() });

    let response = ask(&client, &server.base, "anything?").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    server.handle.abort();
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let form = Form::new().text("note", "no file here");
    let response = client
        .post(format!("{}/upload", server.base))
        .multipart(form)
        .send()
        .await
        .expect("upload response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("upload json");
    assert_eq!(body["status"], "error");

    server.handle.abort();
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let server = spawn_server_with_limit(1024).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &server.base, "big.txt", &[b'a'; 4096]).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    server.handle.abort();
}

#[tokio::test]
async fn blank_question_before_upload_asks_for_a_document() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = ask(&client, &server.base, "   ").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("error json");
    assert_eq!(body, json!({"error": "Upload document first"}));

    server.handle.abort();
}

#[tokio::test]
async fn blank_question_is_bad_request() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    upload(&client, &server.base, "keeper.txt", KEEPER_LOG.as_bytes()).await;
    let response = ask(&client, &server.base, "   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].is_string());

    server.handle.abort();
}
