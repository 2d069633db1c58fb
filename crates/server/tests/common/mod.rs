//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock concatenator injected, so the HTTP surface can be exercised
//! without an ffmpeg binary.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use reelsplice_core::{
    create_event_system, testing::MockConcatenator, Config, MergeService, RemoteFetcher,
};
use reelsplice_server::{api::create_router, state::AppState};

const BOUNDARY: &str = "reelsplice-test-boundary";

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_merge() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture
///         .post_multipart("/api/v1/merge", &[part("videos", "a.mp4", b"a")])
///         .await;
///
///     assert_eq!(response.status, 400);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock concatenator - inspect jobs, inject failures
    pub concatenator: Arc<MockConcatenator>,
    /// Root under which per-merge workspaces are created
    pub temp_root: PathBuf,
    /// Directory merged outputs are moved to (if enabled)
    pub output_dir: Option<PathBuf>,
    /// Keeps the temporary directories alive
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// One multipart part: field name, file name and content.
pub struct Part {
    pub field: &'static str,
    pub file_name: &'static str,
    pub data: &'static [u8],
}

pub fn part(field: &'static str, file_name: &'static str, data: &'static [u8]) -> Part {
    Part {
        field,
        file_name,
        data,
    }
}

/// Three `videos` parts named a.mp4, b.mp4 and c.mp4.
pub fn three_videos() -> Vec<Part> {
    vec![
        part("videos", "a.mp4", b"aaa"),
        part("videos", "b.mp4", b"bbb"),
        part("videos", "c.mp4", b"ccc"),
    ]
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let temp_root = temp_dir.path().join("work");
        let output_dir = test_config
            .persist_output
            .then(|| temp_dir.path().join("out"));

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.server.port = 0; // Not used for in-process testing
        config.merge.temp_root = temp_root.clone();
        config.merge.output_dir = output_dir.clone();
        if let Some(max_upload_bytes) = test_config.max_upload_bytes {
            config.server.max_upload_bytes = max_upload_bytes;
        }

        let concatenator = Arc::new(MockConcatenator::new());
        let fetcher = Arc::new(
            RemoteFetcher::new(&config.fetch).expect("Failed to build fetcher"),
        );

        let (event_handle, event_writer, recent_events) = create_event_system(100, 100);
        tokio::spawn(event_writer.run());

        let merger = Arc::new(
            MergeService::new(config.merge.clone(), concatenator.clone(), fetcher)
                .with_events(event_handle),
        );
        let state = Arc::new(AppState::new(config, merger, recent_events));

        Self {
            router: create_router(state),
            concatenator,
            temp_root,
            output_dir,
            temp_dir,
        }
    }

    /// Number of workspaces left behind under the temp root.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(&self.temp_root)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with a multipart/form-data body.
    pub async fn post_multipart(&self, path: &str, parts: &[Part]) -> TestResponse {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.field, part.file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
            body.extend_from_slice(part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.json_response(request).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.json_response(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.json_response(request).await
    }

    async fn json_response(&self, request: Request<Body>) -> TestResponse {
        let (status, body_bytes) = self.send(request).await;

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Move merged outputs into an output directory
    pub persist_output: bool,
    /// Override the upload body limit
    pub max_upload_bytes: Option<usize>,
}

impl TestConfig {
    /// Create config with output persistence enabled.
    pub fn with_output_dir() -> Self {
        Self {
            persist_output: true,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
