use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::Method;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;
use trimx_server::adapters::toml_config::ServerConfig;
use trimx_server::app::DefaultAppContainer;
use trimx_server::http;
use trimx_server::ports::{EncodeJob, EncodeOutcome, ExecutePort};
use trimx_server::DomainError;

/// Test utilities for the HTTP surface
mod test_utils {
    use super::*;

    /// Smallest byte string the output verifier accepts as MP4
    pub const FAKE_MP4: &[u8] = b"\0\0\0\x20ftypisom\0\0\x02\0isomiso2avc1mp41trimmed-clip";

    /// Encoder stand-in that writes a fixed MP4 header and counts calls
    pub struct StubEncoder {
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl StubEncoder {
        pub fn working() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExecutePort for StubEncoder {
        async fn encode(&self, job: &EncodeJob) -> Result<EncodeOutcome, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                tokio::fs::write(&job.output, b"half-written").await?;
                return Err(DomainError::EncodingFailed {
                    message: "ffmpeg exited with status 1".to_string(),
                    diagnostics: format!("{}: Invalid data found", job.source.display()),
                });
            }
            tokio::fs::write(&job.output, FAKE_MP4).await?;
            Ok(EncodeOutcome {
                output_bytes: FAKE_MP4.len() as u64,
                elapsed: Duration::from_millis(1),
            })
        }
    }

    pub fn test_config(dir: &Path, max_upload_bytes: u64) -> ServerConfig {
        ServerConfig {
            upload_dir: dir.join("uploads"),
            trimmed_dir: dir.join("trimmed"),
            max_upload_bytes,
            max_concurrent_encodes: 2,
            encode_queue_capacity: 4,
            ..ServerConfig::default()
        }
    }

    /// Server wired to `encoder`, storing under `dir`
    pub async fn server_with(
        dir: &Path,
        encoder: Arc<dyn ExecutePort>,
        max_upload_bytes: u64,
    ) -> TestServer {
        let config = test_config(dir, max_upload_bytes);
        let container = DefaultAppContainer::with_encoder(&config, encoder);
        container.prepare().await.unwrap();
        TestServer::new(http::router(Arc::new(container), &config.allowed_origins)).unwrap()
    }

    pub fn video_form(name: &str, bytes: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "video",
            Part::bytes(bytes.to_vec())
                .file_name(name.to_string())
                .mime_type("video/mp4"),
        )
    }

    /// Upload `bytes` and return the identifier the server assigned
    pub async fn upload(server: &TestServer, bytes: &[u8]) -> String {
        let response = server.post("/upload").multipart(video_form("clip.mp4", bytes)).await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        body["filename"].as_str().unwrap().to_string()
    }

    pub fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    /// Create a short test video using FFmpeg
    pub fn create_test_video(output_path: &Path, duration: f64) -> bool {
        std::process::Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "lavfi",
                "-i",
                "testsrc=size=160x120:rate=15",
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=1000",
                "-t",
                &duration.to_string(),
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-y",
            ])
            .arg(output_path)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    pub fn ffmpeg_available() -> bool {
        tool_available("ffmpeg")
    }

    pub fn ffprobe_available() -> bool {
        tool_available("ffprobe")
    }

    fn tool_available(tool: &str) -> bool {
        std::process::Command::new(tool)
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Container duration in seconds as reported by ffprobe
    pub fn probe_duration(path: &Path) -> f64 {
        let output = std::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .unwrap();
        assert!(output.status.success(), "ffprobe failed on {}", path.display());
        String::from_utf8_lossy(&output.stdout).trim().parse().unwrap()
    }
}

use test_utils::*;

const LIMIT: u64 = 1024 * 1024;

// Health

#[tokio::test]
async fn test_root_reports_running() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server.get("/").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), "Video trimmer backend is running");
}

// Upload

#[tokio::test]
async fn test_upload_round_trip_stores_exact_bytes() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();

    let identifier = upload(&server, &payload).await;

    assert!(identifier.ends_with(".mp4"));
    assert!(!identifier.contains("clip"));
    let stored = std::fs::read(dir.path().join("uploads").join(&identifier)).unwrap();
    assert_eq!(stored, payload);
}

#[tokio::test]
async fn test_upload_keeps_known_extension_only() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server
        .post("/upload")
        .multipart(video_form("../../holiday.webm", b"webm bytes"))
        .await;
    let body: Value = response.json();
    let identifier = body["filename"].as_str().unwrap();
    assert!(identifier.ends_with(".webm"));
    assert!(!identifier.contains('/'));
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let form = MultipartForm::new().add_text("title", "no video here");
    let response = server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body, json!({"success": false, "error": "No file uploaded"}));
}

#[tokio::test]
async fn test_upload_ignores_unrelated_fields() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let form = MultipartForm::new()
        .add_text("title", "holiday")
        .add_part("video", Part::bytes(b"abc".to_vec()).file_name("a.mp4"));
    let response = server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(count_files(&dir.path().join("uploads")), 1);
}

#[tokio::test]
async fn test_upload_of_two_videos_is_rejected_and_cleaned_up() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let form = MultipartForm::new()
        .add_part("video", Part::bytes(b"first".to_vec()).file_name("a.mp4"))
        .add_part("video", Part::bytes(b"second".to_vec()).file_name("b.mp4"));
    let response = server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Only one video file may be uploaded per request");
    assert_eq!(count_files(&dir.path().join("uploads")), 0);
}

#[tokio::test]
async fn test_empty_upload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server.post("/upload").multipart(video_form("a.mp4", b"")).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Uploaded file is empty");
    assert_eq!(count_files(&dir.path().join("uploads")), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_with_413() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), 1024).await;

    let response = server
        .post("/upload")
        .multipart(video_form("big.mp4", &vec![7u8; 4096]))
        .await;

    assert_eq!(response.status_code(), 413);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(count_files(&dir.path().join("uploads")), 0);
}

#[tokio::test]
async fn test_upload_requires_multipart() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server.post("/upload").json(&json!({"video": "nope"})).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
}

// Trim

#[tokio::test]
async fn test_trim_returns_url_serving_mp4() {
    let dir = TempDir::new().unwrap();
    let encoder = StubEncoder::working();
    let server = server_with(dir.path(), encoder.clone(), LIMIT).await;
    let identifier = upload(&server, b"source video").await;

    let response = server
        .post("/trim")
        .json(&json!({"filename": identifier, "start": 1, "end": "2.5"}))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/trimmed/trim-"));
    assert!(url.ends_with(".mp4"));
    assert_eq!(encoder.calls(), 1);

    let clip = server.get(&url).await;
    assert_eq!(clip.status_code(), 200);
    assert_eq!(clip.header("content-type"), "video/mp4");
    assert_eq!(clip.as_bytes().as_ref(), FAKE_MP4);
}

#[tokio::test]
async fn test_trimmed_output_supports_range_requests() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;
    let identifier = upload(&server, b"source video").await;

    let body: Value = server
        .post("/trim")
        .json(&json!({"filename": identifier, "start": 0, "end": 1}))
        .await
        .json();
    let url = body["url"].as_str().unwrap();

    let partial = server.get(url).add_header("Range", "bytes=4-7").await;
    assert_eq!(partial.status_code(), 206);
    assert_eq!(partial.header("content-type"), "video/mp4");
    assert_eq!(partial.as_bytes().as_ref(), b"ftyp");
}

#[tokio::test]
async fn test_two_trims_of_same_window_get_distinct_urls() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;
    let identifier = upload(&server, b"source video").await;
    let request = json!({"filename": identifier, "start": 1, "end": 2});

    let first: Value = server.post("/trim").json(&request).await.json();
    let second: Value = server.post("/trim").json(&request).await.json();

    assert_ne!(first["url"], second["url"]);
    assert_eq!(count_files(&dir.path().join("trimmed")), 2);
}

#[tokio::test]
async fn test_trim_accepts_form_and_multipart_bodies() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;
    let identifier = upload(&server, b"source video").await;

    let form = server
        .post("/trim")
        .form(&[("filename", identifier.as_str()), ("start", "0:01"), ("end", "2")])
        .await;
    assert_eq!(form.status_code(), 200, "{}", form.text());

    let multipart = MultipartForm::new()
        .add_text("filename", identifier.clone())
        .add_text("start", "1")
        .add_text("end", "00:00:03.5");
    let response = server.post("/trim").multipart(multipart).await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
}

#[tokio::test]
async fn test_trim_without_filename_is_rejected() {
    let dir = TempDir::new().unwrap();
    let encoder = StubEncoder::working();
    let server = server_with(dir.path(), encoder.clone(), LIMIT).await;

    let response = server.post("/trim").json(&json!({"start": 1, "end": 2})).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body, json!({"success": false, "error": "Filename is required"}));
    assert_eq!(encoder.calls(), 0);
}

#[tokio::test]
async fn test_trim_with_empty_body_asks_for_filename() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server.post("/trim").await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Filename is required");
}

#[tokio::test]
async fn test_trim_without_times_is_rejected() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server
        .post("/trim")
        .json(&json!({"filename": "1.mp4", "start": 1}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Start and end times are required");
}

#[tokio::test]
async fn test_trim_with_inverted_window_never_encodes() {
    let dir = TempDir::new().unwrap();
    let encoder = StubEncoder::working();
    let server = server_with(dir.path(), encoder.clone(), LIMIT).await;
    let identifier = upload(&server, b"source video").await;

    let response = server
        .post("/trim")
        .json(&json!({"filename": identifier, "start": 5, "end": 2}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Start time must be less than end time");
    assert_eq!(encoder.calls(), 0);
    assert_eq!(count_files(&dir.path().join("trimmed")), 0);
}

#[tokio::test]
async fn test_trim_with_invalid_time_names_the_field() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server
        .post("/trim")
        .json(&json!({"filename": "1.mp4", "start": "soon", "end": 2}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid start time"));
}

#[tokio::test]
async fn test_trim_of_unknown_source_is_404() {
    let dir = TempDir::new().unwrap();
    let encoder = StubEncoder::working();
    let server = server_with(dir.path(), encoder.clone(), LIMIT).await;

    let response = server
        .post("/trim")
        .json(&json!({"filename": "1712345678901.mp4", "start": 1, "end": 2}))
        .await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body, json!({"success": false, "error": "Source video not found"}));
    assert_eq!(encoder.calls(), 0);
}

#[tokio::test]
async fn test_trim_rejects_path_traversal() {
    let dir = TempDir::new().unwrap();
    let encoder = StubEncoder::working();
    let server = server_with(dir.path(), encoder.clone(), LIMIT).await;

    for filename in ["../../etc/passwd", "../trimmed/x.mp4", "/etc/passwd"] {
        let response = server
            .post("/trim")
            .json(&json!({"filename": filename, "start": 1, "end": 2}))
            .await;
        assert_eq!(response.status_code(), 400, "{filename}");
        let body: Value = response.json();
        assert_eq!(body["error"], "Invalid filename");
    }
    assert_eq!(encoder.calls(), 0);
}

#[tokio::test]
async fn test_trim_with_malformed_json_is_400() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server
        .post("/trim")
        .content_type("application/json")
        .bytes("{\"filename\": ".into())
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_trim_with_unsupported_content_type_is_400() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server.post("/trim").text("filename=1.mp4").await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().starts_with("Unsupported content type"));
}

#[tokio::test]
async fn test_encoder_failure_is_generic_500_and_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let encoder = StubEncoder::failing();
    let server = server_with(dir.path(), encoder.clone(), LIMIT).await;
    let identifier = upload(&server, b"not really a video").await;

    let response = server
        .post("/trim")
        .json(&json!({"filename": identifier, "start": 1, "end": 2}))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body, json!({"success": false, "error": "Video processing failed"}));
    assert_eq!(encoder.calls(), 1);
    assert_eq!(count_files(&dir.path().join("trimmed")), 0);
}

// Static serving and CORS

#[tokio::test]
async fn test_missing_trimmed_file_is_404() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server.get("/trimmed/trim-404.mp4").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_staged_outputs_are_not_served() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;
    std::fs::write(dir.path().join("trimmed").join(".trim-1.mp4.part"), FAKE_MP4).unwrap();

    for path in ["/trimmed/.trim-1.mp4.part", "/trimmed/%2Etrim-1.mp4.part"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), 404, "{path}");
    }
}

#[tokio::test]
async fn test_uploads_are_not_served() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;
    let identifier = upload(&server, b"private").await;

    let response = server.get(&format!("/uploads/{identifier}")).await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin_by_default() {
    let dir = TempDir::new().unwrap();
    let server = server_with(dir.path(), StubEncoder::working(), LIMIT).await;

    let response = server
        .method(Method::OPTIONS, "/trim")
        .add_header("Origin", "http://localhost:3000")
        .add_header("Access-Control-Request-Method", "POST")
        .add_header("Access-Control-Request-Headers", "content-type")
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("access-control-allow-origin"), "*");
}

#[tokio::test]
async fn test_cors_allow_list_is_enforced() {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig {
        allowed_origins: vec!["https://app.example.com".to_string()],
        ..test_config(dir.path(), LIMIT)
    };
    let container = DefaultAppContainer::with_encoder(&config, StubEncoder::working());
    container.prepare().await.unwrap();
    let server =
        TestServer::new(http::router(Arc::new(container), &config.allowed_origins)).unwrap();

    let allowed = server
        .get("/")
        .add_header("Origin", "https://app.example.com")
        .await;
    assert_eq!(
        allowed.header("access-control-allow-origin"),
        "https://app.example.com"
    );

    let denied = server.get("/").add_header("Origin", "https://evil.example").await;
    assert!(denied.maybe_header("access-control-allow-origin").is_none());
}

// Real encoder

#[tokio::test]
async fn test_real_ffmpeg_trim() {
    if !ffmpeg_available() || !ffprobe_available() {
        eprintln!("Skipping real ffmpeg test: ffmpeg or ffprobe not found on PATH");
        return;
    }

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.mp4");
    if !create_test_video(&source, 3.0) {
        eprintln!("Skipping real ffmpeg test: could not synthesise a test video");
        return;
    }

    let config = test_config(dir.path(), 50 * 1024 * 1024);
    let container = DefaultAppContainer::new(&config);
    container.prepare().await.unwrap();
    let server =
        TestServer::new(http::router(Arc::new(container), &config.allowed_origins)).unwrap();

    let identifier = upload(&server, &std::fs::read(&source).unwrap()).await;
    let response = server
        .post("/trim")
        .json(&json!({"filename": identifier, "start": 0.5, "end": 1.5}))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();

    let clip = server.get(body["url"].as_str().unwrap()).await;
    assert_eq!(clip.status_code(), 200);
    let bytes = clip.as_bytes();
    assert!(bytes.len() > 8);
    assert_eq!(&bytes[4..8], b"ftyp");

    // The clip covers end - start, not start..start + end
    let fetched = dir.path().join("fetched.mp4");
    std::fs::write(&fetched, bytes).unwrap();
    let duration = probe_duration(&fetched);
    assert!((duration - 1.0).abs() < 0.25, "clip lasts {duration}s");
}
