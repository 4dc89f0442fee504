//! MV3D Upload Service
//!
//! Accepts named STL uploads into a flat content directory, reports whether
//! the name already existed, and serves the directory back under `/models`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Service configuration, normally read from the environment in `main`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Flat directory uploads are written to and served from
    pub upload_dir: PathBuf,
    /// Public base URL used to build the returned `filePath`
    pub public_base: String,
}

struct AppState {
    config: ServerConfig,
    // Serializes the exists-check against the write so two concurrent
    // uploads of the same new name cannot both observe "does not exist".
    write_lock: Mutex<()>,
}

/// Build the service router
pub fn app(config: ServerConfig) -> Router {
    let serve_models = ServeDir::new(&config.upload_dir);
    let state = Arc::new(AppState {
        config,
        write_lock: Mutex::new(()),
    });

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .nest_service("/models", serve_models)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: String,
    filename: String,
    #[serde(rename = "filePath")]
    file_path: String,
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut stored: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!("malformed multipart body: {err}");
                return bad_request("Invalid multipart body");
            }
        };

        // The first field carrying a filename is the model payload
        let Some(filename) = field.file_name().map(sanitize_filename) else {
            continue;
        };
        if filename.is_empty() {
            continue;
        }

        match field.bytes().await {
            Ok(bytes) => {
                stored = Some((filename, bytes.to_vec()));
                break;
            }
            Err(err) => {
                warn!("failed to read upload body: {err}");
                return bad_request("Invalid multipart body");
            }
        }
    }

    let Some((filename, bytes)) = stored else {
        return bad_request("No file uploaded");
    };

    let path = state.config.upload_dir.join(&filename);

    // Hold the lock across check and write; the pre-existence flag must
    // reflect the state before this request's write lands.
    let existed = {
        let _guard = state.write_lock.lock().await;
        let existed = path.exists();
        if let Err(err) = tokio::fs::write(&path, &bytes).await {
            warn!("failed to store {filename}: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store file" })),
            )
                .into_response();
        }
        existed
    };

    let file_path = format!("{}/models/{}", state.config.public_base, filename);
    info!(
        "stored {filename} ({} bytes, existed: {existed})",
        bytes.len()
    );

    let (status, message) = if existed {
        (StatusCode::OK, "File already exists")
    } else {
        (StatusCode::CREATED, "File uploaded successfully")
    };

    (
        status,
        Json(UploadResponse {
            message: message.to_string(),
            filename,
            file_path,
        }),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Reduce an uploaded name to its final path component so a crafted
/// filename cannot escape the content directory
fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Method, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::{app, ServerConfig};

    const BOUNDARY: &str = "mv3d-test-boundary";

    fn test_app(dir: &TempDir) -> Router {
        app(ServerConfig {
            upload_dir: dir.path().to_path_buf(),
            public_base: "http://localhost:3100".to_string(),
        })
    }

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"model\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn send_upload(router: Router, filename: &str, content: &[u8]) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(filename, content)))
            .expect("request should build");

        router
            .oneshot(request)
            .await
            .expect("request should complete")
    }

    async fn read_body_bytes(response: Response) -> axum::body::Bytes {
        response
            .into_body()
            .collect()
            .await
            .expect("response body should collect")
            .to_bytes()
    }

    async fn parse_json_value(response: Response) -> serde_json::Value {
        let bytes = read_body_bytes(response).await;
        serde_json::from_slice(&bytes).expect("response should decode as JSON")
    }

    #[tokio::test]
    async fn first_upload_returns_201_with_file_path() {
        let dir = TempDir::new().unwrap();
        let payload = vec![0x42u8; 10 * 1024];

        let response = send_upload(test_app(&dir), "part.stl", &payload).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = parse_json_value(response).await;
        assert_eq!(body["message"], "File uploaded successfully");
        assert_eq!(body["filename"], "part.stl");
        assert!(body["filePath"]
            .as_str()
            .unwrap_or_default()
            .contains("part.stl"));

        assert_eq!(std::fs::read(dir.path().join("part.stl")).unwrap(), payload);
    }

    #[tokio::test]
    async fn reupload_same_name_returns_200_already_exists() {
        let dir = TempDir::new().unwrap();

        let first = send_upload(test_app(&dir), "part.stl", b"first").await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = send_upload(test_app(&dir), "part.stl", b"second").await;
        assert_eq!(second.status(), StatusCode::OK);

        let body = parse_json_value(second).await;
        assert_eq!(body["message"], "File already exists");
        assert_eq!(body["filename"], "part.stl");

        // Last write wins; the service stays available
        assert_eq!(
            std::fs::read(dir.path().join("part.stl")).unwrap(),
            b"second"
        );
        let third = send_upload(test_app(&dir), "other.stl", b"x").await;
        assert_eq!(third.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn upload_without_file_field_returns_400() {
        let dir = TempDir::new().unwrap();

        // A form field with no filename is not a file upload
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"note\"\r\n\r\n\
                 hello\r\n\
                 --{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );

        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request should build");

        let response = test_app(&dir)
            .oneshot(request)
            .await
            .expect("request should complete");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_value(response).await;
        assert_eq!(body["error"], "No file uploaded");

        // Nothing may be written on failure
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn uploaded_bytes_round_trip_through_static_serving() {
        let dir = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let response = send_upload(test_app(&dir), "part.stl", &payload).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/models/part.stl")
            .body(Body::empty())
            .expect("request should build");
        let response = test_app(&dir)
            .oneshot(request)
            .await
            .expect("request should complete");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = read_body_bytes(response).await;
        assert_eq!(bytes.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn missing_model_returns_404() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/models/nothing.stl")
            .body(Body::empty())
            .expect("request should build");

        let response = test_app(&dir)
            .oneshot(request)
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_filenames_are_reduced_to_basename() {
        let dir = TempDir::new().unwrap();

        let response = send_upload(test_app(&dir), "../../escape.stl", b"data").await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = parse_json_value(response).await;
        assert_eq!(body["filename"], "escape.stl");
        assert!(dir.path().join("escape.stl").exists());
        assert!(!dir.path().parent().unwrap().join("escape.stl").exists());
    }

    #[tokio::test]
    async fn cors_headers_are_present() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/health")
            .header("origin", "https://example.com")
            .body(Body::empty())
            .expect("request should build");

        let response = test_app(&dir)
            .oneshot(request)
            .await
            .expect("request should complete");

        assert_eq!(response.status(), StatusCode::OK);
        let allow_origin = response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert_eq!(allow_origin, "*");
    }
}
