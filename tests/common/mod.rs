use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// Re-export the main app modules for testing
use sticker_press::{handlers, services, utils, AppState};

pub const BOUNDARY: &str = "sticker-press-test-boundary";

/// Setup a test application with temporary storage. The returned `TempDir`
/// must be kept alive for the duration of the test.
pub async fn setup_test_app() -> (Router, TempDir) {
    setup_test_app_with_max_size(10 * 1024 * 1024).await
}

pub async fn setup_test_app_with_max_size(max_file_size: usize) -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path().to_str().unwrap().to_string();

    // Create test configuration
    let config = utils::config::AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Use random port for testing
        max_file_size,
        temp_dir: temp_path.clone(),
        cors_origins: vec!["*".to_string()],
        request_timeout_seconds: 30,
        processed_linger_seconds: 1,
        cleanup_interval_seconds: 3600,
        temp_file_max_age_seconds: 3600,
    };

    // Initialize services
    let storage_service = services::file_storage::FileStorageService::new(
        &temp_path,
        Duration::from_secs(config.temp_file_max_age_seconds),
    )
    .expect("Failed to create storage service");

    // Create app state
    let app_state = AppState {
        config: Arc::new(config),
        storage: Arc::new(storage_service),
        transform: Arc::new(services::transform::TransformService::new()),
    };

    // Build router (simplified version without middleware for testing)
    let router = Router::new()
        .route("/health", axum::routing::get(handlers::health::health_check))
        .route(
            "/upload",
            axum::routing::post(handlers::sticker::create_sticker),
        )
        .with_state(app_state);

    (router, temp_dir)
}

/// Encode a test PNG from a per-pixel constructor.
pub fn test_png(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    use image::codecs::png::PngEncoder;
    use image::{ImageEncoder, Rgba, RgbaImage};

    let image = RgbaImage::from_fn(width, height, |x, y| Rgba(pixel(x, y)));
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(image.as_raw(), width, height, image::ColorType::Rgba8)
        .unwrap();
    buffer
}

/// Builder for raw multipart/form-data request bodies.
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        MultipartBuilder { body: Vec::new() }
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// Build a POST /upload request around a multipart body.
pub fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .uri("/upload")
        .method("POST")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
