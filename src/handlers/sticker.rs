use crate::models::errors::AppError;
use crate::models::sticker::{StickerJob, StickerOptions, TransformMode};
use crate::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{Json, Response},
};
use futures_util::TryStreamExt;
use multer::Multipart;
use serde_json::{json, Value};
use std::time::Duration;

/// Accept a multipart image upload, run the sticker transform, and answer
/// with the result as a downloadable attachment.
///
/// The request owns the whole lifecycle: the stored upload is deleted as
/// soon as the transform output is in hand, and the processed file is
/// removed by a timer shortly after the response is built.
pub async fn create_sticker(
    State(app_state): State<AppState>,
    request: Request<Body>,
) -> Result<Response<Body>, (StatusCode, Json<Value>)> {
    let boundary = request
        .headers()
        .get("content-type")
        .and_then(|ct| ct.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid content type",
                    "message": "Missing or invalid multipart boundary"
                })),
            )
        })?;

    // Convert the request body to a stream
    let stream = request
        .into_body()
        .into_data_stream()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));

    let mut multipart = Multipart::new(stream, boundary);

    let mut image_data = None;
    let mut original_filename: Option<String> = None;
    let mut upload_content_type: Option<String> = None;
    let mut options = StickerOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid multipart data",
                "message": format!("Failed to parse uploaded file: {}", e)
            })),
        )
    })? {
        let name = field
            .name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        match name.as_str() {
            "image" | "file" => {
                original_filename = field.file_name().map(|s| s.to_string());
                upload_content_type = field.content_type().map(|ct| ct.to_string());

                let data = field.bytes().await.map_err(|e| {
                    tracing::error!("Failed to read file data: {}", e);
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "error": "Failed to read file data",
                            "message": e.to_string()
                        })),
                    )
                })?;
                image_data = Some(data);
            }
            "mode" => {
                let raw = read_text_field(field).await?;
                options.mode = TransformMode::parse(&raw).ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "error": "Invalid mode",
                            "message": format!("Unknown transform mode '{}'", raw),
                            "supported_modes": ["keyout", "flatten"]
                        })),
                    )
                })?;
            }
            "threshold" => {
                let raw = read_text_field(field).await?;
                let threshold = raw.trim().parse::<u16>().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "error": "Invalid threshold",
                            "message": format!("Threshold '{}' is not a number in 0..=765", raw)
                        })),
                    )
                })?;
                options = options.with_threshold(threshold);
            }
            "outline" => {
                let raw = read_text_field(field).await?;
                options.outline = matches!(raw.trim(), "true" | "1" | "on");
            }
            "outline_radius" => {
                let raw = read_text_field(field).await?;
                let radius = raw.trim().parse::<u32>().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "error": "Invalid outline radius",
                            "message": format!("Outline radius '{}' is not a number", raw)
                        })),
                    )
                })?;
                options.outline_radius = Some(radius);
            }
            other => {
                tracing::debug!("Ignoring unexpected multipart field: {}", other);
            }
        }
    }

    let data = image_data.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "No image uploaded",
                "message": "Please select an image file to upload"
            })),
        )
    })?;

    // Validate file size
    if data.len() > app_state.config.max_file_size {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({
                "error": "File too large",
                "message": format!("File size {} bytes exceeds maximum of {} bytes",
                                 data.len(), app_state.config.max_file_size),
                "max_size": app_state.config.max_file_size
            })),
        ));
    }

    // Validate file format based on magic bytes, with content type fallback
    let extension = sniff_image_format(&data, upload_content_type.as_deref()).ok_or_else(|| {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({
                "error": "Unsupported file format",
                "message": "Only PNG, JPG, and JPEG images are supported",
                "supported_formats": ["image/png", "image/jpeg", "image/jpg"]
            })),
        )
    })?;

    let job = StickerJob::new(original_filename, data.len(), options);
    tracing::info!(
        "Starting sticker job {} ({} bytes, mode {:?})",
        job.id,
        job.upload_size,
        job.options.mode
    );

    let storage = &app_state.storage;

    // Store the original before processing, mirroring the on-disk lifecycle
    let upload_id = storage.store_temp_file(&data, extension).await.map_err(|e| {
        tracing::error!("Failed to store uploaded file for job {}: {}", job.id, e);
        error_response(&e)
    })?;

    let result = match app_state.transform.apply(&data, &job.options) {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Transform failed for job {}: {}", job.id, e);
            remove_quietly(storage, &upload_id, extension).await;
            return Err(error_response(&e));
        }
    };

    let processed_id = match storage
        .store_temp_file(&result.data, result.file_extension)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to store processed file for job {}: {}", job.id, e);
            remove_quietly(storage, &upload_id, extension).await;
            return Err(error_response(&e));
        }
    };

    let file_data = match storage
        .read_temp_file(&processed_id, result.file_extension)
        .await
    {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to read processed file for job {}: {}", job.id, e);
            remove_quietly(storage, &upload_id, extension).await;
            remove_quietly(storage, &processed_id, result.file_extension).await;
            return Err(error_response(&e));
        }
    };

    // The original is no longer needed once the result is in hand
    remove_quietly(storage, &upload_id, extension).await;

    // The processed file lingers briefly so slow clients can finish the
    // transfer, then a timer removes it
    let linger = Duration::from_secs(app_state.config.processed_linger_seconds);
    let cleanup_storage = app_state.storage.clone();
    let cleanup_id = processed_id.clone();
    let cleanup_extension = result.file_extension;
    tokio::spawn(async move {
        tokio::time::sleep(linger).await;
        if let Err(e) = cleanup_storage
            .delete_temp_file(&cleanup_id, cleanup_extension)
            .await
        {
            tracing::warn!("Failed to delete processed file {}: {}", cleanup_id, e);
        }
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, result.content_type)
        .header(header::CONTENT_LENGTH, file_data.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", result.download_name),
        )
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(Body::from(file_data))
        .map_err(|e| {
            tracing::error!("Failed to build response for job {}: {}", job.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Response building failed",
                    "message": "Unable to create download response"
                })),
            )
        })?;

    tracing::info!(
        "Sticker job {} complete: {}x{} {} ({} bytes)",
        job.id,
        result.width,
        result.height,
        result.content_type,
        result.data.len()
    );

    Ok(response)
}

/// Read a text form field, mapping read failures to a 400.
async fn read_text_field(
    field: multer::Field<'_>,
) -> Result<String, (StatusCode, Json<Value>)> {
    field.text().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid form field",
                "message": e.to_string()
            })),
        )
    })
}

/// Map an `AppError` onto the JSON error body shape used by this API.
fn error_response(error: &AppError) -> (StatusCode, Json<Value>) {
    (
        error.status_code(),
        Json(json!({
            "error": error.error_code(),
            "message": error.to_string(),
        })),
    )
}

/// Best-effort delete for lifecycle cleanup; failures are logged, not
/// surfaced, since the background sweep will catch leftovers.
async fn remove_quietly(
    storage: &crate::services::file_storage::FileStorageService,
    file_id: &str,
    extension: &str,
) {
    if let Err(e) = storage.delete_temp_file(file_id, extension).await {
        tracing::warn!("Failed to delete temp file {}: {}", file_id, e);
    }
}

/// Identify the upload as PNG or JPEG by magic bytes, falling back to the
/// declared content type for encoders the sniffer doesn't recognize.
fn sniff_image_format(data: &[u8], content_type: Option<&str>) -> Option<&'static str> {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    let declared: mime::Mime = content_type?.parse().ok()?;
    if declared.type_() != mime::IMAGE {
        return None;
    }
    match declared.subtype().as_str() {
        "png" => Some("png"),
        "jpeg" | "jpg" => Some("jpg"),
        _ => None,
    }
}
