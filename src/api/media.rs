use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::app::AppState;
use crate::error::AppError;
use crate::storage::client::StorageClient;
use crate::storage::media::{content_type_for, MEDIA_PREFIXES};

fn media_not_found() -> AppError {
    AppError::NotFound("Media not found".into())
}

/// Fetch a stored media object. Only keys written by the upload path are served.
pub async fn process_fetch_media(
    storage: &dyn StorageClient,
    key: &str,
) -> Result<(Vec<u8>, &'static str), AppError> {
    if key.contains("..") || !MEDIA_PREFIXES.iter().any(|p| key.starts_with(p)) {
        return Err(media_not_found());
    }

    let bytes = storage.get_object(key).await?.ok_or_else(media_not_found)?;
    Ok((bytes, content_type_for(key)))
}

/// Headers sent with every media response. Stored files are user supplied and served
/// from the API origin, so browsers must not sniff them or run them as documents.
pub const MEDIA_SECURITY_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::CONTENT_SECURITY_POLICY, "default-src 'none'; sandbox"),
    (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
];

/// `GET /api/v1/media/{*key}`
pub async fn serve_media_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (bytes, content_type) = process_fetch_media(state.storage_client.as_ref(), &key).await?;

    Ok((
        MEDIA_SECURITY_HEADERS,
        [(header::CONTENT_TYPE, content_type)],
        bytes,
    ))
}
