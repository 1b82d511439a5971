use base64::Engine;

use crate::error::AppError;
use crate::storage::client::StorageClient;

/// Default public path under which stored media is served.
pub const DEFAULT_MEDIA_PATH: &str = "/api/v1/media";

/// Key prefixes the media endpoint is allowed to serve.
pub const MEDIA_PREFIXES: &[&str] = &["posts/", "profiles/", "banners/"];

/// Which kind of media a data URL must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn mime_prefix(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/",
            MediaKind::Video => "video/",
        }
    }
}

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

/// Decode a base64 data URL.
pub fn parse_data_url(value: &str) -> Result<DataUrl, AppError> {
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| AppError::BadRequest("Media must be a data URL".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::BadRequest("Malformed data URL".into()))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::BadRequest("Only base64 data URLs are supported".into()))?;

    if mime.is_empty() {
        return Err(AppError::BadRequest("Data URL is missing a media type".into()));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 media: {e}")))?;

    if bytes.is_empty() {
        return Err(AppError::BadRequest("Media payload is empty".into()));
    }

    Ok(DataUrl {
        mime: mime.to_ascii_lowercase(),
        bytes,
    })
}

/// File extension used when storing the given MIME type, or `None` when the type
/// is not accepted. Scriptable formats such as SVG are never stored.
pub fn extension_for(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/ogg" => "ogv",
        "video/quicktime" => "mov",
        _ => return None,
    };
    Some(ext)
}

/// Content type inferred from a stored key's extension.
pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogv") => "video/ogg",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Maps storage keys to public URLs and back.
#[derive(Debug, Clone)]
pub struct MediaUrls {
    base: String,
}

impl MediaUrls {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base, key)
    }

    /// The storage key behind a URL produced by [`MediaUrls::url_for`].
    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base.as_str())?
            .strip_prefix('/')
            .filter(|key| !key.is_empty())
    }
}

impl Default for MediaUrls {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_PATH)
    }
}

/// Upload a data URL under `prefix` and return its public URL.
pub async fn upload_data_url(
    storage: &dyn StorageClient,
    urls: &MediaUrls,
    prefix: &str,
    value: &str,
    kind: MediaKind,
) -> Result<String, AppError> {
    let data = parse_data_url(value)?;

    if !data.mime.starts_with(kind.mime_prefix()) {
        return Err(AppError::BadRequest(format!(
            "Expected {}* media, got '{}'",
            kind.mime_prefix(),
            data.mime
        )));
    }

    let ext = extension_for(&data.mime).ok_or_else(|| {
        AppError::BadRequest(format!("Unsupported media type '{}'", data.mime))
    })?;

    let key = format!("{}/{}.{}", prefix.trim_end_matches('/'), uuid::Uuid::new_v4(), ext);

    storage.put_object(&key, data.bytes, &data.mime).await?;
    tracing::debug!("Stored media at {key}");

    Ok(urls.url_for(&key))
}

/// Upload `value` when it is a data URL, otherwise keep it as given.
pub async fn store_if_data_url(
    storage: &dyn StorageClient,
    urls: &MediaUrls,
    prefix: &str,
    value: String,
    kind: MediaKind,
) -> Result<String, AppError> {
    if is_data_url(&value) {
        upload_data_url(storage, urls, prefix, &value, kind).await
    } else {
        Ok(value)
    }
}

/// Best-effort removal of media previously stored by this service.
pub async fn remove_stored_media(storage: &dyn StorageClient, urls: &MediaUrls, url: &str) {
    let Some(key) = urls.key_from_url(url) else {
        return;
    };
    if let Err(e) = storage.delete_object(key).await {
        tracing::warn!("Failed to delete media '{key}': {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStorage;

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_parse_data_url() {
        let data = parse_data_url(PNG_DATA_URL).unwrap();
        assert_eq!(data.mime, "image/png");
        assert_eq!(data.bytes[..4], [0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_parse_rejects_non_base64() {
        assert!(parse_data_url("data:image/png,rawdata").is_err());
        assert!(parse_data_url("data:image/png;base64,!!!").is_err());
        assert!(parse_data_url("https://example.com/a.png").is_err());
        assert!(parse_data_url("data:;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_extension_and_content_type_agree() {
        for mime in ["image/png", "image/jpeg", "image/gif", "video/mp4", "video/webm"] {
            let key = format!("posts/x.{}", extension_for(mime).unwrap());
            assert_eq!(content_type_for(&key), mime);
        }
        assert_eq!(extension_for("image/svg+xml"), None);
        assert_eq!(content_type_for("posts/x"), "application/octet-stream");
        assert_eq!(content_type_for("posts/x.svg"), "application/octet-stream");
    }

    #[test]
    fn test_media_urls_roundtrip_key() {
        let urls = MediaUrls::default();
        let url = urls.url_for("posts/abc.png");
        assert_eq!(url, "/api/v1/media/posts/abc.png");
        assert_eq!(urls.key_from_url(&url), Some("posts/abc.png"));
        assert_eq!(urls.key_from_url("https://cdn.example.com/x.png"), None);

        let cdn = MediaUrls::new("https://cdn.example.com/media/");
        assert_eq!(cdn.url_for("posts/a.mp4"), "https://cdn.example.com/media/posts/a.mp4");
    }

    #[tokio::test]
    async fn test_upload_data_url_stores_object() {
        let storage = MemoryStorage::default();
        let urls = MediaUrls::default();

        let url = upload_data_url(&storage, &urls, "posts", PNG_DATA_URL, MediaKind::Image)
            .await
            .unwrap();

        let key = urls.key_from_url(&url).unwrap();
        assert!(key.starts_with("posts/"));
        assert!(key.ends_with(".png"));
        assert!(storage.objects.lock().unwrap().contains_key(key));
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_kind() {
        let storage = MemoryStorage::default();
        let result = upload_data_url(
            &storage,
            &MediaUrls::default(),
            "posts",
            PNG_DATA_URL,
            MediaKind::Video,
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(storage.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_svg() {
        let storage = MemoryStorage::default();
        let svg = format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD
                .encode("<svg><script>fetch('/api/v1/auth/me')</script></svg>")
        );

        let result =
            upload_data_url(&storage, &MediaUrls::default(), "posts", &svg, MediaKind::Image).await;

        match result {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Unsupported media type 'image/svg+xml'")
            }
            other => panic!("Expected BadRequest, got: {:?}", other),
        }
        assert!(storage.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_if_data_url_keeps_plain_urls() {
        let storage = MemoryStorage::default();
        let value = store_if_data_url(
            &storage,
            &MediaUrls::default(),
            "profiles",
            "https://example.com/me.png".to_string(),
            MediaKind::Image,
        )
        .await
        .unwrap();
        assert_eq!(value, "https://example.com/me.png");
        assert!(storage.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_stored_media() {
        let storage = MemoryStorage::default();
        let urls = MediaUrls::default();
        let url = upload_data_url(&storage, &urls, "posts", PNG_DATA_URL, MediaKind::Image)
            .await
            .unwrap();

        remove_stored_media(&storage, &urls, &url).await;
        assert!(storage.objects.lock().unwrap().is_empty());
    }
}
