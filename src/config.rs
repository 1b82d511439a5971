use serde::Deserialize;

use crate::error::AppError;
use crate::mail::mailer::DEFAULT_MAILTRAP_API_URL;
use crate::storage::media::DEFAULT_MEDIA_PATH;

/// Default request body limit: large enough for base64 media in JSON bodies.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// Server configuration.
///
/// Loaded from built-in defaults, then an optional config file, then
/// environment variables (`PORT`, `MONGO_URI`, `JWT_SECRET`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: Option<String>,
    pub session_ttl_days: i64,
    pub production: bool,
    /// Base URL of the web client, used for links in emails.
    pub client_url: String,
    /// Comma-separated list of allowed CORS origins.
    pub cors_origins: String,
    pub body_limit_bytes: usize,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub media_base_url: String,
    pub mailtrap_token: Option<String>,
    pub mailtrap_api_url: String,
    pub email_from: String,
    pub email_from_name: String,
}

impl AppConfig {
    /// Load configuration, reading `file` first when given.
    pub fn load(file: Option<&std::path::Path>) -> Result<Self, AppError> {
        Self::builder(file)
            .and_then(|builder| builder.build())
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| AppError::Internal(format!("Invalid configuration: {e}")))
    }

    fn builder(
        file: Option<&std::path::Path>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000)?
            .set_default("mongo_uri", "mongodb://localhost:27017")?
            .set_default("mongo_database", "unlinked")?
            .set_default("session_ttl_days", 3)?
            .set_default("production", false)?
            .set_default("client_url", "http://localhost:5173")?
            .set_default(
                "cors_origins",
                "http://localhost:5173,http://localhost:5174,http://localhost:5175",
            )?
            .set_default("body_limit_bytes", DEFAULT_BODY_LIMIT_BYTES as i64)?
            .set_default("s3_bucket", "unlinked-media")?
            .set_default("s3_region", "us-east-1")?
            .set_default("media_base_url", DEFAULT_MEDIA_PATH)?
            .set_default("mailtrap_api_url", DEFAULT_MAILTRAP_API_URL)?
            .set_default("email_from", "noreply@demomailtrap.co")?
            .set_default("email_from_name", "UnLinked")?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        Ok(builder.add_source(config::Environment::default().try_parsing(true)))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins, trimmed, empty entries dropped.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}
