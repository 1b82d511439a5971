use crate::error::AppError;

/// Placeholder secret used outside production when none is configured.
pub const DEV_JWT_SECRET: &str = "unlinked-dev-secret";

/// Session token and cookie settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC secret for signing session tokens.
    pub secret: String,
    /// Token and cookie lifetime in days.
    pub ttl_days: i64,
    /// Whether the cookie carries the `Secure` attribute.
    pub secure: bool,
}

impl SessionConfig {
    /// Build the session config, refusing a missing secret in production.
    pub fn new(secret: Option<String>, ttl_days: i64, production: bool) -> Result<Self, AppError> {
        let secret = match secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if production => {
                return Err(AppError::Internal("JWT_SECRET must be set in production".into()))
            }
            None => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        if ttl_days <= 0 {
            return Err(AppError::Internal("Session TTL must be positive".into()));
        }

        Ok(Self {
            secret,
            ttl_days,
            secure: production,
        })
    }

    /// Build with explicit values (useful for testing).
    pub fn for_tests(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            ttl_days: 3,
            secure: false,
        }
    }
}
