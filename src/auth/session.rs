use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::config::SessionConfig;
use crate::auth::models::SessionClaims;
use crate::error::AppError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "jwt-linkedin";

/// Sign a session token for `user_id`.
pub fn issue_token(config: &SessionConfig, user_id: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = SessionClaims {
        user_id: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(config.ttl_days)).timestamp(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign session token: {e}")))
}

/// Verify a session token's signature and expiry.
pub fn verify_token(config: &SessionConfig, token: &str) -> Result<SessionClaims, AppError> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected session token: {e}");
        AppError::Auth("Unauthorized - Invalid Token".into())
    })
}

/// Build the cookie carrying a freshly issued session token.
pub fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(config.ttl_days))
        .build()
}

/// Build the cookie that clears the session.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .removal()
        .build()
}
