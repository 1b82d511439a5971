use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::app::AppState;
use crate::auth::config::SessionConfig;
use crate::auth::session::{verify_token, SESSION_COOKIE};
use crate::db::models::User;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

/// Resolve the user behind a session token.
///
/// Fails with 401 when the token is missing or invalid, or when the user it
/// names no longer exists.
pub async fn authenticate(
    users: &dyn UserRepository,
    config: &SessionConfig,
    token: Option<&str>,
) -> Result<User, AppError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Auth("Unauthorized - No Token Provided".into()))?;

    let claims = verify_token(config, token)?;

    users
        .find_by_id(&claims.user_id)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".into()))
}

/// Extractor for the authenticated user of a request.
///
/// Handlers that take a `CurrentUser` argument are only reachable with a
/// valid session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(SESSION_COOKIE).map(|c| c.value());

        let user = authenticate(state.user_repo.as_ref(), &state.session, token).await?;
        Ok(CurrentUser(user))
    }
}
