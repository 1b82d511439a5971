use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::api::views::UserProfile;
use crate::app::AppState;
use crate::auth::config::SessionConfig;
use crate::auth::middleware::CurrentUser;
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::auth::session::{issue_token, removal_cookie, session_cookie};
use crate::db::models::User;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::mail::mailer::{send_best_effort, Mailer};
use crate::mail::templates::{profile_url, welcome_email};

/// Request body for `POST /api/v1/auth/signup`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Body of every message-only response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Core signup logic.
///
/// Validates the request, creates the account, issues a session token and
/// sends the welcome email (a mail failure does not fail the signup).
pub async fn process_signup(
    users: &dyn UserRepository,
    mailer: &dyn Mailer,
    session: &SessionConfig,
    client_url: &str,
    request: SignupRequest,
) -> Result<AuthSession, AppError> {
    let name = request.name.trim().to_string();
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_lowercase();

    if name.is_empty() || username.is_empty() || email.is_empty() || request.password.is_empty()
    {
        return Err(AppError::BadRequest("All fields are required".into()));
    }

    if users.find_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already exists".into()));
    }

    if users.find_by_username(&username).await?.is_some() {
        return Err(AppError::BadRequest("Username already exists".into()));
    }

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&request.password)?;
    let user = User::new(name, username, email, password_hash);
    users.create(user.clone()).await?;

    tracing::info!("Registered user {}", user.username);

    let token = issue_token(session, &user.id)?;

    send_best_effort(
        mailer,
        welcome_email(&user.email, &user.name, &profile_url(client_url, &user.username)),
    )
    .await;

    Ok(AuthSession { user, token })
}

/// Core login logic. Unknown users and wrong passwords are indistinguishable.
pub async fn process_login(
    users: &dyn UserRepository,
    session: &SessionConfig,
    request: LoginRequest,
) -> Result<AuthSession, AppError> {
    let invalid = || AppError::BadRequest("Invalid credentials".into());

    let user = users
        .find_by_username(request.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password) {
        return Err(invalid());
    }

    let token = issue_token(session, &user.id)?;
    Ok(AuthSession { user, token })
}

/// `POST /api/v1/auth/signup`
pub async fn signup_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<MessageResponse>), AppError> {
    let auth = process_signup(
        state.user_repo.as_ref(),
        state.mailer.as_ref(),
        &state.session,
        &state.client_url,
        request,
    )
    .await?;

    let jar = jar.add(session_cookie(&state.session, auth.token));

    Ok((
        StatusCode::CREATED,
        jar,
        MessageResponse::new("User registered successfully"),
    ))
}

/// `POST /api/v1/auth/login`
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let auth = process_login(state.user_repo.as_ref(), &state.session, request).await?;

    let jar = jar.add(session_cookie(&state.session, auth.token));

    Ok((jar, MessageResponse::new("Logged in successfully")))
}

/// `POST /api/v1/auth/logout`: clears the session cookie.
pub async fn logout_handler(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(removal_cookie()),
        MessageResponse::new("Logged out successfully"),
    )
}

/// `GET /api/v1/auth/me`
pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(user))
}
