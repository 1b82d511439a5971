use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::config::SessionConfig;
use crate::db::connection_repository::ConnectionRepository;
use crate::db::notification_repository::NotificationRepository;
use crate::db::post_repository::PostRepository;
use crate::db::user_repository::UserRepository;
use crate::mail::mailer::Mailer;
use crate::storage::client::StorageClient;
use crate::storage::media::MediaUrls;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub user_repo: Arc<dyn UserRepository>,
    pub post_repo: Arc<dyn PostRepository>,
    pub connection_repo: Arc<dyn ConnectionRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub storage_client: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
    pub session: SessionConfig,
    pub media_urls: MediaUrls,
    /// Base URL of the web client, used for links in emails.
    pub client_url: String,
}

/// HTTP-level settings applied around the API routes.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cors_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

/// All `/api/v1` routes, without middleware.
pub fn api_routes() -> Router<AppState> {
    let auth = Router::new()
        .route("/signup", post(api::auth::signup_handler))
        .route("/login", post(api::auth::login_handler))
        .route("/logout", post(api::auth::logout_handler))
        .route("/me", get(api::auth::me_handler));

    let users = Router::new()
        .route("/suggestions", get(api::users::suggestions_handler))
        .route("/profile", put(api::users::update_profile_handler))
        .route("/{username}", get(api::users::public_profile_handler));

    let posts = Router::new()
        .route("/", get(api::posts::feed_handler))
        .route("/create", post(api::posts::create_post_handler))
        .route("/delete/{id}", delete(api::posts::delete_post_handler))
        .route("/{id}", get(api::posts::get_post_handler))
        .route("/{id}/comment", post(api::posts::comment_handler))
        .route("/{id}/like", post(api::posts::like_handler));

    let notifications = Router::new()
        .route("/", get(api::notifications::list_handler))
        .route("/read-all", put(api::notifications::mark_all_read_handler))
        .route("/{id}/read", put(api::notifications::mark_read_handler))
        .route("/{id}", delete(api::notifications::delete_handler));

    let connections = Router::new()
        .route("/", get(api::connections::list_connections_handler))
        .route("/request/{user_id}", post(api::connections::send_request_handler))
        .route("/accept/{request_id}", put(api::connections::accept_handler))
        .route("/reject/{request_id}", put(api::connections::reject_handler))
        .route("/requests", get(api::connections::pending_requests_handler))
        .route("/status/{user_id}", get(api::connections::status_handler))
        .route("/{user_id}", delete(api::connections::remove_handler));

    Router::new()
        .nest("/api/v1/auth", auth)
        .nest("/api/v1/users", users)
        .nest("/api/v1/posts", posts)
        .nest("/api/v1/notifications", notifications)
        .nest("/api/v1/connections", connections)
        .route("/api/v1/media/{*key}", get(api::media::serve_media_handler))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin '{o}': {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Build the complete application router.
pub fn build_router(state: AppState, options: &HttpOptions) -> Router {
    api_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&options.cors_origins))
                .layer(DefaultBodyLimit::max(options.body_limit_bytes)),
        )
        .with_state(state)
}
