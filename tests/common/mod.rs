#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::minio::MinIO;
use testcontainers_modules::mongo::Mongo;

use unlinked::app::{build_router, AppState, HttpOptions};
use unlinked::auth::config::SessionConfig;
use unlinked::db::connection_repository::MongoConnectionRepository;
use unlinked::db::notification_repository::{MongoNotificationRepository, NotificationRepository};
use unlinked::db::post_repository::{MongoPostRepository, PostRepository};
use unlinked::db::user_repository::{MongoUserRepository, UserRepository};
use unlinked::error::AppError;
use unlinked::mail::mailer::{EmailMessage, Mailer};
use unlinked::storage::client::{S3StorageClient, StorageClient};
use unlinked::storage::media::MediaUrls;

pub const CLIENT_URL: &str = "http://client.test";

/// Mailer that keeps every message for later inspection.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Holds running containers and provides the Axum router for integration tests.
///
/// Containers are kept alive for as long as this struct lives. When dropped,
/// containers are stopped and cleaned up automatically.
pub struct TestEnv {
    _mongo: ContainerAsync<Mongo>,
    _minio: ContainerAsync<MinIO>,
    pub router: Router,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestEnv {
    /// Spin up MongoDB and MinIO and build the full router wired to them.
    pub async fn start() -> Self {
        let (mongo_container, minio_container) =
            tokio::join!(Mongo::default().start(), MinIO::default().start());
        let mongo_container = mongo_container.expect("Failed to start MongoDB container");
        let minio_container = minio_container.expect("Failed to start MinIO container");

        // --- MongoDB ---
        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        let mongo_uri = format!("mongodb://127.0.0.1:{}", mongo_port);
        let mongo_client = mongodb::Client::with_uri_str(&mongo_uri)
            .await
            .expect("Failed to connect to MongoDB");
        let mongo_db = mongo_client.database("unlinked_test");

        let user_repo = MongoUserRepository::new(&mongo_db);
        user_repo
            .ensure_indexes()
            .await
            .expect("Failed to create user indexes");
        let users: Arc<dyn UserRepository> = Arc::new(user_repo);
        let posts: Arc<dyn PostRepository> = Arc::new(MongoPostRepository::new(&mongo_db));
        let notifications: Arc<dyn NotificationRepository> =
            Arc::new(MongoNotificationRepository::new(&mongo_db));

        // --- MinIO (S3) ---
        let minio_port = minio_container
            .get_host_port_ipv4(9000)
            .await
            .expect("Failed to get MinIO port");
        let minio_endpoint = format!("http://127.0.0.1:{}", minio_port);

        // Set env vars for AWS SDK to pick up MinIO credentials
        unsafe {
            std::env::set_var("AWS_ACCESS_KEY_ID", "minioadmin");
            std::env::set_var("AWS_SECRET_ACCESS_KEY", "minioadmin");
            std::env::set_var("AWS_REGION", "us-east-1");
        }

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(&minio_endpoint)
            .region(aws_config::Region::new("us-east-1"))
            .load()
            .await;

        let s3_client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&s3_config)
                .force_path_style(true)
                .build(),
        );

        let bucket_name = "unlinked-test";
        let _ = s3_client.create_bucket().bucket(bucket_name).send().await;

        let storage: Arc<dyn StorageClient> =
            Arc::new(S3StorageClient::new(s3_client, bucket_name.to_string()));

        // --- Build AppState ---
        let mailer = Arc::new(RecordingMailer::default());

        let app_state = AppState {
            user_repo: users.clone(),
            post_repo: posts.clone(),
            connection_repo: Arc::new(MongoConnectionRepository::new(&mongo_db)),
            notification_repo: notifications.clone(),
            storage_client: storage.clone(),
            mailer: mailer.clone(),
            session: SessionConfig::for_tests("integration-secret"),
            media_urls: MediaUrls::default(),
            client_url: CLIENT_URL.to_string(),
        };

        let router = build_router(
            app_state,
            &HttpOptions {
                cors_origins: vec![CLIENT_URL.to_string()],
                body_limit_bytes: 1024 * 1024,
            },
        );

        Self {
            _mongo: mongo_container,
            _minio: minio_container,
            router,
            users,
            posts,
            notifications,
            storage,
            mailer,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    ///
    /// Every server keeps its own cookie jar, so one server per user acts as
    /// one browser session.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .expect_success_by_default()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Helper: register a user through the API on `server`, leaving it logged in.
    pub async fn signup(&self, server: &axum_test::TestServer, username: &str) -> String {
        server
            .post("/api/v1/auth/signup")
            .json(&serde_json::json!({
                "name": format!("{} Tester", username),
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "secret123"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let me: serde_json::Value = server.get("/api/v1/auth/me").await.json();
        me["_id"]
            .as_str()
            .expect("Profile should have an _id")
            .to_string()
    }

    /// Helper: a new logged-in session for a freshly registered user.
    ///
    /// Returns the session and the user's id.
    pub async fn user_session(&self, username: &str) -> (axum_test::TestServer, String) {
        let server = self.server();
        let id = self.signup(&server, username).await;
        (server, id)
    }

    /// Helper: create a text post and return its id.
    pub async fn create_post(&self, server: &axum_test::TestServer, content: &str) -> String {
        let response = server
            .post("/api/v1/posts/create")
            .json(&serde_json::json!({ "content": content }))
            .await;
        let body: serde_json::Value = response.json();
        body["_id"]
            .as_str()
            .expect("Post should have an _id")
            .to_string()
    }
}

/// A 1x1 PNG encoded as a data URL.
pub fn png_data_url() -> String {
    use base64::Engine;

    let png_bytes: Vec<u8> = vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, // bit depth, color type, CRC
        0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT chunk
        0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, // compressed data
        0x00, 0x02, 0x00, 0x01, 0xE2, 0x21, 0xBC, 0x33, // CRC
        0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
        0xAE, 0x42, 0x60, 0x82,
    ];
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes)
    )
}
