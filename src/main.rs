use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use unlinked::app::{build_router, AppState, HttpOptions};
use unlinked::auth::config::SessionConfig;
use unlinked::config::AppConfig;
use unlinked::db::connection_repository::MongoConnectionRepository;
use unlinked::db::notification_repository::MongoNotificationRepository;
use unlinked::db::post_repository::MongoPostRepository;
use unlinked::db::user_repository::MongoUserRepository;
use unlinked::mail::mailer::{LogMailer, MailtrapMailer, Mailer};
use unlinked::storage::client::{S3StorageClient, StorageClient};
use unlinked::storage::media::MediaUrls;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Optional configuration file (TOML, YAML or JSON); environment variables override it.
    #[arg(long, env = "UNLINKED_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unlinked=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting UnLinked server...");

    let config = AppConfig::load(cli.config.as_deref())?;
    let session = SessionConfig::new(
        config.jwt_secret.clone(),
        config.session_ttl_days,
        config.production,
    )?;

    // Connect to MongoDB
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    let mongo_db = mongo_client.database(&config.mongo_database);

    let users = MongoUserRepository::new(&mongo_db);
    users.ensure_indexes().await?;

    tracing::info!("Connected to MongoDB database {}", config.mongo_database);

    // Connect to S3
    let storage_client: Arc<dyn StorageClient> = Arc::new(
        S3StorageClient::connect(
            config.s3_bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint.as_deref(),
        )
        .await?,
    );

    tracing::info!("S3 storage client initialized for bucket {}", config.s3_bucket);

    let mailer: Arc<dyn Mailer> = match config.mailtrap_token.clone().filter(|t| !t.is_empty()) {
        Some(token) => Arc::new(MailtrapMailer::new(
            config.mailtrap_api_url.clone(),
            token,
            config.email_from.clone(),
            config.email_from_name.clone(),
        )),
        None => {
            tracing::warn!("MAILTRAP_TOKEN not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state = AppState {
        user_repo: Arc::new(users),
        post_repo: Arc::new(MongoPostRepository::new(&mongo_db)),
        connection_repo: Arc::new(MongoConnectionRepository::new(&mongo_db)),
        notification_repo: Arc::new(MongoNotificationRepository::new(&mongo_db)),
        storage_client,
        mailer,
        session,
        media_urls: MediaUrls::new(config.media_base_url.clone()),
        client_url: config.client_url.clone(),
    };

    let app = build_router(
        state,
        &HttpOptions {
            cors_origins: config.cors_origin_list(),
            body_limit_bytes: config.body_limit_bytes,
        },
    );

    // Start the server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
