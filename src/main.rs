use editorial_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{S3StorageClient, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Missing required variables abort here, before anything is listening.
    let config = AppConfig::load();

    // RUST_LOG wins when set; otherwise default to chatty local levels.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "editorial_portal=debug,tower_http=info,axum=trace".into());

    // Pretty output for a terminal, JSON once a log aggregator is reading.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(env = ?config.env, "starting editorial portal");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("could not connect to Postgres; check DATABASE_URL");
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // MinIO starts empty; create the bucket when developing locally.
    if config.env == Env::Local {
        use editorial_portal::storage::StorageService;
        s3_client.ensure_bucket_exists().await;
    }
    let storage = Arc::new(s3_client) as StorageState;

    let app = create_router(AppState {
        repo,
        storage,
        config,
    });

    let listener = TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("could not bind 0.0.0.0:3000");

    tracing::info!("listening on 0.0.0.0:3000");
    tracing::info!("swagger ui at http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("server exited with an error");
}
