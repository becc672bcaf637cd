mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod ocr;
mod services;
mod storage;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::ocr::{OcrEngine, ReadClient};
use crate::storage::BlobStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<dyn BlobStore>,
    pub ocr: Arc<dyn OcrEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagecollector=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting imagecollector...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    // Initialize blob storage
    let storage = storage::from_config(&config)?;
    storage.ensure_container().await?;
    tracing::info!("Blob container ready ({})", storage.storage_type());

    // OCR client
    let ocr: Arc<dyn OcrEngine> = Arc::new(ReadClient::new(&config.ocr));

    // Create app state
    let state = AppState {
        db,
        config: config.clone(),
        storage,
        ocr,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Signed blob links carry their own authorization
    let public_routes = Router::new().route("/blobs/:name", get(handlers::blob::get_blob));

    // Protected routes (auth required); the organizational policy for
    // upload and delete is enforced in the handlers
    let protected_routes = Router::new()
        .route("/images", get(handlers::image::index))
        .route("/images/watch", get(handlers::image::watch))
        .route(
            "/images/upload",
            get(handlers::image::upload_form).post(handlers::image::upload),
        )
        .route("/images/details", get(handlers::image::details))
        .route("/images/download", get(handlers::image::download))
        .route("/images/delete", get(handlers::image::delete))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .nest("/api/v1", protected_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
