use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use portal_server::clock::{Clock, SystemClock};
use portal_server::config::{Config, StorageBackend};
use portal_server::menu::Menu;
use portal_server::routes::create_routes;
use portal_server::state::AppState;
use portal_server::store::{BlobStore, LocalBlobStore, MemoryStore, PgStore, TicketStore};
use portal_server::utils::error::AppError;

async fn build_state(config: Config) -> Result<AppState, AppError> {
    let store: Arc<dyn TicketStore> = match config.storage_backend {
        StorageBackend::Postgres => Arc::new(PgStore::connect(&config.database_url).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let blobs: Arc<dyn BlobStore> = Arc::new(
        LocalBlobStore::new(config.upload_dir.clone(), &config.public_base_url).await?,
    );

    let menu = match &config.menu_config_path {
        Some(path) => Menu::load(path)?,
        None => Menu::default(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(store, blobs, clock, menu, config);

    if let Some(admin) = &state.config.admin {
        state.auth.ensure_admin(admin, state.now()).await?;
    }

    Ok(state)
}

async fn run() -> Result<(), AppError> {
    let config = Config::from_env();
    let addr = config.bind_addr;

    let state = build_state(config).await?;
    let app: Router = create_routes(state);

    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Server failed: {}", e)))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Server stopped");
            ExitCode::FAILURE
        }
    }
}
