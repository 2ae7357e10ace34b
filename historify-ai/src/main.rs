//! historify-ai - Historical Image Analysis Service
//!
//! Accepts photograph uploads, infers historical metadata with a vision
//! model, persists the validated results and serves browse, search and
//! statistics views over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;

use historify_ai::config::{self, ServiceSettings};
use historify_ai::db::{PersistenceFacade, PersistenceSettings};
use historify_ai::services::{FirebaseImageStore, NominatimGeoLookup, OpenAiVisionAnalyzer};
use historify_ai::AppState;
use historify_common::config::{
    load_toml_config, resolve_config_path, RootFolderInitializer, RootFolderResolver,
};

/// Command-line arguments for historify-ai
#[derive(Parser, Debug)]
#[command(name = "historify-ai")]
#[command(about = "Historical image analysis service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "HISTORIFY_PORT")]
    port: Option<u16>,

    /// Root folder for the local database and stored images
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to historify.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Bootstrap configuration
    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    historify_common::logging::init_logging(&toml_config.logging.level);

    info!("Starting historify-ai (Historical Image Analysis)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path.display());

    // Step 2: Resolve and create root folder
    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &toml_config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    // Step 3: Resolve secrets and select persistence backend
    let settings = ServiceSettings::resolve(&toml_config);

    let persistence = PersistenceFacade::connect(&PersistenceSettings {
        supabase: settings.supabase.clone(),
        database_url: settings.database_url.clone(),
        sqlite_path: initializer.database_path(),
    })
    .await
    .context("Failed to initialize persistence")?;

    // Step 4: External clients
    let image_store = FirebaseImageStore::new(settings.firebase.clone(), initializer.uploads_dir())
        .context("Failed to create image store")?;
    let vision = OpenAiVisionAnalyzer::new(settings.openai.clone())
        .context("Failed to create vision client")?;
    let geo = NominatimGeoLookup::new(settings.geocoding_base_url.clone(), settings.geocoding_enabled)
        .context("Failed to create geocoder")?;

    let state = AppState::new(
        persistence,
        Arc::new(image_store),
        Arc::new(vision),
        Arc::new(geo),
    );

    let app = historify_ai::build_router(state);

    // Step 5: Serve
    let port = config::resolve_port(args.port, &toml_config);
    let addr = SocketAddr::new(args.bind, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
