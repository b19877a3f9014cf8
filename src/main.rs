//! blob-thumbs - On-demand thumbnails for a content-addressable blob store.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blob_thumbs::{
    blob::{BlobStore, DiskStore, MemoryStore},
    config::Config,
    metrics::{Counters, Metrics},
    scale::{CodecDecoder, Gate, Scaler},
    server::{create_router, AppState, ImageHandler, RouterConfig},
    thumb::{LogThumbIndex, LruThumbIndex, ThumbCache, ThumbIndex},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("blob-thumbs v{}", env!("CARGO_PKG_VERSION"));

    match (config.data_dir.clone(), config.index_path()) {
        (Some(dir), Some(index_path)) => {
            let store = match DiskStore::open(&dir) {
                Ok(store) => store,
                Err(e) => {
                    error!("Failed to open blob store at {}: {}", dir.display(), e);
                    return ExitCode::FAILURE;
                }
            };
            let index = match LogThumbIndex::open(&index_path).await {
                Ok(index) => index,
                Err(e) => {
                    error!(
                        "Failed to open thumbnail index at {}: {}",
                        index_path.display(),
                        e
                    );
                    return ExitCode::FAILURE;
                }
            };
            info!("  Storage: {}", dir.display());
            info!("  Thumbnail index: {} entries", index.len().await);
            run_serve(config, Arc::new(store), Arc::new(index)).await
        }
        _ => {
            warn!("  Storage: in memory (no --data-dir), contents are lost on exit");
            let index = LruThumbIndex::with_capacity(config.index_capacity);
            run_serve(config, Arc::new(MemoryStore::new()), Arc::new(index)).await
        }
    }
}

// =============================================================================
// Serve
// =============================================================================

async fn run_serve<S>(config: Config, store: Arc<S>, index: Arc<dyn ThumbIndex>) -> ExitCode
where
    S: BlobStore + 'static,
{
    info!("Configuration:");
    info!(
        "  Max image size: {}, default {}x{}",
        config.max_image_size, config.default_width, config.default_height
    );
    info!(
        "  Concurrency: slurp {}, resize {}",
        config.slurp_concurrency, config.resize_concurrency
    );
    if config.cache_enabled() {
        info!("  Thumbnail cache: enabled");
    } else {
        warn!("  Thumbnail cache: lookups DISABLED, every request is rescaled");
    }

    let counters = Arc::new(Counters::new());
    let metrics: Arc<dyn Metrics> = counters.clone();

    let scaler = Scaler::with_gates(
        Arc::clone(&store),
        Arc::new(CodecDecoder),
        Gate::new("slurp", config.slurp_concurrency),
        Gate::new("resize", config.resize_concurrency),
    )
    .with_metrics(Arc::clone(&metrics));

    let images = ImageHandler::new(scaler)
        .with_cache(ThumbCache::new(Arc::clone(&store), index))
        .with_metrics(metrics)
        .with_max_image_size(config.max_image_size)
        .with_cache_enabled(config.cache_enabled());

    let state = AppState::new(images, store, counters)
        .with_default_size(config.default_width, config.default_height);

    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -T photo.jpg http://{}/blobs", addr);
    info!("    curl -o thumb http://{}/thumbnail/<ref>?mw=200&mh=200", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "blob_thumbs=debug,tower_http=debug"
    } else {
        "blob_thumbs=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_max_upload_bytes(config.max_upload_bytes);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}
