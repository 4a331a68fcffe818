// json2sheet - AI-assisted JSON to Excel backend with Gemini context caching
// Author: json2sheet contributors

use anyhow::Result;
use clap::Parser;
use json2sheet::cache::{CacheProvider, CacheService, ExpirySweeper, NullCacheProvider};
use json2sheet::cli::Args;
use json2sheet::config::AppConfig;
use json2sheet::gemini::GeminiClient;
use json2sheet::generation::{ContentGenerator, GenerationService};
use json2sheet::server::{create_router, AppState};
use json2sheet::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting json2sheet v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Gemini client, when an API key is available
    let gemini_client = if config.gemini.api_key.is_empty() {
        warn!("No Gemini API key configured; generation disabled, cache entries stay memory-only");
        None
    } else {
        Some(Arc::new(GeminiClient::new(&config.gemini)?))
    };

    // Phase 4: Content cache and its expiry sweeper
    let (cache, sweeper) = if config.cache.enabled {
        let provider: Arc<dyn CacheProvider> = match &gemini_client {
            Some(client) => client.clone(),
            None => Arc::new(NullCacheProvider),
        };
        let cache = Arc::new(CacheService::new(config.cache.clone(), provider));
        let sweeper =
            ExpirySweeper::new(cache.clone(), config.cache.cleanup_interval()).start();
        info!(
            "Content cache enabled: max_entries={}, default_ttl={}s",
            config.cache.max_entries, config.cache.default_ttl_seconds
        );
        (Some(cache), Some(sweeper))
    } else {
        info!("Content cache disabled");
        (None, None)
    };

    // Phase 5: Generation service
    let generation = gemini_client.map(|client| {
        let generator: Arc<dyn ContentGenerator> = client;
        Arc::new(GenerationService::new(
            generator,
            cache.clone(),
            config.gemini.default_model.clone(),
        ))
    });

    // Phase 6: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(AppState {
        config: Arc::new(config),
        cache,
        generation,
    });

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 7: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
