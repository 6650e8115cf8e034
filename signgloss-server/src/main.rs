//! signgloss-server - main entry point
//!
//! Startup order: parse arguments, load configuration, initialize tracing,
//! resolve secrets, build clients and caches, warm the caches, serve.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use signgloss_common::config::{resolve_secret, ConfigResolver, ConfigSource};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signgloss_server::cache::{RefreshPolicy, SelfHealingCache};
use signgloss_server::clients::{
    CloudTranslateClient, DocumentStoreClient, GeminiClient, GlossKeySource, VideoAssetSource,
};
use signgloss_server::pipeline::{PipelineSettings, ResolutionPipeline};
use signgloss_server::types::GlossAsset;
use signgloss_server::{build_router, AppState};

/// Command-line arguments for signgloss-server
#[derive(Parser, Debug)]
#[command(name = "signgloss-server")]
#[command(about = "Text-to-gloss and gloss-to-video service")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "SIGNGLOSS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides [server] bind)
    #[arg(short, long, env = "SIGNGLOSS_BIND")]
    bind: Option<String>,

    /// Log level when RUST_LOG is unset (overrides [logging] level)
    #[arg(long)]
    log_level: Option<String>,

    /// Skip loading the catalogs before accepting requests
    #[arg(long)]
    skip_warmup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let (config, config_source) = resolver
        .load_with_source()
        .context("Failed to load configuration")?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("signgloss_server={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting signgloss-server v{} ({} build)",
        env!("CARGO_PKG_VERSION"),
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );
    match &config_source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
    }

    let generator_key = resolve_secret(
        &["SIGNGLOSS_GENERATOR_API_KEY", "GEMINI_API_KEY"],
        config.generator.api_key.as_deref(),
    )
    .context("No generator API key: set SIGNGLOSS_GENERATOR_API_KEY or [generator] api_key")?;
    let translation_token = resolve_secret(
        &["SIGNGLOSS_TRANSLATION_TOKEN"],
        config.translation.access_token.as_deref(),
    );
    let store_token = resolve_secret(
        &["SIGNGLOSS_DOCUMENT_STORE_TOKEN"],
        config.document_store.access_token.as_deref(),
    );

    let store = Arc::new(
        DocumentStoreClient::new(&config.document_store, store_token)
            .context("Failed to build document store client")?,
    );
    let translator = Arc::new(
        CloudTranslateClient::new(&config.translation, translation_token)
            .context("Failed to build translation client")?,
    );
    let generator = Arc::new(
        GeminiClient::new(&config.generator, generator_key)
            .context("Failed to build generator client")?,
    );

    let policy = RefreshPolicy::from(&config.cache);
    let gloss_cache = Arc::new(SelfHealingCache::<()>::new(
        "gloss_catalog",
        Arc::new(GlossKeySource::new(
            Arc::clone(&store),
            config.document_store.gloss_collection.clone(),
        )),
        policy.clone(),
    ));
    let video_cache = Arc::new(SelfHealingCache::<GlossAsset>::new(
        "video_catalog",
        Arc::new(VideoAssetSource::new(
            Arc::clone(&store),
            config.document_store.video_collection.clone(),
            &config.assets,
        )),
        policy,
    ));

    if args.skip_warmup {
        info!("Skipping catalog warm-up");
    } else {
        match gloss_cache.warm().await {
            Ok(count) => info!("Gloss catalog ready: {} glosses", count),
            Err(e) => warn!("Gloss catalog warm-up failed, retrying on first request: {}", e),
        }
        match video_cache.warm().await {
            Ok(count) => info!("Video catalog ready: {} clips", count),
            Err(e) => warn!("Video catalog warm-up failed, retrying on first request: {}", e),
        }
    }

    let pipeline = ResolutionPipeline::new(
        Arc::clone(&gloss_cache),
        translator,
        generator,
        PipelineSettings::from_config(&config.pipeline, &config.translation),
    );
    let app = build_router(AppState::new(pipeline, gloss_cache, video_cache));

    let bind = args.bind.unwrap_or(config.server.bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

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
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
