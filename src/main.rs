mod codec;
mod config;
mod engine;
mod error;
mod features;
mod metrics;
mod model;
mod routes;
mod schema;
mod types;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::EngineConfig;
use engine::DiagnosisEngine;
use metrics::Metrics;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diagnosis_engine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    info!("Loaded configuration: {:?}", config);

    // Artifacts are loaded once; a mismatched set refuses to start.
    let engine = DiagnosisEngine::load(&config).with_context(|| {
        format!(
            "failed to load artifacts (features: {}, model: {}, labels: {})",
            config.features_path, config.model_path, config.labels_path
        )
    })?;

    let state = AppState {
        engine: Arc::new(engine),
        metrics: Arc::new(Metrics::new()),
        config: config.clone(),
    };
    let app = routes::router(state);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.bind_addr))?;
    info!("Starting diagnosis engine on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, starting graceful shutdown");
}
