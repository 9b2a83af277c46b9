// crates/server/src/main.rs
//! Stemtool server binary.
//!
//! Prepares the data root, starts the cleanup sweeper, then serves the API
//! until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stemtool_core::{DemucsAdapter, JobRunner, YtDlpAdapter};
use stemtool_server::config::Config;
use stemtool_server::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let _log_guard = stemtool_observability::init(&config.logging())?;

    let runner_config = config.runner();
    let runner = Arc::new(JobRunner::new(
        runner_config.clone(),
        Arc::new(YtDlpAdapter::new(config.ytdlp())),
        Arc::new(DemucsAdapter::new(config.demucs())),
    ));
    runner.layout().ensure_root().await.with_context(|| {
        format!(
            "failed to create data directory {}",
            runner.layout().root().display()
        )
    })?;

    let sweeper = runner.sweeper().spawn();

    let app = create_app(AppState::new(Arc::clone(&runner)), config.static_dir());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        data_dir = %runner.layout().root().display(),
        job_ttl_secs = runner_config.job_ttl.as_secs(),
        sweep_interval_secs = runner_config.sweep_interval.as_secs(),
        max_concurrent_jobs = ?runner_config.max_concurrent_jobs,
        version = env!("CARGO_PKG_VERSION"),
        "stemtool listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
