//! TrainPulse - train punctuality device
//!
//! Polls the rail data API and presents the next departure's punctuality
//! as a smart-home device mode until interrupted.

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info};
use trainpulse_infra::config;
use trainpulse_lib::utils::logging::{error_label, init_tracing, LogFormat};
use trainpulse_lib::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read .env before the subscriber so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();
    init_tracing(LogFormat::from_env())?;
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => debug!(error = %err, "no .env loaded"),
    }

    let app_config = config::load().context("failed to load configuration")?;
    let context = AppContext::new(app_config).context("failed to initialise TrainPulse")?;

    if let Err(err) = context.start().await {
        error!(kind = error_label(&err), error = %err, "failed to start TrainPulse");
        return Err(err.into());
    }

    wait_for_shutdown(context.config.runtime.exit_after_secs.map(Duration::from_secs)).await;

    context.shutdown().await.context("shutdown failed")?;
    info!("TrainPulse stopped");
    Ok(())
}

/// Resolve on Ctrl-C, SIGTERM, or after `exit_after` when set
async fn wait_for_shutdown(exit_after: Option<Duration>) {
    let exit_timer = async {
        match exit_after {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("interrupt received, shutting down"),
            Err(err) => error!(error = %err, "failed to listen for Ctrl-C, shutting down"),
        },
        () = terminate_signal() => info!("SIGTERM received, shutting down"),
        () = exit_timer => info!("exit timer elapsed, shutting down"),
    }
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            error!(error = %err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
