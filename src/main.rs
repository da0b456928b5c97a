use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use feesd::config::AppConfig;
use feesd::pool::Pool;
use feesd::report::ChromiumRenderer;
use feesd::{build_router, logging, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "feesd exited with error");
        eprintln!("feesd: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    logging::init_tracing(cfg.log_format)?;

    let pool = Pool::open(&cfg.store)
        .await
        .with_context(|| format!("open store at {}", cfg.store.path.display()))?;
    let renderer = ChromiumRenderer::new(&cfg.render);
    info!(
        browser = %cfg.render.browser_bin.display(),
        timeout_ms = cfg.render.timeout.as_millis() as u64,
        "report renderer configured"
    );

    let app = build_router(AppState::new(pool.clone(), Arc::new(renderer)));
    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    info!(addr = %cfg.bind, version = env!("CARGO_PKG_VERSION"), "feesd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("http server")?;

    pool.close();
    info!("feesd stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}
