use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use lib_dashboard::retrieve::ky_http::ApiClient;
use lib_dashboard::sources::http::HttpDataSource;
use lib_dashboard::sources::mock::MockDataSource;
use lib_dashboard::{Dashboard, DataSource};

mod dashboard_logic;
use dashboard_logic::config::{self, SourceKind};
use dashboard_logic::{logger, monitor};

// Retries and timeouts are applied by the dashboard, not by the HTTP client.
fn build_source(kind: SourceKind) -> Result<Arc<dyn DataSource>> {
    match kind {
        SourceKind::Mock => Ok(Arc::new(MockDataSource::new())),
        SourceKind::Http {
            base_url,
            auth_token,
        } => {
            let client = ApiClient::new(&base_url, auth_token)
                .with_context(|| format!("Invalid base URL '{}'", base_url))?;
            Ok(Arc::new(HttpDataSource::new(client)))
        }
    }
}

async fn wait_for_shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config();
    logger::setup_logging(&config.log_dir(), config.log_level())?;

    let options = config.dashboard_options()?;
    let source = build_source(config.source_kind()?)?;
    let dashboard = Arc::new(Dashboard::with_source(source, options));

    let _state_log = dashboard
        .state()
        .subscribe(|snapshot| log::info!("State: {}", monitor::describe(snapshot)));
    let _loading_log = dashboard
        .loading()
        .subscribe(|loading| log::debug!("Fetching: {}", monitor::describe_loading(loading)));

    let shutdown = CancellationToken::new();
    let runner = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        let shutdown = shutdown.clone();
        async move { dashboard.run(shutdown).await }
    });

    wait_for_shutdown_signal().await;
    shutdown.cancel();
    runner.await.context("Refresh loop panicked")?;

    let report = dashboard.performance_metrics();
    println!("{}", serde_json::to_string_pretty(&report)?);

    log::info!("Shutdown complete.");
    Ok(())
}
