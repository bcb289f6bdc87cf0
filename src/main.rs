//! StatusTrackr web service: HTTP API plus the background monitoring scheduler.

use statustrackr::infra::{logging, mailer};
use statustrackr::{storage, transport, AppConfig, MonitoringService};
use std::sync::Arc;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
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
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Arc::new(AppConfig::from_env()?);
    logging::init_logger(config.debug);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        deployment = config.deployment.as_str(),
        "starting StatusTrackr"
    );

    let store = storage::store_from_config(&config).await?;
    let notifier = mailer::notifier_from_config(&config)?;
    let monitoring = Arc::new(MonitoringService::new(store.clone(), notifier, &config));
    monitoring.start().await;

    let app_state = transport::http::AppState {
        store,
        monitoring: monitoring.clone(),
        config: config.clone(),
    };
    let app = transport::http::build_app(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    tracing::info!("API docs at http://{}/docs", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitoring.stop().await;
    tracing::info!("graceful shutdown complete");
    Ok(())
}
