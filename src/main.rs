use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasktrack::app::router;
use tasktrack::config::Args;
use tasktrack::rate_limit::AdmissionController;
use tasktrack::state::AppState;
use tasktrack::store::InMemoryTaskStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasktrack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let rate_limit = args.rate_limit_config()?;
    let pipeline = args.filter_pipeline()?;

    let admission = Arc::new(AdmissionController::start(rate_limit, args.sweep_interval()));

    let state = Arc::new(AppState {
        store: Arc::new(InMemoryTaskStore::new()),
        admission: Arc::clone(&admission),
        pipeline,
        filter_deadline: args.filter_deadline(),
        trust_forwarded_for: args.trust_forwarded_for,
    });

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "tasktrack listening");
    tracing::info!(
        limit = rate_limit.limit(),
        window_secs = args.rate_window,
        sweep_secs = args.sweep_interval,
        "rate limit configured"
    );
    tracing::info!(workers = pipeline.workers(), "filter pipeline configured");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(sweeper) = admission.stop() {
        if let Err(err) = sweeper.await {
            tracing::warn!(%err, "rate limit sweeper ended abnormally");
        }
    }
    tracing::info!("shutdown complete");
    Ok(())
}

// Ctrl+C everywhere, SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
