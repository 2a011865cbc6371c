use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use barbershop_api::config::{LogFormat, ServerConfig};
use barbershop_api::router::build_app_router;
use barbershop_api::state::AppState;
use barbershop_pipeline::{JobDispatcher, JobRegistry, JobRunner};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "barbershop_api=debug,barbershop_pipeline=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        data_root = %config.data_root.display(),
        "Loaded server configuration",
    );

    std::fs::create_dir_all(&config.data_root).expect("Failed to create DATA_ROOT");

    // --- Job pipeline ---
    let tool = config.synthesis_tool();
    tracing::info!(
        program = %tool.program,
        args = ?tool.base_args,
        workdir = %tool.working_dir.display(),
        "Synthesis tool configured",
    );

    let job_registry = Arc::new(JobRegistry::new());
    let runner = Arc::new(JobRunner::new(tool));
    let (dispatcher, submitter) = JobDispatcher::new(
        runner,
        Arc::clone(&job_registry),
        config.dispatcher_config(),
    );

    let dispatcher_cancel = CancellationToken::new();
    let dispatcher_handle = tokio::spawn(dispatcher.run(dispatcher_cancel.clone()));

    // --- App state ---
    let config = Arc::new(config);
    let state = AppState::new(Arc::clone(&config), job_registry, submitter);

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    dispatcher_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, dispatcher_handle).await.is_err() {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "In-flight jobs did not finish in time, abandoning them",
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
