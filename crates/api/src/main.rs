use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_api::background;
use folio_api::config::ServerConfig;
use folio_api::router::build_app_router;
use folio_api::state::AppState;
use folio_store::FsContentSource;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "folio_api=debug,folio_store=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        content_root = %config.content_root.display(),
        "Loaded server configuration"
    );

    // --- Engine ---
    let source = Arc::new(FsContentSource::new(config.content_root.clone()));
    let state = AppState::new(config.clone(), source);

    // Spawn the activity journal (records every published event).
    let journal_handle = {
        let journal = Arc::clone(&state.journal);
        let receiver = state.event_bus.subscribe();
        tokio::spawn(async move { journal.run(receiver).await })
    };
    tracing::info!("Event bus and activity journal started");

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let mut job_handles = Vec::new();

    if config.session_sweep_interval_secs > 0 {
        job_handles.push(tokio::spawn(background::session_sweeper::run(
            Arc::clone(&state.sessions),
            Arc::clone(&state.event_bus),
            Duration::from_secs(config.session_sweep_interval_secs),
            Duration::from_secs(config.session_stale_timeout_secs),
            cancel.clone(),
        )));
    } else {
        tracing::warn!("SESSION_SWEEP_INTERVAL_SECS is 0, idle sessions will not expire");
    }

    if config.autosave_interval_secs > 0 {
        job_handles.push(tokio::spawn(background::autosave::run(
            Arc::clone(&state.sessions),
            Arc::clone(&state.event_bus),
            Duration::from_secs(config.autosave_interval_secs),
            cancel.clone(),
        )));
    } else {
        tracing::info!("Session autosave disabled");
    }

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

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

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    cancel.cancel();
    for handle in job_handles {
        if tokio::time::timeout(shutdown_timeout, handle).await.is_err() {
            tracing::warn!("Background job did not stop within the shutdown timeout");
        }
    }
    tracing::info!("Background jobs stopped");

    let open_sessions = state.sessions.active_count().await;
    if open_sessions > 0 {
        tracing::warn!(open_sessions, "Shutting down with open collaborative sessions");
    }

    // Dropping the last bus handle closes the channel and stops the journal.
    drop(state);
    let _ = tokio::time::timeout(shutdown_timeout, journal_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
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
