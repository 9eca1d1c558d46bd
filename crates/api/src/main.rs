use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_api::config::AppConfig;
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_api::ws;
use courier_dispatch::{
    AdmissionService, PgStore, Scheduler, WebhookProvider, WorkerPool,
};
use courier_events::StatusBus;
use courier_queue::{PriorityQueue, RateLimiter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_api=debug,courier_dispatch=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = courier_db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    courier_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    courier_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Shared pipeline infrastructure ---
    let queue = Arc::new(PriorityQueue::new());
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_per_channel));
    let status_bus = Arc::new(StatusBus::default());
    let store = Arc::new(PgStore::new(pool.clone()));

    let admission = Arc::new(AdmissionService::new(
        store.clone(),
        store.clone(),
        Arc::clone(&queue),
        status_bus.clone(),
    ));

    // --- WebSocket manager + heartbeat ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Root cancellation signal for background tasks ---
    let cancel = CancellationToken::new();

    // Spawn the status dispatcher (routes bus updates to WebSocket clients).
    let dispatcher = ws::StatusDispatcher::new(Arc::clone(&ws_manager));
    let dispatcher_handle = tokio::spawn(dispatcher.run(status_bus.subscribe(), cancel.clone()));

    // Spawn the scheduler (promotes due deferred notifications).
    let scheduler = Scheduler::new(
        store.clone(),
        Arc::clone(&queue),
        config.scheduler_interval(),
        config.scheduler_batch_size,
    );
    let scheduler_cancel = cancel.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
    });

    // --- Outbound provider + worker pool ---
    let provider = Arc::new(WebhookProvider::new(
        &config.webhook_url,
        config.webhook_timeout(),
    ));
    let worker_pool = WorkerPool::start(
        store.clone(),
        Arc::clone(&queue),
        Arc::clone(&limiter),
        provider,
        status_bus.clone(),
        config.worker_pool_config(),
        cancel.child_token(),
    );

    tracing::info!("Pipeline services started (dispatcher, scheduler, worker pool)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        admission,
        queue,
        limiter,
        status_bus,
        ws_manager: Arc::clone(&ws_manager),
    };

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

    // No new work is accepted; let in-flight deliveries finish.
    cancel.cancel();

    let _ = tokio::time::timeout(Duration::from_secs(5), scheduler_handle).await;
    tracing::info!("Scheduler stopped");

    // Waits for all workers with a 30-second ceiling.
    worker_pool.stop().await;

    let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;
    tracing::info!("Status dispatcher stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
