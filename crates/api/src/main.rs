use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use texgen_api::config::ServerConfig;
use texgen_api::notifications::NotificationRouter;
use texgen_api::router::build_app_router;
use texgen_api::state::AppState;
use texgen_api::ws;
use texgen_comfyui::{ComfyUIApi, WebhookTarget, WorkflowTemplate};
use texgen_events::{EventBus, Notifier};
use texgen_pipeline::{ComfyUISubmitter, PgJobRecords, Sequencer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "texgen_api=debug,texgen_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        comfyui = %config.comfyui.api_url,
        lane_mode = ?config.queue.lane_mode,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = texgen_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    texgen_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    texgen_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Render backend ---
    let comfyui = Arc::new(ComfyUIApi::new(config.comfyui.api_url.clone()));
    let template = WorkflowTemplate::load(&config.comfyui.workflow_path)
        .await
        .with_context(|| {
            format!(
                "Failed to load workflow template from {}",
                config.comfyui.workflow_path
            )
        })?;
    let webhook = WebhookTarget {
        url: config.comfyui.webhook_url.clone(),
        secret: config.comfyui.webhook_secret.clone(),
    };
    if webhook.secret.is_none() {
        tracing::warn!("COMFYUI_WEBHOOK_SECRET unset, webhook calls are not verified");
    }

    // --- Events ---
    let event_bus = Arc::new(EventBus::default());
    let notifier = Arc::new(Notifier::new(Arc::clone(&event_bus)));

    // --- Sequencer ---
    let shutdown = CancellationToken::new();
    let submitter = Arc::new(ComfyUISubmitter::new(
        pool.clone(),
        Arc::clone(&comfyui),
        template,
        webhook,
    ));
    let records = Arc::new(PgJobRecords::new(pool.clone()));
    let sequencer = Arc::new(Sequencer::new(
        config.queue.clone(),
        submitter,
        records,
        notifier,
    ));
    let lane_handles = sequencer.spawn(shutdown.clone());
    tracing::info!("Sequencer lanes started");

    // --- WebSocket push ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager), shutdown.clone());
    let router_handle = tokio::spawn(
        NotificationRouter::new(Arc::clone(&ws_manager)).run(event_bus.subscribe()),
    );

    // --- App ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        sequencer: Arc::clone(&sequencer),
        comfyui,
        event_bus: Arc::clone(&event_bus),
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let budget = Duration::from_secs(config.shutdown_timeout_secs);

    // Lanes stop polling; an awaited job's row stays `processing`.
    shutdown.cancel();
    for handle in lane_handles {
        if tokio::time::timeout(budget, handle).await.is_err() {
            tracing::warn!("Sequencer lane did not stop in time");
        }
    }
    tracing::info!(queued = sequencer.store().count(), "Sequencer stopped");

    // Dropping the last bus handles closes the channel and ends the router.
    drop(sequencer);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;

    ws_manager.shutdown_all().await;
    let _ = heartbeat_handle.await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
