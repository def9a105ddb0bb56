//! IR Control Bridge
//!
//! A backend-agnostic IR/RF remote command bridge.

use ir_control_bridge::{api, config, controllers, devices, remote, sink, updates};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ir_control_bridge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting IR Control Bridge v{} ({})",
        env!("ICB_VERSION"),
        env!("ICB_GIT_SHA")
    );

    // Load configuration
    let config = config::load_config()?;
    tracing::info!("Configuration loaded, port: {}", config.port);

    // Dispatch sink towards the automation host
    let hass = config
        .hass
        .as_ref()
        .context("hass section is not configured")?;
    let dispatch: Arc<dyn sink::DispatchSink> =
        Arc::new(sink::HassSink::new(&hass.base_url, hass.token.clone())?);
    tracing::info!("Dispatch sink initialized for {}", hass.base_url);

    // Device-definition store
    let data_dir = config::get_data_dir();
    let store = Arc::new(devices::DeviceStore::new(
        data_dir.clone(),
        config.codes_url.clone(),
    ));
    tracing::info!("Device store initialized at {}", data_dir.display());

    // Controller registry, built once and immutable afterwards
    let registry = controllers::ControllerRegistry::new();

    // Wire configured remotes; a broken remote is skipped, not fatal
    let mut remotes: HashMap<String, Arc<remote::Remote>> = HashMap::new();
    for remote_config in &config.remotes {
        let device = match store.load("remote", remote_config.device_code).await {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!(
                    "Skipping remote {}: device file {} unavailable: {}",
                    remote_config.name,
                    remote_config.device_code,
                    e
                );
                continue;
            }
        };
        match remote::Remote::build(remote_config, device, &registry, dispatch.clone()) {
            Ok(built) => {
                tracing::info!(
                    "Remote {} ready ({} via {})",
                    remote_config.name,
                    remote_config.device_code,
                    built.kind
                );
                remotes.insert(remote_config.name.clone(), Arc::new(built));
            }
            Err(e) => {
                tracing::warn!("Skipping remote {}: {}", remote_config.name, e);
            }
        }
    }

    // Update checker
    let update_checker = Arc::new(updates::UpdateChecker::new(config.updates.branch.clone()));
    if config.updates.check {
        update_checker
            .clone()
            .start_polling(config.updates.interval_minutes);
        tracing::info!("Update checking enabled ({} branch)", config.updates.branch);
    }

    // Build application state
    let state = api::AppState::new(remotes, store, update_checker.clone());

    // Build API routes
    let app = Router::new()
        // Health check
        .route("/status", get(api::status_handler))
        // Remote routes
        .route("/remotes", get(api::list_remotes_handler))
        .route("/remotes/{name}", get(api::get_remote_handler))
        .route("/remotes/{name}/send", post(api::send_handler))
        .route("/remotes/{name}/learn", post(api::learn_handler))
        .route(
            "/remotes/{name}/commands/{command}",
            delete(api::delete_command_handler),
        )
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Shutting down...");
    update_checker.stop();
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
