//! Gateway server library.
//!
//! Provides a reusable `serve` function, used by both the `cli` binary and integration tests.

#![deny(missing_docs)]

mod error;
mod health;
mod logger;
mod tracing;

use std::net::SocketAddr;

use anyhow::anyhow;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use config::Config;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

pub use error::Error;
use crate::tracing::TracingLayer;

/// Configuration for serving the gateway.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to.
    pub listen_address: SocketAddr,
    /// The deserialized TOML configuration.
    pub config: Config,
    /// Cancellation token for graceful shutdown.
    pub shutdown_signal: CancellationToken,
    /// Log filter string (e.g. `"info"` or `"gateway=debug,config=debug"`).
    pub log_filter: String,
    /// The version string to log on startup.
    pub version: String,
    /// Optional oneshot sender to send back the bound address, useful when port 0 was given.
    pub bound_addr_sender: Option<tokio::sync::oneshot::Sender<SocketAddr>>,
}

/// Starts and runs the gateway server with the provided configuration.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter,
        version,
        bound_addr_sender,
    }: ServeConfig,
) -> anyhow::Result<()> {
    logger::init(&log_filter);
    let _tracing_guard = telemetry::init_tracing(1.0);

    log::info!("gateway {version}");

    let cors = if config.server.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    let mut app = Router::new();
    let mut gateway_exposed = false;

    if config.llm.enabled && config.llm.has_providers() {
        let facade = gateway::build(&config).await.map_err(|err| {
            log::error!("Failed to initialize gateway router: {err:?}");
            anyhow!("Failed to initialize gateway router: {err}")
        })?;

        app = app.merge(facade.into_router().layer(
            tower::ServiceBuilder::new().layer(cors.clone()).layer(TracingLayer::new(1.0)),
        ));
        gateway_exposed = true;
    } else {
        log::warn!("LLM gateway is enabled but no providers are configured - dialect endpoints will not be exposed");
    }

    if config.server.health.enabled {
        if let Some(listen) = config.server.health.listen {
            tokio::spawn(health::bind_health_endpoint(
                listen,
                config.server.tls.clone(),
                config.server.health.clone(),
            ));
        } else {
            let health_router = Router::new()
                .route(&config.server.health.path, axum::routing::get(health::health))
                .layer(cors.clone());

            app = app.merge(health_router);
        }
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    if let Some(sender) = bound_addr_sender {
        sender
            .send(listener.local_addr()?)
            .expect("Failed to send back bound address.");
    }

    if !gateway_exposed {
        log::warn!("Server starting with no functional endpoints. Configure at least one LLM provider.");
    }

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            log::info!("Gateway listening on https://{listen_address}");

            let server =
                axum_server::from_tcp_rustls(listener.into_std()?, rustls_config).serve(app.into_make_service_with_connect_info::<SocketAddr>());

            tokio::select! {
                result = server => {
                    result.map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
                }
                _ = shutdown_signal.cancelled() => {
                    log::info!("Received shutdown signal, shutting down gracefully...");
                }
            }
        }
        None => {
            log::info!("Gateway listening on http://{listen_address}");

            tokio::select! {
                result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
                    result.map_err(|e| anyhow!("Failed to start HTTP server: {}", e))?;
                }
                _ = shutdown_signal.cancelled() => {
                    log::info!("Received shutdown signal, shutting down gracefully...");
                }
            }
        }
    }

    Ok(())
}
