//! Health check endpoint, optionally bound on a separate listener.

use std::net::SocketAddr;

use axum::{Router, response::IntoResponse, routing::get};
use config::{HealthConfig, TlsServerConfig};

/// `200 OK` with no body. Liveness only; doesn't probe upstream providers.
pub async fn health() -> impl IntoResponse {
    http::StatusCode::OK
}

/// Serve the health endpoint on its own listener, independent of the main app router.
///
/// Used when `server.health.listen` is set to expose health checks on a port that isn't
/// behind whatever load balancer fronts the main dialect endpoints.
pub async fn bind_health_endpoint(listen: SocketAddr, tls: Option<TlsServerConfig>, config: HealthConfig) {
    let router = Router::new().route(&config.path, get(health));

    let result = match tls {
        Some(tls) => {
            let rustls_config = match axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.certificate, &tls.key).await {
                Ok(config) => config,
                Err(err) => {
                    log::error!("Failed to load TLS certificate for health endpoint: {err}");
                    return;
                }
            };

            axum_server::bind_rustls(listen, rustls_config).serve(router.into_make_service()).await
        }
        None => axum_server::bind(listen).serve(router.into_make_service()).await,
    };

    if let Err(err) = result {
        log::error!("Health endpoint on {listen} terminated: {err}");
    }
}
