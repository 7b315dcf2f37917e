use std::time::Duration;

use axum::http;
use reqwest::Client;

pub(super) fn default_http_client_builder(mut headers: http::HeaderMap) -> reqwest::ClientBuilder {
    headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(Duration::from_secs(60))
        // Hyper's connection pool only exposes two knobs: max idle connections per host and
        // idle connection timeout. There's no TTL on connections themselves to force a refresh
        // when DNS records change, but a short idle timeout has proven enough to pick up DNS
        // changes in practice even under steadily ramping traffic.
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
}
