//! HTTP tracing middleware.
//!
//! Creates one root span per inbound request, following OpenTelemetry semantic conventions
//! for attribute names even though spans are reported to the log rather than an OTLP backend.

use axum::{body::Body, extract::MatchedPath};
use context::ClientIdentity;
use fastrace::future::FutureExt;
use fastrace::{
    Span,
    collector::{SpanId, TraceId},
    prelude::{LocalSpan, SpanContext},
};
use http::{HeaderMap, Request, Response};
use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::Layer;

/// Layer for HTTP request tracing.
#[derive(Clone)]
pub struct TracingLayer {
    sampling_ratio: f64,
}

impl TracingLayer {
    /// `sampling_ratio` is clamped to `[0.0, 1.0]`; `0.0` disables span creation entirely.
    pub fn new(sampling_ratio: f64) -> Self {
        Self {
            sampling_ratio: sampling_ratio.clamp(0.0, 1.0),
        }
    }
}

impl<Service> Layer<Service> for TracingLayer
where
    Service: Send + Clone,
{
    type Service = TracingService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        TracingService {
            next,
            sampling_ratio: self.sampling_ratio,
        }
    }
}

/// Service that creates traces for HTTP requests.
#[derive(Clone)]
pub struct TracingService<Service> {
    next: Service,
    sampling_ratio: f64,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for TracingService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|matched_path| matched_path.as_str().to_owned())
            .unwrap_or_else(|| req.uri().path().to_owned());

        let method = req.method().to_string();
        let uri = req.uri().to_string();
        let scheme = req.uri().scheme_str().unwrap_or("http").to_string();

        let host = req
            .headers()
            .get("host")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let (span_context, parent_sampled) = extract_trace_context(req.headers());
        let span_name = format!("{method} {path}");
        let should_sample = should_sample_trace(self.sampling_ratio, parent_sampled);

        let parent = if should_sample && parent_sampled == Some(false) {
            if let Some(original_context) = span_context {
                // Parent declined to sample; keep its trace ID but mint a fresh span ID so this
                // branch is still exported as part of the same trace.
                SpanContext::new(original_context.trace_id, SpanId(rand::random::<u64>()))
            } else {
                SpanContext::random()
            }
        } else {
            span_context.unwrap_or_else(SpanContext::random)
        };

        let mut next = self.next.clone();

        if !should_sample {
            let fut = async move { next.call(req).await };
            return Box::pin(fut);
        }

        let root = Span::root(span_name, parent);

        // Some downstream layers spawn tasks that lose the thread-local span context; stash it
        // in request extensions so they can still attach as (sibling, not child) spans.
        req.extensions_mut().insert(parent);

        root.add_property(|| ("http.request.method", method.clone()));
        root.add_property(|| ("http.route", path.clone()));
        root.add_property(|| ("url.full", uri.clone()));
        root.add_property(|| ("url.scheme", scheme.clone()));

        if let Some(host) = host {
            root.add_property(|| ("server.address", host));
        }

        if let Some(client_identity) = req.extensions().get::<ClientIdentity>() {
            root.add_property(|| ("client.id", client_identity.client_id.clone()));

            if let Some(ref group) = client_identity.group {
                root.add_property(|| ("client.group", group.clone()));
            }
        }

        let fut = async move {
            let response = next.call(req).await?;

            let status = response.status();
            LocalSpan::add_property(|| ("http.response.status_code", status.as_u16().to_string()));

            if status.is_client_error() || status.is_server_error() {
                LocalSpan::add_property(|| ("error", "true"));
            }

            Ok(response)
        };

        Box::pin(fut.in_span(root))
    }
}

/// Extract trace context and sampling decision from HTTP headers.
fn extract_trace_context(headers: &HeaderMap) -> (Option<SpanContext>, Option<bool>) {
    if let Some(traceparent) = headers.get("traceparent")
        && let Ok(traceparent_str) = traceparent.to_str()
    {
        let (context, sampled) = parse_traceparent_with_sampling(traceparent_str);
        if let Some(ctx) = context {
            return (Some(ctx), sampled);
        }
    }

    if let Some(xray_header) = headers.get("x-amzn-trace-id")
        && let Ok(xray_str) = xray_header.to_str()
    {
        let (context, sampled) = parse_xray_trace_id_with_sampling(xray_str);
        if let Some(ctx) = context {
            return (Some(ctx), sampled);
        }
    }

    (None, None)
}

/// Parse a W3C `traceparent` header (`version-trace_id-parent_id-trace_flags`).
fn parse_traceparent_with_sampling(traceparent: &str) -> (Option<SpanContext>, Option<bool>) {
    let parts: Vec<&str> = traceparent.split('-').collect();
    if parts.len() == 4
        && let Ok(flags) = u8::from_str_radix(parts[3], 16)
    {
        let sampled = (flags & 0x01) == 0x01;
        let context = SpanContext::decode_w3c_traceparent(traceparent);
        return (context, Some(sampled));
    }

    (SpanContext::decode_w3c_traceparent(traceparent), None)
}

/// Parse an AWS X-Ray `X-Amzn-Trace-Id` header.
fn parse_xray_trace_id_with_sampling(xray_str: &str) -> (Option<SpanContext>, Option<bool>) {
    let mut trace_id = None;
    let mut parent_id = None;
    let mut sampled = None;

    for part in xray_str.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            match key {
                "Root" => {
                    let parts: Vec<&str> = value.split('-').collect();
                    if parts.len() == 3 && parts[0] == "1" {
                        let trace_id_str = format!("{}{}", parts[1], parts[2]);
                        if trace_id_str.len() == 32
                            && let Ok(id) = u128::from_str_radix(&trace_id_str, 16)
                        {
                            trace_id = Some(id);
                        }
                    }
                }
                "Parent" => {
                    if let Ok(id) = u64::from_str_radix(value, 16) {
                        parent_id = Some(id);
                    }
                }
                "Sampled" => sampled = Some(value == "1"),
                _ => {}
            }
        }
    }

    let context = match (trace_id, parent_id) {
        (Some(tid), Some(pid)) => Some(SpanContext::new(TraceId(tid), SpanId(pid))),
        _ => None,
    };

    (context, sampled)
}

/// Ratio-based sampling, respecting a propagated parent decision when present.
fn should_sample_trace(sampling_ratio: f64, parent_sampled: Option<bool>) -> bool {
    if let Some(sampled) = parent_sampled {
        return sampled;
    }

    if sampling_ratio <= 0.0 {
        return false;
    }

    if sampling_ratio >= 1.0 {
        return true;
    }

    use rand::Rng;
    rand::rng().random_bool(sampling_ratio)
}
