//! Minimal `fastrace`-based request tracing for the gateway.
//!
//! The teacher's telemetry crate drives a full OpenTelemetry metrics/traces/logs export
//! pipeline; that's disproportionate to this gateway's scope (no metrics surface is part of
//! the contract), so this crate keeps only the one piece every request handler needs: a root
//! span per inbound request, reported to the process log rather than an OTLP collector.

pub mod tracing;

pub use fastrace::Span;
pub use tracing::{TracingGuard, create_child_span, create_child_span_if_sampled, init_tracing};
