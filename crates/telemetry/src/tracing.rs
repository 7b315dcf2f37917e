//! Span collection using `fastrace`, reported to the process log instead of an OTLP collector.

use std::borrow::Cow;
use std::time::Duration;

use fastrace::Span;
use fastrace::collector::{Config as CollectorConfig, Reporter};
use fastrace::prelude::{SpanContext, SpanRecord};

/// Guard that keeps the span reporter alive and flushes on drop.
pub struct TracingGuard;

impl TracingGuard {
    /// Force flush all pending spans immediately. Useful in tests.
    pub fn force_flush(&self) -> anyhow::Result<()> {
        fastrace::flush();
        Ok(())
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        fastrace::flush();
    }
}

/// Report every sampled span as a single `trace` log line.
struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, spans: Vec<SpanRecord>) {
        for span in spans {
            log::trace!(
                "span {name} dur={dur_us}us parent={parent}",
                name = span.name,
                dur_us = span.duration_ns / 1000,
                parent = span.parent_id,
            );
        }
    }
}

/// Initialize span collection at the given sampling ratio, in `[0.0, 1.0]`.
///
/// A ratio of `0.0` disables collection entirely (spans are still created but dropped as
/// soon as `force_flush` would otherwise report them, at effectively no cost).
pub fn init_tracing(sampling_ratio: f64) -> anyhow::Result<TracingGuard> {
    let collector_config = CollectorConfig::default().report_interval(Duration::from_secs(1));

    if sampling_ratio > 0.0 {
        fastrace::set_reporter(LogReporter, collector_config);
    }

    Ok(TracingGuard)
}

/// Creates a child span if the parent is sampled, otherwise returns a no-op span.
///
/// - If there's an active local parent (direct call), creates a child span.
/// - If a trace context was propagated from elsewhere (e.g. an async task boundary),
///   creates a root span in the same trace.
/// - Otherwise returns a no-op span that won't be reported.
pub fn create_child_span(name: &'static str, trace_context: Option<SpanContext>) -> Span {
    if SpanContext::current_local_parent().is_some() {
        Span::enter_with_local_parent(name)
    } else if let Some(context) = trace_context {
        Span::root(name, context)
    } else {
        Span::noop()
    }
}

/// Creates a child span only if there's an active local parent.
pub fn create_child_span_if_sampled(name: impl Into<Cow<'static, str>>) -> Span {
    if SpanContext::current_local_parent().is_some() {
        Span::enter_with_local_parent(name)
    } else {
        Span::noop()
    }
}
