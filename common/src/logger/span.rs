use tracing::{Level, Span};

use super::TraceId;

/// Root span for one command / request, carrying its trace id.
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::span!(Level::INFO, "root", name = %name, trace_id = %trace_id)
}

/// Child span; the trace id is inherited from the enclosing root span.
pub fn child_span(name: &'static str) -> Span {
    tracing::span!(Level::INFO, "child", name = %name)
}
