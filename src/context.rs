//! Execution-scoped carrier for the active span.
use crate::trace::SpanContext;

/// An immutable execution context holding zero or one active span reference.
///
/// Contexts are plain values passed explicitly by reference; there is no
/// ambient (thread-local or global) context lookup. Starting a span under a
/// context yields a new context whose active span is the child. Ending a span
/// does not pop anything — the caller simply discards contexts it no longer
/// needs.
///
/// # Examples
///
/// ```
/// use tracepipe::{trace::TracerProvider, Context};
///
/// let provider = TracerProvider::builder().build();
/// let tracer = provider.tracer("example/context");
///
/// let root = Context::new();
/// let (cx, mut parent) = tracer.start(&root, "parent");
/// let (_, mut child) = tracer.start(&cx, "child");
/// child.end();
/// parent.end();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    span_context: Option<SpanContext>,
}

impl Context {
    /// An empty root context.
    pub fn new() -> Self {
        Context::default()
    }

    /// Returns a new context whose active span is `span_context`.
    pub fn with_span_context(&self, span_context: SpanContext) -> Self {
        Context {
            span_context: Some(span_context),
        }
    }

    /// The active span's context, if any.
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span_context.as_ref()
    }

    /// Returns `true` if a span is active in this context.
    pub fn has_active_span(&self) -> bool {
        self.span_context.is_some()
    }
}
