//! # Tracer
//!
//! The `Tracer` is the factory for [`Span`]s. It carries the instrumentation
//! scope identifying the library producing spans and a handle to the
//! [`TracerProvider`] it was created from; in-process parenting happens by
//! passing [`Context`] values explicitly, not through ambient lookup.
use crate::common::InstrumentationScope;
use crate::context::Context;
use crate::trace::{
    provider::TracerProvider,
    span::{Span, SpanData, Status},
    SpanContext, SpanId,
};
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

/// `Tracer` implementation to create and manage spans.
#[derive(Clone)]
pub struct Tracer {
    scope: InstrumentationScope,
    provider: TracerProvider,
}

impl fmt::Debug for Tracer {
    /// Formats the `Tracer` using the given formatter.
    /// Omitting `provider` here is necessary to avoid cycles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("name", &self.scope.name())
            .field("version", &self.scope.version())
            .finish()
    }
}

impl Tracer {
    /// Create a new tracer (used internally by `TracerProvider`s).
    pub(crate) fn new(scope: InstrumentationScope, provider: TracerProvider) -> Self {
        Tracer { scope, provider }
    }

    /// TracerProvider associated with this tracer.
    pub(crate) fn provider(&self) -> &TracerProvider {
        &self.provider
    }

    /// Instrumentation scope of this tracer.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Starts a new span as a child of the active span in `cx`, or as a root
    /// span if `cx` carries none.
    ///
    /// Records the start time and returns the mutable span handle together
    /// with a new child context whose active span is the started one. The
    /// parent context is not modified; ending the span does not pop it —
    /// callers discard contexts they no longer need.
    ///
    /// After the owning provider has shut down, spans can still be started
    /// but are non-recording and never exported.
    pub fn start(&self, cx: &Context, name: impl Into<Cow<'static, str>>) -> (Context, Span) {
        if self.provider.is_shutdown() {
            let span = Span::new(SpanContext::empty(), None, self.clone());
            return (cx.clone(), span);
        }

        let id_generator = self.provider.id_generator();
        let (trace_id, parent_span_id) = match cx.span_context() {
            Some(parent) => (parent.trace_id(), parent.span_id()),
            None => (id_generator.new_trace_id(), SpanId::INVALID),
        };
        let span_context = SpanContext::new(trace_id, id_generator.new_span_id());

        let start_time = SystemTime::now();
        let data = SpanData {
            span_context,
            parent_span_id,
            name: name.into(),
            start_time,
            end_time: start_time,
            attributes: Vec::new(),
            events: Vec::new(),
            status: Status::Unset,
            instrumentation_scope: self.scope.clone(),
        };

        let child_cx = cx.with_span_context(span_context);
        (child_cx, Span::new(span_context, Some(data), self.clone()))
    }

    /// Runs `f` inside a new span, ending the span when `f` returns.
    ///
    /// The span's drop guard guarantees the end fires exactly once even if
    /// `f` unwinds.
    pub fn in_span<T, F>(&self, cx: &Context, name: impl Into<Cow<'static, str>>, f: F) -> T
    where
        F: FnOnce(&Context) -> T,
    {
        let (cx, mut span) = self.start(cx, name);
        let result = f(&cx);
        span.end();
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::trace::{InMemorySpanExporter, SpanId, TracerProvider};
    use crate::Context;

    #[test]
    fn child_spans_inherit_trace_and_parent() {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("test/parenting");

        let root_cx = Context::new();
        let (parent_cx, mut parent) = tracer.start(&root_cx, "parent");
        let (_child_cx, mut child) = tracer.start(&parent_cx, "child");
        child.end();
        parent.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 2);
        let (child, parent) = (&spans[0], &spans[1]);
        assert_eq!(child.name, "child");
        assert_eq!(parent.parent_span_id, SpanId::INVALID);
        assert_eq!(child.parent_span_id, parent.span_context.span_id());
        assert_eq!(
            child.span_context.trace_id(),
            parent.span_context.trace_id()
        );
    }

    #[test]
    fn in_span_ends_on_return() {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("test/in_span");

        let answer = tracer.in_span(&Context::new(), "compute", |_cx| 42);
        assert_eq!(answer, 42);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "compute");
    }
}
