//! # Span
//!
//! `Span`s represent a single operation within a trace. Spans can be nested
//! to form a trace tree. A span's start time is set on creation; after that
//! it is possible to change its name, set attributes, add events and record
//! errors. None of these can be changed after the span's end time has been
//! set — ending freezes the span into an immutable [`SpanData`] snapshot and
//! hands it to the owning provider's span processor exactly once.
use crate::common::{InstrumentationScope, KeyValue};
use crate::trace::{SpanContext, SpanId, Tracer};
use std::borrow::Cow;
use std::time::SystemTime;

/// Event name used by [`Span::record_error`].
pub(crate) const EXCEPTION_EVENT_NAME: &str = "exception";
/// Attribute key carrying the recorded error's message.
pub(crate) const EXCEPTION_MESSAGE_KEY: &str = "exception.message";

/// The status of a [`Span`].
///
/// These values form a total order: Ok > Error > Unset. Setting `Status::Ok`
/// overrides any prior or later attempt to set `Status::Error` or
/// `Status::Unset`.
///
/// Recording an error via [`Span::record_error`] does *not* change the
/// status; the two are independent fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd)]
pub enum Status {
    /// The default status.
    #[default]
    Unset,

    /// The operation contains an error.
    Error {
        /// The description of the error
        description: Cow<'static, str>,
    },

    /// The operation has been validated by an application developer or
    /// operator to have completed successfully.
    Ok,
}

impl Status {
    /// Create a new error status with a given description.
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }
}

/// A timestamped annotation on a span.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// The name of this event.
    pub name: Cow<'static, str>,
    /// The wall clock time at which the event occurred.
    pub timestamp: SystemTime,
    /// Attributes describing the event.
    pub attributes: Vec<KeyValue>,
}

impl Event {
    /// Create a new event.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
        }
    }
}

/// Immutable snapshot of a finished span — the unit handed to span
/// processors and exporters in an export batch. Never mutated after
/// construction.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Ids of this span.
    pub span_context: SpanContext,
    /// Id of the parent span, [`SpanId::INVALID`] for root spans.
    pub parent_span_id: SpanId,
    /// Span name.
    pub name: Cow<'static, str>,
    /// Span start time.
    pub start_time: SystemTime,
    /// Span end time.
    pub end_time: SystemTime,
    /// Span attributes. Keys are unique; order is first-insertion order.
    pub attributes: Vec<KeyValue>,
    /// Span events, in the order they were added.
    pub events: Vec<Event>,
    /// Span status.
    pub status: Status,
    /// Scope of the tracer that produced this span.
    pub instrumentation_scope: InstrumentationScope,
}

/// Single operation within a trace.
///
/// A `Span` is mutable between start and end. [`Span::end`] (or dropping the
/// span, whichever comes first) stamps the end time and forwards the frozen
/// snapshot to the span processor; the drop guard ensures this happens
/// exactly once even on early return or panic unwind.
///
/// Mutation methods take `&mut self`: a span's mutation lifetime is confined
/// to one logical flow and needs no internal synchronization.
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanData>,
    tracer: Tracer,
}

impl Span {
    pub(crate) fn new(span_context: SpanContext, data: Option<SpanData>, tracer: Tracer) -> Self {
        Span {
            span_context,
            data,
            tracer,
        }
    }

    /// Operate on a mutable reference to span data. No-op once ended.
    fn with_data<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut SpanData) -> T,
    {
        self.data.as_mut().map(f)
    }

    /// Returns the `SpanContext` for the given `Span`.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Returns `true` if this span is still recording information.
    /// Always returns `false` after [`Span::end`].
    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    /// Sets a single attribute.
    ///
    /// Keys are unique within a span: setting an existing key replaces its
    /// value (last write wins) while keeping the key's original position.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        self.with_data(|data| data_set_attribute(data, attribute));
    }

    /// Sets multiple attributes at once.
    pub fn set_attributes(&mut self, attributes: impl IntoIterator<Item = KeyValue>) {
        self.with_data(|data| {
            for attribute in attributes {
                data_set_attribute(data, attribute);
            }
        });
    }

    /// Records an event at the current time.
    pub fn add_event(&mut self, name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) {
        self.add_event_with_timestamp(name, SystemTime::now(), attributes);
    }

    /// Records an event at a specific time.
    pub fn add_event_with_timestamp(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) {
        let event = Event::new(name, timestamp, attributes);
        self.with_data(|data| data.events.push(event));
    }

    /// Sets the status of this span.
    ///
    /// Statuses form a total order Ok > Error > Unset; a lower status never
    /// overwrites a higher one.
    pub fn set_status(&mut self, status: Status) {
        self.with_data(|data| {
            if status > data.status {
                data.status = status;
            }
        });
    }

    /// Records `err` as an `exception` event carrying its message.
    ///
    /// This does *not* change the span's status; call [`Span::set_status`]
    /// separately if the error is terminal for the operation.
    pub fn record_error(&mut self, err: &dyn std::error::Error) {
        let message = KeyValue::new(EXCEPTION_MESSAGE_KEY, err.to_string());
        self.add_event(EXCEPTION_EVENT_NAME, vec![message]);
    }

    /// Updates the span's name.
    pub fn update_name(&mut self, new_name: impl Into<Cow<'static, str>>) {
        let new_name = new_name.into();
        self.with_data(|data| data.name = new_name);
    }

    /// Finishes the span at the current time.
    ///
    /// Stamps the end time, freezes the span and synchronously hands the
    /// snapshot to the span processor. Calling `end` a second time is
    /// ignored. `end` itself never blocks on export I/O when a batching
    /// processor is configured.
    pub fn end(&mut self) {
        self.ensure_ended_and_exported(None);
    }

    /// Finishes the span with the given end timestamp.
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        self.ensure_ended_and_exported(Some(timestamp));
    }

    fn ensure_ended_and_exported(&mut self, timestamp: Option<SystemTime>) {
        // Take data, skip if the span already ended.
        let mut data = match self.data.take() {
            Some(data) => data,
            None => return,
        };
        data.end_time = timestamp.unwrap_or_else(SystemTime::now);

        let provider = self.tracer.provider();
        if provider.is_shutdown() {
            // Degraded, not fatal: spans ending after provider shutdown are
            // dropped rather than exported.
            crate::diag_debug!(
                name: "Span.End.AfterProviderShutdown",
                span_name = data.name.to_string()
            );
            return;
        }
        if let Some(processor) = provider.span_processor() {
            processor.on_end(data);
        }
    }
}

impl Drop for Span {
    /// Ends and exports the span if `end` was never called.
    fn drop(&mut self) {
        self.ensure_ended_and_exported(None);
    }
}

fn data_set_attribute(data: &mut SpanData, attribute: KeyValue) {
    match data
        .attributes
        .iter_mut()
        .find(|kv| kv.key == attribute.key)
    {
        Some(existing) => existing.value = attribute.value,
        None => data.attributes.push(attribute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;
    use crate::trace::{InMemorySpanExporter, TracerProvider};
    use crate::Context;

    fn pipeline() -> (InMemorySpanExporter, TracerProvider) {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (exporter, provider)
    }

    #[test]
    fn status_order() {
        assert!(Status::Ok > Status::error(""));
        assert!(Status::error("") > Status::Unset);
    }

    #[test]
    fn attributes_are_last_write_wins() {
        let (exporter, provider) = pipeline();
        let tracer = provider.tracer("test");

        let (_cx, mut span) = tracer.start(&Context::new(), "attrs");
        span.set_attribute(KeyValue::new("x", 1_i64));
        span.set_attribute(KeyValue::new("y", 2_i64));
        span.set_attribute(KeyValue::new("x", 3_i64));
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans[0].attributes.len(), 2);
        // position of "x" is preserved from first insertion
        assert_eq!(spans[0].attributes[0].key.as_str(), "x");
        assert_eq!(spans[0].attributes[0].value, Value::I64(3));
        assert_eq!(spans[0].attributes[1].key.as_str(), "y");
    }

    #[test]
    fn mutation_after_end_is_a_noop() {
        let (exporter, provider) = pipeline();
        let tracer = provider.tracer("test");

        let (_cx, mut span) = tracer.start(&Context::new(), "frozen");
        span.end();
        assert!(!span.is_recording());
        span.set_attribute(KeyValue::new("late", true));
        span.add_event("late", vec![]);
        span.set_status(Status::Ok);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].attributes.is_empty());
        assert!(spans[0].events.is_empty());
        assert_eq!(spans[0].status, Status::Unset);
    }

    #[test]
    fn double_end_exports_once() {
        let (exporter, provider) = pipeline();
        let tracer = provider.tracer("test");

        let (_cx, mut span) = tracer.start(&Context::new(), "twice");
        span.end();
        span.end();
        drop(span);

        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn drop_ends_span() {
        let (exporter, provider) = pipeline();
        let tracer = provider.tracer("test");

        {
            let (_cx, _span) = tracer.start(&Context::new(), "guarded");
            // early exit without an explicit end
        }

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "guarded");
    }

    #[test]
    fn record_error_does_not_set_status() {
        let (exporter, provider) = pipeline();
        let tracer = provider.tracer("test");

        let err = std::io::Error::new(std::io::ErrorKind::Other, "bad multiplication");
        let (_cx, mut span) = tracer.start(&Context::new(), "Multiplication");
        span.record_error(&err);
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        let exceptions: Vec<_> = spans[0]
            .events
            .iter()
            .filter(|event| event.name == EXCEPTION_EVENT_NAME)
            .collect();
        assert_eq!(exceptions.len(), 1);
        assert_eq!(
            exceptions[0].attributes[0].value,
            Value::String("bad multiplication".to_string().into())
        );
        assert_eq!(spans[0].status, Status::Unset);
    }

    #[test]
    fn ok_status_is_final() {
        let (exporter, provider) = pipeline();
        let tracer = provider.tracer("test");

        let (_cx, mut span) = tracer.start(&Context::new(), "status");
        span.set_status(Status::Ok);
        span.set_status(Status::error("too late"));
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans[0].status, Status::Ok);
    }
}
