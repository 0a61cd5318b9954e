//! # Trace pipeline
//!
//! This module wires the pipeline together:
//!
//! * The [`TracerProvider`] is the composition root: it owns the span
//!   processor, id generator and resource, and creates [`Tracer`]s.
//! * A [`Tracer`] starts [`Span`]s, parenting them through explicitly
//!   passed [`Context`] values.
//! * Ending a span freezes it into a [`SpanData`] snapshot and hands it to
//!   the [`SpanProcessor`] — [`SimpleSpanProcessor`] exports synchronously,
//!   [`BatchSpanProcessor`] buffers and exports from a background thread.
//! * The processor drives a pluggable [`SpanExporter`]:
//!   [`StreamExporter`] writes JSON documents to a byte stream,
//!   [`InMemorySpanExporter`] collects spans for test assertions.
//!
//! [`Context`]: crate::Context
mod export;
mod id_generator;
mod in_memory_exporter;
mod provider;
mod span;
mod span_context;
mod span_processor;
mod stream_exporter;
mod tracer;

pub use export::{ExportResult, SpanExporter};
pub use id_generator::{IdGenerator, IncrementIdGenerator, RandomIdGenerator};
pub use in_memory_exporter::{InMemorySpanExporter, InMemorySpanExporterBuilder};
pub use provider::{Builder, TracerProvider};
pub use span::{Event, Span, SpanData, Status};
pub use span_context::{SpanContext, SpanId, TraceId};
pub use span_processor::{
    BatchConfig, BatchConfigBuilder, BatchSpanProcessor, BatchSpanProcessorBuilder,
    SimpleSpanProcessor, SpanProcessor,
};
pub use stream_exporter::{StreamExporter, StreamExporterBuilder};
pub use tracer::Tracer;
