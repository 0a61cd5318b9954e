//! A single-process tracing pipeline core.
//!
//! `tracepipe` provides the full span lifecycle for one process: an
//! instrumentation API for creating and mutating [`trace::Span`]s, span
//! processors implementing synchronous and batching forwarding policies, and
//! a pluggable [`trace::SpanExporter`] abstraction with two built-in sinks —
//! a pretty-printing [`trace::StreamExporter`] and a
//! [`trace::InMemorySpanExporter`] for inspection in tests.
//!
//! There is no global registry: a [`trace::TracerProvider`] is constructed
//! explicitly and handed to application code as [`trace::Tracer`] handles.
//!
//! # Getting started
//!
//! ```
//! use tracepipe::{trace::{InMemorySpanExporter, TracerProvider}, Context, KeyValue, Resource};
//!
//! let exporter = InMemorySpanExporter::default();
//! let provider = TracerProvider::builder()
//!     .with_simple_exporter(exporter.clone())
//!     .with_resource(Resource::new("getting-started", "0.1.0"))
//!     .build();
//!
//! let tracer = provider.tracer("example/getting-started");
//! let (_cx, mut span) = tracer.start(&Context::new(), "operation");
//! span.set_attribute(KeyValue::new("x", 2_i64));
//! span.end();
//!
//! // Retrieve spans *before* shutting the provider down; shutdown clears the
//! // in-memory exporter's store.
//! let spans = exporter.get_finished_spans().unwrap();
//! assert_eq!(spans.len(), 1);
//! provider.shutdown().unwrap();
//! ```
//!
//! # Feature flags
//!
//! - `internal-logs` (default): emit the pipeline's own diagnostics as
//!   structured [`tracing`] events.

pub mod common;
pub mod context;
#[doc(hidden)]
pub mod diagnostics;
pub mod error;
pub mod resource;
pub mod trace;

pub use common::{InstrumentationScope, Key, KeyValue, StringValue, Value};
pub use context::Context;
pub use error::{SdkError, SdkResult};
pub use resource::Resource;
