//! In-memory exporter for assertions in tests.
use crate::error::SdkError;
use crate::resource::Resource;
use crate::trace::{ExportResult, SpanData, SpanExporter};
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An in-memory span exporter that appends finished spans to a shared
/// buffer, for use in unit and integration tests.
///
/// Spans land in the buffer in export order: with a simple processor that is
/// exactly end order, with a batching processor it is end order per flush.
/// Cloning is shallow — clones read and write the same buffer, which is how
/// a test keeps a handle on the buffer after moving the exporter into a
/// provider.
///
/// # Shutdown clears the buffer
///
/// `shutdown` (including the one triggered by provider shutdown or drop)
/// **clears the buffer**. Call [`get_finished_spans`] *before* shutting the
/// provider down; afterwards it reports no spans, without an error — an
/// easily misread ordering. Use [`reset`] to clear explicitly mid-test.
///
/// [`get_finished_spans`]: InMemorySpanExporter::get_finished_spans
/// [`reset`]: InMemorySpanExporter::reset
///
/// # Example
///
/// ```
/// use tracepipe::trace::{InMemorySpanExporter, TracerProvider};
/// use tracepipe::Context;
///
/// let exporter = InMemorySpanExporter::default();
/// let provider = TracerProvider::builder()
///     .with_simple_exporter(exporter.clone())
///     .build();
///
/// let tracer = provider.tracer("example/in_memory");
/// tracer.in_span(&Context::new(), "work", |_cx| {});
///
/// // Inspect before shutdown: shutdown clears the buffer.
/// let spans = exporter.get_finished_spans().unwrap();
/// assert_eq!(spans.len(), 1);
///
/// provider.shutdown().unwrap();
/// assert!(exporter.get_finished_spans().unwrap().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    resource: Arc<Mutex<Resource>>,
}

impl InMemorySpanExporter {
    /// Return a builder; today equivalent to `InMemorySpanExporter::default()`.
    pub fn builder() -> InMemorySpanExporterBuilder {
        InMemorySpanExporterBuilder::new()
    }

    /// Returns a copy of the finished spans exported so far.
    ///
    /// Returns an empty list after `shutdown` or [`reset`] — not an error.
    ///
    /// [`reset`]: InMemorySpanExporter::reset
    pub fn get_finished_spans(&self) -> Result<Vec<SpanData>, SdkError> {
        let spans = self.spans.lock().map(|spans| spans.clone())?;
        Ok(spans)
    }

    /// The resource the owning processor attached, if any.
    pub fn resource(&self) -> Result<Resource, SdkError> {
        let resource = self.resource.lock().map(|resource| resource.clone())?;
        Ok(resource)
    }

    /// Clears the buffer of finished spans.
    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
    }
}

/// Builder for [`InMemorySpanExporter`].
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporterBuilder {
    _private: (),
}

impl InMemorySpanExporterBuilder {
    /// Creates a new instance of the builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new instance of the exporter.
    pub fn build(&self) -> InMemorySpanExporter {
        InMemorySpanExporter::default()
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self
            .spans
            .lock()
            .map(|mut spans| spans.extend(batch))
            .map_err(SdkError::from);
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self, _timeout: Duration) -> Result<(), SdkError> {
        self.reset();
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut stored) = self.resource.lock() {
            *stored = resource.clone();
        }
    }
}
