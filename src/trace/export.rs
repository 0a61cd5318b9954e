//! Exporter plug-in interface.
use crate::error::SdkResult;
use crate::resource::Resource;
use crate::trace::SpanData;
use futures_util::future::BoxFuture;
use std::fmt::Debug;
use std::time::Duration;

/// Describes the result of an export.
pub type ExportResult = SdkResult;

/// `SpanExporter` defines the interface that sink-specific exporters must
/// implement so that they can be plugged into the pipeline.
///
/// The exporter is expected to be a simple encoder and transmitter of span
/// snapshots; batching, queuing and retry policy live in the span processor
/// that owns it. Any new sink (file, network collector, metrics system)
/// implements just this trait.
pub trait SpanExporter: Send + Sync + Debug {
    /// Exports a batch of finished span snapshots.
    ///
    /// This function is never called concurrently for the same exporter
    /// instance; it can be called again only after the current call returns.
    /// It must not block indefinitely — implementations honor a deadline and
    /// return [`SdkError::Timeout`] when it fires, abandoning remaining work.
    ///
    /// [`SdkError::Timeout`]: crate::SdkError::Timeout
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult>;

    /// Shuts down the exporter, flushing anything it buffers internally and
    /// releasing the sink.
    ///
    /// Called once per instance, when the owning provider shuts down. After
    /// `shutdown`, subsequent `export` calls return an error.
    fn shutdown(&mut self, timeout: Duration) -> SdkResult {
        let _ = timeout;
        Ok(())
    }

    /// Set the resource attached to all batches this exporter receives.
    ///
    /// Invoked once, before the first batch, by the owning span processor.
    fn set_resource(&mut self, _resource: &Resource) {}
}
