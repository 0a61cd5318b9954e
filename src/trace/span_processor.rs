//! # Span Processor Interface
//!
//! Span processors sit between span completion and export: `Span::end` hands
//! the frozen snapshot to `on_end`, and the processor forwards it to its
//! [`SpanExporter`] according to its policy — immediately
//! ([`SimpleSpanProcessor`]) or after buffering ([`BatchSpanProcessor`]).
//!
//! Export failures are logged by the processor and never propagate back to
//! the application code that ended the span.
use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::{SpanData, SpanExporter};
use futures_executor::block_on;
use std::cmp::min;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use std::{env, str::FromStr};

/// Delay interval between two consecutive batch exports.
pub(crate) const TRACEPIPE_BSP_SCHEDULE_DELAY: &str = "TRACEPIPE_BSP_SCHEDULE_DELAY";
/// Default delay interval between two consecutive batch exports.
pub(crate) const TRACEPIPE_BSP_SCHEDULE_DELAY_DEFAULT: u64 = 5_000;
/// Maximum queue size.
pub(crate) const TRACEPIPE_BSP_MAX_QUEUE_SIZE: &str = "TRACEPIPE_BSP_MAX_QUEUE_SIZE";
/// Default maximum queue size.
pub(crate) const TRACEPIPE_BSP_MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
/// Maximum batch size, must be less than or equal to the maximum queue size.
pub(crate) const TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE: &str = "TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE";
/// Default maximum batch size.
pub(crate) const TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;
/// Maximum allowed time to export data.
pub(crate) const TRACEPIPE_BSP_EXPORT_TIMEOUT: &str = "TRACEPIPE_BSP_EXPORT_TIMEOUT";
/// Default maximum allowed time to export data.
pub(crate) const TRACEPIPE_BSP_EXPORT_TIMEOUT_DEFAULT: u64 = 30_000;

const DEFAULT_FORCE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// `SpanProcessor` intercepts span completion events and forwards them to an
/// exporter. `on_end` is called synchronously within `Span::end`, therefore
/// it must not block on export I/O or panic.
pub trait SpanProcessor: Send + Sync + std::fmt::Debug {
    /// `on_end` is called after a span is ended (i.e., the end timestamp is
    /// already set) with its immutable snapshot.
    fn on_end(&self, span: SpanData);
    /// Force any buffered spans to be exported.
    fn force_flush(&self) -> SdkResult;
    /// Shuts down the processor: one final flush, then the exporter is shut
    /// down and further spans are dropped.
    fn shutdown(&self) -> SdkResult;
    /// Set the resource forwarded to the exporter.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// A [`SpanProcessor`] that passes finished spans to the configured
/// exporter as soon as they are finished, one batch per span, without any
/// buffering.
///
/// Spans are exported in the exact order their `end` was invoked. This is
/// the reference policy: simple, ordered and synchronous. For higher
/// throughput consider [`BatchSpanProcessor`].
#[derive(Debug)]
pub struct SimpleSpanProcessor {
    exporter: Mutex<Box<dyn SpanExporter>>,
}

impl SimpleSpanProcessor {
    /// Create a new [`SimpleSpanProcessor`] using the provided exporter.
    pub fn new(exporter: Box<dyn SpanExporter>) -> Self {
        Self {
            exporter: Mutex::new(exporter),
        }
    }
}

impl SpanProcessor for SimpleSpanProcessor {
    fn on_end(&self, span: SpanData) {
        let result = self
            .exporter
            .lock()
            .map_err(SdkError::from)
            .and_then(|mut exporter| block_on(exporter.export(vec![span])));

        if let Err(err) = result {
            // Swallowed: export failures must never reach the caller of end().
            crate::diag_debug!(
                name: "SimpleSpanProcessor.OnEnd.Error",
                reason = format!("{:?}", err)
            );
        }
    }

    fn force_flush(&self) -> SdkResult {
        // Nothing is buffered.
        Ok(())
    }

    fn shutdown(&self) -> SdkResult {
        let mut exporter = self.exporter.lock()?;
        exporter.shutdown(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut exporter) = self.exporter.lock() {
            exporter.set_resource(resource);
        }
    }
}

/// Messages exchanged between the caller threads and the background thread.
#[allow(clippy::large_enum_variant)]
#[derive(Debug)]
enum BatchMessage {
    ExportSpan(SpanData),
    ForceFlush(SyncSender<SdkResult>),
    Shutdown(SyncSender<SdkResult>),
    SetResource(Arc<Resource>),
}

/// A [`SpanProcessor`] that buffers finished spans and exports them in
/// batches from a dedicated background thread.
///
/// `on_end` is a fire-and-forget enqueue onto a bounded channel; it never
/// blocks waiting for a flush. The worker flushes when the buffer reaches
/// [`BatchConfig::max_export_batch_size`] or when the scheduled delay
/// elapses, whichever comes first. Within a batch, spans keep their enqueue
/// order; across batches, the order is flush order.
///
/// `shutdown` forces one final flush, shuts the exporter down and then
/// forbids further enqueues: spans ended after shutdown are dropped and
/// logged, not exported.
#[derive(Debug)]
pub struct BatchSpanProcessor {
    message_sender: SyncSender<BatchMessage>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    forceflush_timeout: Duration,
    shutdown_timeout: Duration,
    is_shutdown: AtomicBool,
    dropped_span_count: Arc<AtomicUsize>,
}

impl BatchSpanProcessor {
    /// Creates a new [`BatchSpanProcessor`] with a dedicated worker thread.
    pub fn new<E>(mut exporter: E, config: BatchConfig) -> Self
    where
        E: SpanExporter + 'static,
    {
        let (message_sender, message_receiver) = sync_channel(config.max_queue_size);

        let handle = thread::Builder::new()
            .name("tracepipe-batch-span-processor".to_string())
            .spawn(move || {
                let mut spans: Vec<SpanData> = Vec::with_capacity(config.max_export_batch_size);
                let mut last_export_time = Instant::now();

                loop {
                    let timeout = config
                        .scheduled_delay
                        .saturating_sub(last_export_time.elapsed());
                    match message_receiver.recv_timeout(timeout) {
                        Ok(BatchMessage::ExportSpan(span)) => {
                            spans.push(span);
                            if spans.len() >= config.max_export_batch_size
                                || last_export_time.elapsed() >= config.scheduled_delay
                            {
                                export_batch(&mut exporter, &mut spans);
                                last_export_time = Instant::now();
                            }
                        }
                        Ok(BatchMessage::ForceFlush(sender)) => {
                            let result = flush_batch(&mut exporter, &mut spans);
                            let _ = sender.send(result);
                            last_export_time = Instant::now();
                        }
                        Ok(BatchMessage::Shutdown(sender)) => {
                            let result = flush_batch(&mut exporter, &mut spans)
                                .and_then(|_| exporter.shutdown(config.max_export_timeout));
                            let _ = sender.send(result);
                            break;
                        }
                        Ok(BatchMessage::SetResource(resource)) => {
                            exporter.set_resource(&resource);
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if last_export_time.elapsed() >= config.scheduled_delay {
                                export_batch(&mut exporter, &mut spans);
                                last_export_time = Instant::now();
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            // All senders gone; nothing more will arrive.
                            // The sink still has to be released, just as on
                            // an explicit shutdown.
                            export_batch(&mut exporter, &mut spans);
                            if let Err(err) = exporter.shutdown(config.max_export_timeout) {
                                crate::diag_debug!(
                                    name: "BatchSpanProcessor.Shutdown.Error",
                                    reason = format!("{:?}", err)
                                );
                            }
                            break;
                        }
                    }
                }
            })
            .expect("failed to spawn batch span processor thread");

        Self {
            message_sender,
            handle: Mutex::new(Some(handle)),
            forceflush_timeout: DEFAULT_FORCE_FLUSH_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            is_shutdown: AtomicBool::new(false),
            dropped_span_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a builder configuring a [`BatchSpanProcessor`] for `exporter`.
    pub fn builder<E>(exporter: E) -> BatchSpanProcessorBuilder<E>
    where
        E: SpanExporter + 'static,
    {
        BatchSpanProcessorBuilder {
            exporter,
            config: BatchConfig::default(),
        }
    }
}

/// Export the buffered spans, logging (not returning) any failure. The
/// buffer is drained either way; a failed batch is dropped, not retried.
fn export_batch<E: SpanExporter>(exporter: &mut E, spans: &mut Vec<SpanData>) {
    if let Err(err) = flush_batch(exporter, spans) {
        crate::diag_debug!(
            name: "BatchSpanProcessor.Export.Error",
            reason = format!("{:?}", err)
        );
    }
}

fn flush_batch<E: SpanExporter>(exporter: &mut E, spans: &mut Vec<SpanData>) -> SdkResult {
    if spans.is_empty() {
        return Ok(());
    }
    block_on(exporter.export(spans.split_off(0)))
}

impl SpanProcessor for BatchSpanProcessor {
    fn on_end(&self, span: SpanData) {
        if self.is_shutdown.load(Ordering::Relaxed) {
            // Usage error, not fatal: the span is dropped.
            crate::diag_warn!(
                name: "BatchSpanProcessor.OnEnd.AfterShutdown",
                span_name = span.name.to_string()
            );
            return;
        }
        let result = self.message_sender.try_send(BatchMessage::ExportSpan(span));

        if result.is_err() {
            // Emit a warning the first time a span has to be dropped, then
            // stay quiet to avoid flooding when the queue is saturated.
            if self.dropped_span_count.fetch_add(1, Ordering::Relaxed) == 0 {
                crate::diag_warn!(
                    name: "BatchSpanProcessor.SpanDroppingStarted",
                    message = "queue full or worker gone; spans are being dropped"
                );
            }
        }
    }

    fn force_flush(&self) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        let (sender, receiver) = sync_channel(1);
        self.message_sender
            .try_send(BatchMessage::ForceFlush(sender))
            .map_err(|err| SdkError::InternalFailure(format!("force flush not sent: {err}")))?;

        receiver
            .recv_timeout(self.forceflush_timeout)
            .map_err(|_| SdkError::Timeout(self.forceflush_timeout))?
    }

    fn shutdown(&self) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        let dropped = self.dropped_span_count.load(Ordering::Relaxed);
        if dropped > 0 {
            crate::diag_warn!(
                name: "BatchSpanProcessor.Shutdown.DroppedSpans",
                dropped_span_count = dropped
            );
        }
        let (sender, receiver) = sync_channel(1);
        self.message_sender
            .try_send(BatchMessage::Shutdown(sender))
            .map_err(|err| SdkError::InternalFailure(format!("shutdown not sent: {err}")))?;

        let result = receiver
            .recv_timeout(self.shutdown_timeout)
            .map_err(|_| SdkError::Timeout(self.shutdown_timeout))?;
        if let Some(handle) = self.handle.lock()?.take() {
            handle
                .join()
                .map_err(|_| SdkError::InternalFailure("worker thread panicked".to_string()))?;
        }
        result
    }

    fn set_resource(&mut self, resource: &Resource) {
        let result = self
            .message_sender
            .try_send(BatchMessage::SetResource(Arc::new(resource.clone())));

        if result.is_err() {
            // Batches would be exported without the resource.
            crate::diag_warn!(
                name: "BatchSpanProcessor.SetResource.Dropped",
                message = "queue full or worker gone; resource not forwarded"
            );
        }
    }
}

/// Builder for [`BatchSpanProcessor`].
#[derive(Debug)]
pub struct BatchSpanProcessorBuilder<E>
where
    E: SpanExporter + 'static,
{
    exporter: E,
    config: BatchConfig,
}

impl<E> BatchSpanProcessorBuilder<E>
where
    E: SpanExporter + 'static,
{
    /// Set the [`BatchConfig`] to use.
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchSpanProcessorBuilder { config, ..self }
    }

    /// Build a new [`BatchSpanProcessor`], spawning its worker thread.
    pub fn build(self) -> BatchSpanProcessor {
        BatchSpanProcessor::new(self.exporter, self.config)
    }
}

/// Batch span processor configuration.
/// Use [`BatchConfigBuilder`] to configure your own instance.
#[derive(Debug)]
pub struct BatchConfig {
    /// The maximum queue size to buffer spans for delayed processing. If the
    /// queue gets full it drops the spans. The default value is 2048.
    pub(crate) max_queue_size: usize,

    /// The delay interval between two consecutive processing of batches. The
    /// default value is 5 seconds.
    pub(crate) scheduled_delay: Duration,

    /// The maximum number of spans to export in a single batch; reaching it
    /// triggers an immediate flush. The default value is 512.
    pub(crate) max_export_batch_size: usize,

    /// The maximum duration to export a batch of data, also used as the
    /// exporter's shutdown deadline.
    pub(crate) max_export_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

/// A builder for creating [`BatchConfig`] instances.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    /// Create a new [`BatchConfigBuilder`] initialized with the default
    /// batch config values, overridden by environment variables if set:
    /// * `TRACEPIPE_BSP_MAX_QUEUE_SIZE`
    /// * `TRACEPIPE_BSP_SCHEDULE_DELAY` (milliseconds)
    /// * `TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE`
    /// * `TRACEPIPE_BSP_EXPORT_TIMEOUT` (milliseconds)
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: TRACEPIPE_BSP_MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: Duration::from_millis(TRACEPIPE_BSP_SCHEDULE_DELAY_DEFAULT),
            max_export_batch_size: TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: Duration::from_millis(TRACEPIPE_BSP_EXPORT_TIMEOUT_DEFAULT),
        }
        .init_from_env_vars()
    }
}

impl BatchConfigBuilder {
    /// Set the maximum queue size; spans are dropped once it is full.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set the flush threshold: the number of buffered spans that triggers
    /// an immediate export.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Set the delay interval between two consecutive batch exports.
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = scheduled_delay;
        self
    }

    /// Set the maximum duration to export a batch of data.
    pub fn with_max_export_timeout(mut self, max_export_timeout: Duration) -> Self {
        self.max_export_timeout = max_export_timeout;
        self
    }

    /// Builds a [`BatchConfig`] enforcing that `max_export_batch_size` is
    /// less than or equal to `max_queue_size`.
    pub fn build(self) -> BatchConfig {
        let max_export_batch_size = min(self.max_export_batch_size, self.max_queue_size);

        BatchConfig {
            max_queue_size: self.max_queue_size,
            scheduled_delay: self.scheduled_delay,
            max_export_timeout: self.max_export_timeout,
            max_export_batch_size,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(max_queue_size) = env::var(TRACEPIPE_BSP_MAX_QUEUE_SIZE)
            .ok()
            .and_then(|queue_size| usize::from_str(&queue_size).ok())
        {
            self.max_queue_size = max_queue_size;
        }

        if let Some(scheduled_delay) = env::var(TRACEPIPE_BSP_SCHEDULE_DELAY)
            .ok()
            .and_then(|delay| u64::from_str(&delay).ok())
        {
            self.scheduled_delay = Duration::from_millis(scheduled_delay);
        }

        if let Some(max_export_batch_size) = env::var(TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE)
            .ok()
            .and_then(|batch_size| usize::from_str(&batch_size).ok())
        {
            self.max_export_batch_size = max_export_batch_size;
        }

        if self.max_export_batch_size > self.max_queue_size {
            self.max_export_batch_size = self.max_queue_size;
        }

        if let Some(max_export_timeout) = env::var(TRACEPIPE_BSP_EXPORT_TIMEOUT)
            .ok()
            .and_then(|timeout| u64::from_str(&timeout).ok())
        {
            self.max_export_timeout = Duration::from_millis(max_export_timeout);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{InMemorySpanExporter, SpanContext, Status};
    use futures_util::future::BoxFuture;
    use std::borrow::Cow;
    use std::time::SystemTime;

    fn create_test_span(name: &str) -> SpanData {
        let now = SystemTime::now();
        SpanData {
            span_context: SpanContext::empty(),
            parent_span_id: crate::trace::SpanId::INVALID,
            name: Cow::Owned(name.to_string()),
            start_time: now,
            end_time: now,
            attributes: Vec::new(),
            events: Vec::new(),
            status: Status::Unset,
            instrumentation_scope: Default::default(),
        }
    }

    #[test]
    fn simple_processor_on_end_calls_export() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(Box::new(exporter.clone()));
        let span_data = create_test_span("single");
        processor.on_end(span_data.clone());
        assert_eq!(exporter.get_finished_spans().unwrap()[0], span_data);
        let _result = processor.shutdown();
    }

    #[test]
    fn simple_processor_exports_in_end_order() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(Box::new(exporter.clone()));
        for i in 0..10 {
            processor.on_end(create_test_span(&format!("span-{i}")));
        }

        let names: Vec<_> = exporter
            .get_finished_spans()
            .unwrap()
            .into_iter()
            .map(|span| span.name.into_owned())
            .collect();
        let expected: Vec<_> = (0..10).map(|i| format!("span-{i}")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn simple_processor_shutdown_clears_in_memory_exporter() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(Box::new(exporter.clone()));
        processor.on_end(create_test_span("gone-after-shutdown"));
        assert!(!exporter.get_finished_spans().unwrap().is_empty());
        processor.shutdown().unwrap();
        assert!(exporter.get_finished_spans().unwrap().is_empty());
    }

    #[test]
    fn default_const_values() {
        assert_eq!(TRACEPIPE_BSP_MAX_QUEUE_SIZE, "TRACEPIPE_BSP_MAX_QUEUE_SIZE");
        assert_eq!(TRACEPIPE_BSP_MAX_QUEUE_SIZE_DEFAULT, 2048);
        assert_eq!(TRACEPIPE_BSP_SCHEDULE_DELAY, "TRACEPIPE_BSP_SCHEDULE_DELAY");
        assert_eq!(TRACEPIPE_BSP_SCHEDULE_DELAY_DEFAULT, 5000);
        assert_eq!(
            TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE,
            "TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE"
        );
        assert_eq!(TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT, 512);
        assert_eq!(TRACEPIPE_BSP_EXPORT_TIMEOUT, "TRACEPIPE_BSP_EXPORT_TIMEOUT");
        assert_eq!(TRACEPIPE_BSP_EXPORT_TIMEOUT_DEFAULT, 30000);
    }

    #[test]
    fn default_batch_config() {
        let env_vars = vec![
            TRACEPIPE_BSP_SCHEDULE_DELAY,
            TRACEPIPE_BSP_EXPORT_TIMEOUT,
            TRACEPIPE_BSP_MAX_QUEUE_SIZE,
            TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE,
        ];

        let config = temp_env::with_vars_unset(env_vars, BatchConfig::default);

        assert_eq!(
            config.scheduled_delay,
            Duration::from_millis(TRACEPIPE_BSP_SCHEDULE_DELAY_DEFAULT)
        );
        assert_eq!(
            config.max_export_timeout,
            Duration::from_millis(TRACEPIPE_BSP_EXPORT_TIMEOUT_DEFAULT)
        );
        assert_eq!(config.max_queue_size, TRACEPIPE_BSP_MAX_QUEUE_SIZE_DEFAULT);
        assert_eq!(
            config.max_export_batch_size,
            TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT
        );
    }

    #[test]
    fn batch_config_configurable_by_env_vars() {
        let env_vars = vec![
            (TRACEPIPE_BSP_SCHEDULE_DELAY, Some("2000")),
            (TRACEPIPE_BSP_EXPORT_TIMEOUT, Some("60000")),
            (TRACEPIPE_BSP_MAX_QUEUE_SIZE, Some("4096")),
            (TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
        ];

        let config = temp_env::with_vars(env_vars, BatchConfig::default);

        assert_eq!(config.scheduled_delay, Duration::from_millis(2000));
        assert_eq!(config.max_export_timeout, Duration::from_millis(60000));
        assert_eq!(config.max_queue_size, 4096);
        assert_eq!(config.max_export_batch_size, 1024);
    }

    #[test]
    fn batch_size_is_clamped_to_queue_size() {
        let env_vars = vec![
            (TRACEPIPE_BSP_MAX_QUEUE_SIZE, Some("256")),
            (TRACEPIPE_BSP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
        ];

        let config = temp_env::with_vars(env_vars, BatchConfig::default);

        assert_eq!(config.max_queue_size, 256);
        assert_eq!(config.max_export_batch_size, 256);
    }

    #[test]
    fn batch_config_with_fields() {
        let batch = BatchConfigBuilder::default()
            .with_max_export_batch_size(10)
            .with_scheduled_delay(Duration::from_millis(10))
            .with_max_export_timeout(Duration::from_millis(10))
            .with_max_queue_size(10)
            .build();
        assert_eq!(batch.max_export_batch_size, 10);
        assert_eq!(batch.scheduled_delay, Duration::from_millis(10));
        assert_eq!(batch.max_export_timeout, Duration::from_millis(10));
        assert_eq!(batch.max_queue_size, 10);
    }

    /// Mock exporter recording each export call's batch.
    #[derive(Debug)]
    struct MockSpanExporter {
        exported_batches: Arc<Mutex<Vec<Vec<SpanData>>>>,
        shutdown_count: Arc<AtomicUsize>,
        resource: Arc<Mutex<Option<Resource>>>,
    }

    impl MockSpanExporter {
        fn new() -> Self {
            Self {
                exported_batches: Arc::new(Mutex::new(Vec::new())),
                shutdown_count: Arc::new(AtomicUsize::new(0)),
                resource: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl SpanExporter for MockSpanExporter {
        fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
            let exported_batches = self.exported_batches.clone();
            Box::pin(async move {
                exported_batches.lock().unwrap().push(batch);
                Ok(())
            })
        }

        fn shutdown(&mut self, _timeout: Duration) -> SdkResult {
            self.shutdown_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn set_resource(&mut self, resource: &Resource) {
            *self.resource.lock().unwrap() = Some(resource.clone());
        }
    }

    fn slow_timer_config(max_export_batch_size: usize) -> BatchConfig {
        // Effectively disables the time-based flush trigger.
        BatchConfigBuilder::default()
            .with_max_queue_size(64)
            .with_max_export_batch_size(max_export_batch_size)
            .with_scheduled_delay(Duration::from_secs(3600))
            .build()
    }

    #[test]
    fn batch_processor_flushes_every_threshold_spans() {
        let exporter = MockSpanExporter::new();
        let batches = exporter.exported_batches.clone();
        let processor = BatchSpanProcessor::new(exporter, slow_timer_config(3));

        for i in 0..7 {
            processor.on_end(create_test_span(&format!("span-{i}")));
        }
        processor.force_flush().unwrap();

        // 7 spans at threshold 3: ceil(7/3) == 3 export calls.
        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[1].len(), 3);
        assert_eq!(batches[2].len(), 1);

        // concatenation of batches preserves enqueue order
        let names: Vec<_> = batches
            .iter()
            .flatten()
            .map(|span| span.name.clone().into_owned())
            .collect();
        let expected: Vec<_> = (0..7).map(|i| format!("span-{i}")).collect();
        assert_eq!(names, expected);

        drop(batches);
        processor.shutdown().unwrap();
    }

    #[test]
    fn batch_processor_force_flush_drains_buffer() {
        let exporter = MockSpanExporter::new();
        let batches = exporter.exported_batches.clone();
        let processor = BatchSpanProcessor::new(exporter, slow_timer_config(10));

        processor.on_end(create_test_span("flush-me"));
        processor.force_flush().unwrap();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].name, "flush-me");
    }

    #[test]
    fn batch_processor_shutdown_flushes_and_stops() {
        let exporter = MockSpanExporter::new();
        let batches = exporter.exported_batches.clone();
        let shutdowns = exporter.shutdown_count.clone();
        let processor = BatchSpanProcessor::new(exporter, slow_timer_config(10));

        processor.on_end(create_test_span("pending"));
        processor.shutdown().unwrap();

        assert_eq!(batches.lock().unwrap().len(), 1);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);

        // a second shutdown is a usage error and does not flush again
        assert_eq!(processor.shutdown(), Err(SdkError::AlreadyShutdown));
        assert_eq!(batches.lock().unwrap().len(), 1);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);

        // spans ended after shutdown are dropped
        processor.on_end(create_test_span("late"));
        assert_eq!(batches.lock().unwrap().len(), 1);
    }

    #[test]
    fn batch_processor_force_flush_after_shutdown_errors() {
        let exporter = MockSpanExporter::new();
        let processor = BatchSpanProcessor::new(exporter, slow_timer_config(10));
        processor.shutdown().unwrap();
        assert_eq!(processor.force_flush(), Err(SdkError::AlreadyShutdown));
    }

    #[test]
    fn batch_processor_forwards_resource_to_the_worker() {
        let exporter = MockSpanExporter::new();
        let resource_slot = exporter.resource.clone();
        let mut processor = BatchSpanProcessor::new(exporter, slow_timer_config(10));

        processor.set_resource(&Resource::new("svc", "1.0"));
        // rendezvous: the flush reply proves the queued SetResource ran first
        processor.force_flush().unwrap();
        assert_eq!(
            resource_slot
                .lock()
                .unwrap()
                .as_ref()
                .map(|r| r.service_name().to_string()),
            Some("svc".to_string())
        );

        processor.shutdown().unwrap();
        // the worker is gone; the late send is reported, not fatal
        processor.set_resource(&Resource::new("late", "0"));
        assert_eq!(
            resource_slot
                .lock()
                .unwrap()
                .as_ref()
                .map(|r| r.service_name().to_string()),
            Some("svc".to_string())
        );
    }

    #[test]
    fn dropping_the_processor_releases_the_exporter() {
        let exporter = MockSpanExporter::new();
        let batches = exporter.exported_batches.clone();
        let shutdowns = exporter.shutdown_count.clone();
        let processor = BatchSpanProcessor::new(exporter, slow_timer_config(10));

        processor.on_end(create_test_span("orphaned"));
        drop(processor);

        // the worker notices the disconnect, flushes, then shuts the sink down
        let deadline = Instant::now() + Duration::from_secs(5);
        while shutdowns.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(batches.lock().unwrap().len(), 1);
        assert_eq!(batches.lock().unwrap()[0][0].name, "orphaned");
    }

    #[test]
    fn batch_processor_concurrent_on_end() {
        let exporter = MockSpanExporter::new();
        let batches = exporter.exported_batches.clone();
        // Queue must hold all 100 spans: on_end drops on a full queue by
        // design, and this test exercises concurrency, not drop-on-full.
        let config = BatchConfigBuilder::default()
            .with_max_queue_size(128)
            .with_max_export_batch_size(8)
            .with_scheduled_delay(Duration::from_secs(3600))
            .build();
        let processor = Arc::new(BatchSpanProcessor::new(exporter, config));

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let processor = processor.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        processor.on_end(create_test_span(&format!("w{worker}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        processor.force_flush().unwrap();

        let total: usize = batches.lock().unwrap().iter().map(Vec::len).sum();
        assert_eq!(total, 100);
        processor.shutdown().unwrap();
    }
}
