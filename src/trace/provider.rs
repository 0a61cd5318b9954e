//! # Tracer Provider
//!
//! The `TracerProvider` is the composition root of the pipeline: it owns the
//! span processor (and through it the exporter), the id generator and the
//! resource, and hands out [`Tracer`]s that feed spans into them. It is the
//! only component with a lifecycle — `shutdown` tears the whole pipeline
//! down exactly once, and dropping the last handle does so implicitly.
use crate::common::InstrumentationScope;
use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::{
    BatchSpanProcessor, IdGenerator, RandomIdGenerator, SimpleSpanProcessor, SpanExporter,
    SpanProcessor, Tracer,
};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Creator and registry of named [`Tracer`] instances.
///
/// Cheaply cloneable handle around shared pipeline state; clones refer to the
/// same pipeline. Exactly one span processor is attached (or none, in which
/// case spans are silently discarded).
///
/// ## Shutdown
///
/// `shutdown` flushes buffered spans, shuts the exporter down and marks the
/// pipeline closed; every later call returns [`SdkError::AlreadyShutdown`].
/// Spans ending afterwards are dropped, and tracers hand out non-recording
/// spans. Dropping the last provider handle triggers the same teardown, so a
/// pipeline is flushed even when `shutdown` is never called explicitly —
/// though calling it explicitly is the only way to observe the result.
#[derive(Clone, Debug)]
pub struct TracerProvider {
    inner: Arc<TracerProviderInner>,
}

#[derive(Debug)]
struct TracerProviderInner {
    processor: Option<Box<dyn SpanProcessor>>,
    id_generator: Box<dyn IdGenerator>,
    resource: Resource,
    is_shutdown: AtomicBool,
}

impl TracerProviderInner {
    /// Shuts down the span processor. Only the first caller gets the result;
    /// everyone else learns the pipeline is already closed.
    fn shutdown(&self) -> SdkResult {
        if self
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SdkError::AlreadyShutdown);
        }
        match &self.processor {
            Some(processor) => processor.shutdown(),
            None => Ok(()),
        }
    }
}

impl Drop for TracerProviderInner {
    fn drop(&mut self) {
        if !self.is_shutdown.load(Ordering::SeqCst) {
            if let Err(err) = self.shutdown() {
                crate::diag_warn!(
                    name: "TracerProvider.Drop.ShutdownFailed",
                    reason = format!("{:?}", err)
                );
            }
        }
    }
}

impl Default for TracerProvider {
    /// A provider with no span processor: spans are created but discarded.
    fn default() -> Self {
        TracerProvider::builder().build()
    }
}

impl TracerProvider {
    /// Build a new provider with the default configuration.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Create a tracer identified by the given scope name.
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> Tracer {
        self.tracer_with_scope(InstrumentationScope::new(name))
    }

    /// Create a tracer with a full instrumentation scope.
    pub fn tracer_with_scope(&self, scope: InstrumentationScope) -> Tracer {
        if self.inner.is_shutdown.load(Ordering::Relaxed) {
            crate::diag_debug!(
                name: "TracerProvider.Tracer.AfterShutdown",
                scope_name = scope.name().to_string()
            );
        }
        Tracer::new(scope, self.clone())
    }

    /// The resource describing the entity producing all spans.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    /// True once `shutdown` has been invoked (or triggered by drop).
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed)
    }

    /// Force the attached span processor to flush anything it buffers.
    ///
    /// Blocks until the flush completed or its deadline fired. The pipeline
    /// stays open afterwards.
    pub fn force_flush(&self) -> SdkResult {
        if self.inner.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        match &self.inner.processor {
            Some(processor) => processor.force_flush(),
            None => Ok(()),
        }
    }

    /// Shut the pipeline down: final flush, exporter shutdown, then the
    /// closed state. Idempotent in effect, not in result — the second and
    /// every later call return [`SdkError::AlreadyShutdown`] without flushing
    /// anything.
    pub fn shutdown(&self) -> SdkResult {
        self.inner.shutdown()
    }

    pub(crate) fn span_processor(&self) -> Option<&dyn SpanProcessor> {
        self.inner.processor.as_deref()
    }

    pub(crate) fn id_generator(&self) -> &dyn IdGenerator {
        self.inner.id_generator.as_ref()
    }
}

/// Builder for provider instances.
#[derive(Debug, Default)]
pub struct Builder {
    processor: Option<Box<dyn SpanProcessor>>,
    id_generator: Option<Box<dyn IdGenerator>>,
    resource: Option<Resource>,
}

impl Builder {
    /// Attach `exporter` behind a [`SimpleSpanProcessor`]: every span is
    /// exported synchronously as it ends. Replaces any previously attached
    /// processor.
    pub fn with_simple_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        Builder {
            processor: Some(Box::new(SimpleSpanProcessor::new(Box::new(exporter)))),
            ..self
        }
    }

    /// Attach `exporter` behind a [`BatchSpanProcessor`] with the default
    /// batch configuration. Replaces any previously attached processor.
    pub fn with_batch_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        Builder {
            processor: Some(Box::new(BatchSpanProcessor::builder(exporter).build())),
            ..self
        }
    }

    /// Attach an already-built span processor. Replaces any previously
    /// attached processor — a provider drives exactly one.
    pub fn with_span_processor<T: SpanProcessor + 'static>(self, processor: T) -> Self {
        Builder {
            processor: Some(Box::new(processor)),
            ..self
        }
    }

    /// Override the id generator, e.g. with a deterministic one in tests.
    pub fn with_id_generator<T: IdGenerator + 'static>(self, id_generator: T) -> Self {
        Builder {
            id_generator: Some(Box::new(id_generator)),
            ..self
        }
    }

    /// Set the resource describing the traced entity.
    pub fn with_resource(self, resource: Resource) -> Self {
        Builder {
            resource: Some(resource),
            ..self
        }
    }

    /// Create a new provider from this configuration.
    pub fn build(self) -> TracerProvider {
        let resource = self.resource.unwrap_or_default();
        let mut processor = self.processor;
        if let Some(processor) = processor.as_mut() {
            processor.set_resource(&resource);
        }

        TracerProvider {
            inner: Arc::new(TracerProviderInner {
                processor,
                id_generator: self
                    .id_generator
                    .unwrap_or_else(|| Box::new(RandomIdGenerator::default())),
                resource,
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}
