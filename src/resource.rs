//! Static description of the entity producing spans.
use std::borrow::Cow;

/// Immutable, process-wide descriptor attached to every exported batch.
///
/// Set once at [`TracerProvider`] construction and never mutated afterwards;
/// the provider hands it to its span processor, which forwards it to the
/// exporter before the first batch.
///
/// [`TracerProvider`]: crate::trace::TracerProvider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    service_name: Cow<'static, str>,
    service_version: Cow<'static, str>,
}

impl Resource {
    /// Create a resource describing the given service.
    pub fn new(
        service_name: impl Into<Cow<'static, str>>,
        service_version: impl Into<Cow<'static, str>>,
    ) -> Self {
        Resource {
            service_name: service_name.into(),
            service_version: service_version.into(),
        }
    }

    /// The service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The service version.
    pub fn service_version(&self) -> &str {
        &self.service_version
    }
}

impl Default for Resource {
    fn default() -> Self {
        Resource::new("unknown_service", "")
    }
}
