//! Exporter writing spans as JSON documents to an output stream.
use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::{ExportResult, SpanData, SpanExporter, SpanId, Status};
use chrono::{LocalResult, TimeZone, Utc};
use futures_util::future::BoxFuture;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`SpanExporter`] that serializes each finished span as one
/// pretty-printed JSON document and writes it to a byte stream, stdout by
/// default.
///
/// The first export additionally emits a single document describing the
/// [`Resource`], once per exporter lifetime. Output is a concatenation of
/// JSON documents, not a JSON array; consume it with a streaming parser.
///
/// Each `export` call honors the configured deadline: the deadline is
/// checked between span documents, and when it fires the exporter returns
/// [`SdkError::Timeout`] leaving the documents written so far in the stream.
pub struct StreamExporter {
    writer: Mutex<Box<dyn Write + Send>>,
    resource: Resource,
    export_timeout: Duration,
    is_shutdown: AtomicBool,
    resource_emitted: bool,
}

impl fmt::Debug for StreamExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamExporter")
    }
}

impl Default for StreamExporter {
    /// A stream exporter writing to stdout with the default deadline.
    fn default() -> Self {
        StreamExporterBuilder::default().build()
    }
}

impl StreamExporter {
    /// Return a builder to configure the sink and the export deadline.
    pub fn builder() -> StreamExporterBuilder {
        StreamExporterBuilder::default()
    }

    fn export_sync(&mut self, batch: Vec<SpanData>) -> SdkResult {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Err(SdkError::AlreadyShutdown);
        }
        let deadline = Instant::now() + self.export_timeout;
        let mut writer = self.writer.lock()?;

        if !self.resource_emitted {
            self.resource_emitted = true;
            write_document(&mut **writer, &ResourceDocument::from(&self.resource))?;
        }

        for span in &batch {
            if Instant::now() >= deadline {
                return Err(SdkError::Timeout(self.export_timeout));
            }
            write_document(&mut **writer, &SpanDocument::from(span))?;
        }
        Ok(())
    }
}

impl SpanExporter for StreamExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self.export_sync(batch);
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self, _timeout: Duration) -> SdkResult {
        self.is_shutdown.store(true, Ordering::SeqCst);
        let mut writer = self.writer.lock()?;
        writer
            .flush()
            .map_err(|err| SdkError::InternalFailure(err.to_string()))
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

/// Builder for [`StreamExporter`].
#[derive(Default)]
pub struct StreamExporterBuilder {
    writer: Option<Box<dyn Write + Send>>,
    export_timeout: Option<Duration>,
}

impl fmt::Debug for StreamExporterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamExporterBuilder")
    }
}

impl StreamExporterBuilder {
    /// Write to `writer` instead of stdout.
    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Deadline applied to each `export` call. Defaults to 30 seconds.
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = Some(timeout);
        self
    }

    /// Create the exporter.
    pub fn build(self) -> StreamExporter {
        StreamExporter {
            writer: Mutex::new(
                self.writer
                    .unwrap_or_else(|| Box::new(std::io::stdout())),
            ),
            resource: Resource::default(),
            export_timeout: self.export_timeout.unwrap_or(DEFAULT_EXPORT_TIMEOUT),
            is_shutdown: AtomicBool::new(false),
            resource_emitted: false,
        }
    }
}

/// Serialize in memory first so the sink sees one write per document.
fn write_document<T: Serialize>(writer: &mut dyn Write, document: &T) -> SdkResult {
    let mut buf = serde_json::to_vec_pretty(document)
        .map_err(|err| SdkError::InternalFailure(err.to_string()))?;
    buf.push(b'\n');
    writer
        .write_all(&buf)
        .map_err(|err| SdkError::InternalFailure(err.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDocument<'a> {
    resource: ResourceBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceBody<'a> {
    service_name: &'a str,
    service_version: &'a str,
}

impl<'a> From<&'a Resource> for ResourceDocument<'a> {
    fn from(value: &'a Resource) -> Self {
        ResourceDocument {
            resource: ResourceBody {
                service_name: value.service_name(),
                service_version: value.service_version(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpanDocument<'a> {
    trace_id: String,
    span_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    parent_span_id: String,
    name: &'a str,
    scope: ScopeDocument<'a>,
    #[serde(serialize_with = "as_unix_nano")]
    start_time_unix_nano: SystemTime,
    #[serde(serialize_with = "as_human_readable")]
    start_time: SystemTime,
    #[serde(serialize_with = "as_unix_nano")]
    end_time_unix_nano: SystemTime,
    #[serde(serialize_with = "as_human_readable")]
    end_time: SystemTime,
    attributes: AttributeMap<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<EventDocument<'a>>,
    status: StatusDocument<'a>,
}

impl<'a> From<&'a SpanData> for SpanDocument<'a> {
    fn from(value: &'a SpanData) -> Self {
        SpanDocument {
            trace_id: value.span_context.trace_id().to_string(),
            span_id: value.span_context.span_id().to_string(),
            parent_span_id: Some(value.parent_span_id.to_string())
                .filter(|_| value.parent_span_id != SpanId::INVALID)
                .unwrap_or_default(),
            name: &value.name,
            scope: ScopeDocument {
                name: value.instrumentation_scope.name(),
                version: value.instrumentation_scope.version(),
            },
            start_time_unix_nano: value.start_time,
            start_time: value.start_time,
            end_time_unix_nano: value.end_time,
            end_time: value.end_time,
            attributes: AttributeMap(&value.attributes),
            events: value.events.iter().map(EventDocument::from).collect(),
            status: StatusDocument::from(&value.status),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScopeDocument<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDocument<'a> {
    name: &'a str,
    #[serde(serialize_with = "as_unix_nano")]
    timestamp_unix_nano: SystemTime,
    #[serde(serialize_with = "as_human_readable")]
    timestamp: SystemTime,
    attributes: AttributeMap<'a>,
}

impl<'a> From<&'a crate::trace::Event> for EventDocument<'a> {
    fn from(value: &'a crate::trace::Event) -> Self {
        EventDocument {
            name: &value.name,
            timestamp_unix_nano: value.timestamp,
            timestamp: value.timestamp,
            attributes: AttributeMap(&value.attributes),
        }
    }
}

/// Attributes render as a JSON object. Key uniqueness in [`SpanData`] makes
/// the mapping loss-free.
#[derive(Debug)]
struct AttributeMap<'a>(&'a [crate::common::KeyValue]);

impl Serialize for AttributeMap<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for kv in self.0 {
            match &kv.value {
                crate::common::Value::Bool(v) => map.serialize_entry(kv.key.as_str(), v)?,
                crate::common::Value::I64(v) => map.serialize_entry(kv.key.as_str(), v)?,
                crate::common::Value::F64(v) => map.serialize_entry(kv.key.as_str(), v)?,
                crate::common::Value::String(v) => {
                    map.serialize_entry(kv.key.as_str(), v.as_str())?
                }
            }
        }
        map.end()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "is_zero")]
    code: u32,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl<'a> From<&'a Status> for StatusDocument<'a> {
    fn from(value: &'a Status) -> Self {
        match value {
            Status::Unset => StatusDocument {
                message: None,
                code: 0,
            },
            Status::Error { description } => StatusDocument {
                message: Some(description),
                code: 1,
            },
            Status::Ok => StatusDocument {
                message: None,
                code: 2,
            },
        }
    }
}

fn as_human_readable<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let duration_since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();

    match Utc.timestamp_opt(
        duration_since_epoch.as_secs() as i64,
        duration_since_epoch.subsec_nanos(),
    ) {
        LocalResult::Single(datetime) => serializer.serialize_str(
            datetime
                .format("%Y-%m-%d %H:%M:%S.%3f")
                .to_string()
                .as_ref(),
        ),
        _ => Err(serde::ser::Error::custom("Invalid Timestamp.")),
    }
}

fn as_unix_nano<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let nanos = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    serializer.serialize_u128(nanos)
}
