//! Traced arithmetic written to stdout.
//!
//! Run with `cargo run --example arithmetic`. Each finished span is printed
//! as a JSON document by the [`StreamExporter`], batched behind a
//! [`BatchSpanProcessor`], and the provider shutdown at the end of `main`
//! flushes whatever is still buffered.
use tracepipe::trace::{StreamExporter, Tracer, TracerProvider};
use tracepipe::{Context, InstrumentationScope, KeyValue, Resource};

#[derive(Debug, thiserror::Error)]
#[error("bad multiplication")]
struct BadMultiplication;

struct Instrumentron {
    tracer: Tracer,
}

impl Instrumentron {
    fn new(provider: &TracerProvider) -> Self {
        let scope = InstrumentationScope::new("tracepipe/demos/instrumentron").with_version("v0.1.0");
        Instrumentron {
            tracer: provider.tracer_with_scope(scope),
        }
    }

    fn add(&self, cx: &Context, x: i64, y: i64) -> i64 {
        let (_cx, mut span) = self.tracer.start(cx, "Addition");
        span.set_attributes([KeyValue::new("x", x), KeyValue::new("y", y)]);
        span.set_status(tracepipe::trace::Status::Ok);
        span.add_event("hello", vec![]);
        x + y
    }

    fn multiply(&self, cx: &Context, x: i64, y: i64) -> i64 {
        let (_cx, mut span) = self.tracer.start(cx, "Multiplication");
        span.set_attributes([KeyValue::new("x", x), KeyValue::new("y", y)]);
        if y == 10 {
            span.record_error(&BadMultiplication);
        }
        x * y
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Surface the pipeline's own diagnostics on stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let provider = TracerProvider::builder()
        .with_batch_exporter(StreamExporter::default())
        .with_resource(Resource::new("stdout-example", "0.0.1"))
        .build();

    let ops = Instrumentron::new(&provider);
    let cx = Context::new();
    let answer = ops.add(&cx, ops.multiply(&cx, ops.multiply(&cx, 2, 2), 10), 2);
    println!("the answer is {answer}");

    provider.shutdown()?;
    Ok(())
}
