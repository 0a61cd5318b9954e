//! Trace and span id generation.
//!
//! A [`Tracer`] asks its provider's generator for a fresh trace id whenever
//! a root span starts, and for a fresh span id on every start. The default
//! generator draws uniformly random ids; the incrementing one exists so
//! tests can assert on concrete id values.
//!
//! [`Tracer`]: crate::trace::Tracer
use crate::trace::{SpanId, TraceId};
use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of fresh trace and span ids.
///
/// Swapped at provider construction via
/// [`Builder::with_id_generator`](crate::trace::Builder::with_id_generator).
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// A new trace id, requested once per root span.
    fn new_trace_id(&self) -> TraceId;

    /// A new span id, requested for every started span.
    fn new_span_id(&self) -> SpanId;
}

/// The default generator: uniformly random ids.
///
/// Each thread keeps its own small rng seeded from system entropy, so id
/// generation never contends across threads.
#[derive(Clone, Debug, Default)]
pub struct RandomIdGenerator {
    _private: (),
}

impl IdGenerator for RandomIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        CURRENT_RNG.with(|rng| TraceId::from(rng.borrow_mut().gen::<u128>()))
    }

    fn new_span_id(&self) -> SpanId {
        CURRENT_RNG.with(|rng| SpanId::from(rng.borrow_mut().gen::<u64>()))
    }
}

thread_local! {
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_entropy());
}

/// Counter-backed generator for deterministic ids in tests.
///
/// Hands out consecutive integers starting at 1, from one counter shared by
/// trace ids, span ids and all clones, which keeps assertions on
/// parent/child id relationships readable.
#[derive(Clone, Debug)]
pub struct IncrementIdGenerator(Arc<AtomicU64>);

impl IncrementIdGenerator {
    /// Create a generator whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for IncrementIdGenerator {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }
}

impl IdGenerator for IncrementIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        TraceId::from(self.0.fetch_add(1, Ordering::SeqCst) as u128)
    }

    fn new_span_id(&self) -> SpanId {
        SpanId::from(self.0.fetch_add(1, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_generator_counts_from_one() {
        let generator = IncrementIdGenerator::new();
        assert_eq!(generator.new_trace_id(), TraceId::from(1u128));
        assert_eq!(generator.new_span_id(), SpanId::from(2u64));
        assert_eq!(generator.new_span_id(), SpanId::from(3u64));
    }

    #[test]
    fn increment_generator_clones_share_the_counter() {
        let generator = IncrementIdGenerator::new();
        let clone = generator.clone();
        generator.new_span_id();
        assert_eq!(clone.new_span_id(), SpanId::from(2u64));
    }

    #[test]
    fn random_ids_are_valid_and_distinct() {
        let generator = RandomIdGenerator::default();
        let a = generator.new_trace_id();
        let b = generator.new_trace_id();
        assert_ne!(a, TraceId::INVALID);
        assert_ne!(a, b);
        assert_ne!(generator.new_span_id(), SpanId::INVALID);
    }
}
