//! Observability spans for the queue's hot paths. Zero-cost when the
//! `tracing` feature is disabled, the same way `kaos::insights` is.

#[cfg(feature = "tracing")]
#[inline]
pub fn record_put(bytes: usize) {
    let _span = tracing::trace_span!("put", bytes).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_put(_bytes: usize) {}

#[cfg(feature = "tracing")]
#[inline]
pub fn record_get(bytes: usize) {
    let _span = tracing::trace_span!("get", bytes).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_get(_bytes: usize) {}

/// The non-blocking path observed *Full*; surfaced at `warn` level since
/// sustained backpressure usually means the consumer side is stuck.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_full(name: &str) {
    let _span = tracing::warn_span!("queue_full", name).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_full(_name: &str) {}

#[cfg(feature = "tracing")]
#[inline]
pub fn record_empty(name: &str) {
    let _span = tracing::debug_span!("queue_empty", name).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_empty(_name: &str) {}

/// Raised once when a handle observes a magic/version mismatch and marks
/// itself poisoned (§7: "integrity errors are fatal").
#[cfg(feature = "tracing")]
pub fn record_poisoned(name: &str, reason: &str) {
    tracing::error!(name, reason, "segment integrity check failed, handle poisoned");
}

#[cfg(not(feature = "tracing"))]
pub fn record_poisoned(_name: &str, _reason: &str) {}
