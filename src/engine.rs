//! Enqueue/Dequeue Engine (C3): the lock-free CAS retry loop that makes
//! `try_put`/`try_get` linearizable across processes.
//!
//! This is a variant of the sequenced bounded MPMC ring described in
//! `kaos::disruptor::mpmc::MpmcRingBuffer`, adapted to a runtime-sized
//! byte payload instead of a compile-time `RingBufferEntry` type, and to
//! cursors/slot sequences that live in a shared memory mapping rather than
//! process-local atomics.

use std::sync::atomic::Ordering;

use crate::error::{QueueError, Result};
use crate::layout::{self, Header};
use crate::segment::Segment;

/// Outcome of a producer-side state transition, used by the waiting layer
/// (`waiting.rs`) to decide whether to signal `cond_not_empty`.
pub enum PutOutcome {
    Enqueued { was_empty: bool },
    Full,
}

/// Outcome of a consumer-side state transition, used to decide whether to
/// signal `cond_not_full`.
pub enum GetOutcome {
    Dequeued { was_full: bool },
    Empty,
}

/// Attempts to enqueue `payload` without blocking. `payload.len()` must
/// equal `segment.element_size()`.
pub fn try_put(segment: &Segment, payload: &[u8]) -> Result<PutOutcome> {
    if payload.len() != segment.element_size() {
        return Err(QueueError::invalid_argument(format!(
            "payload length {} does not match element_size {}",
            payload.len(),
            segment.element_size()
        )));
    }

    let header = segment.header();
    let mask = segment.mask();
    let base = segment.base();
    let element_size = segment.element_size();

    loop {
        let p = header.producer_cursor().load(Ordering::Acquire);
        let i = p & mask;
        let seq = unsafe { layout::slot_sequence(base, element_size, mask, i) };
        let observed = seq.load(Ordering::Acquire);
        let diff = observed as i64 - p as i64;

        if diff == 0 {
            if header
                .producer_cursor()
                .compare_exchange_weak(p, p.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                continue;
            }

            let was_empty = header.consumer_cursor().load(Ordering::Acquire) == p;

            let data = unsafe { layout::slot_data(base, element_size, mask, i) };
            data.copy_from_slice(payload);
            seq.store(p.wrapping_add(1), Ordering::Release);

            return Ok(PutOutcome::Enqueued { was_empty });
        } else if diff < 0 {
            return Ok(PutOutcome::Full);
        }
        // diff > 0: another producer already advanced past this slot; retry.
    }
}

/// Attempts to dequeue into `out` without blocking. `out.len()` must equal
/// `segment.element_size()`.
pub fn try_get(segment: &Segment, out: &mut [u8]) -> Result<GetOutcome> {
    if out.len() != segment.element_size() {
        return Err(QueueError::invalid_argument(format!(
            "output buffer length {} does not match element_size {}",
            out.len(),
            segment.element_size()
        )));
    }

    let header = segment.header();
    let mask = segment.mask();
    let base = segment.base();
    let element_size = segment.element_size();
    let capacity = segment.capacity() as u64;

    loop {
        let c = header.consumer_cursor().load(Ordering::Acquire);
        let i = c & mask;
        let seq = unsafe { layout::slot_sequence(base, element_size, mask, i) };
        let observed = seq.load(Ordering::Acquire);
        let diff = observed as i64 - (c.wrapping_add(1)) as i64;

        if diff == 0 {
            if header
                .consumer_cursor()
                .compare_exchange_weak(c, c.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                continue;
            }

            let was_full =
                header.producer_cursor().load(Ordering::Acquire).wrapping_sub(c) == capacity;

            let data = unsafe { layout::slot_data(base, element_size, mask, i) };
            out.copy_from_slice(data);
            seq.store(c.wrapping_add(capacity), Ordering::Release);

            return Ok(GetOutcome::Dequeued { was_full });
        } else if diff < 0 {
            return Ok(GetOutcome::Empty);
        }
        // diff > 0: another consumer already advanced past this slot; retry.
    }
}

/// Best-effort snapshot of the number of enqueued items. The two loads are
/// not atomic as a pair, so a concurrent put/get can make this briefly
/// stale; it always stays within `0..=capacity`.
pub fn len(header: &Header) -> usize {
    let p = header.producer_cursor().load(Ordering::Acquire);
    let c = header.consumer_cursor().load(Ordering::Acquire);
    p.wrapping_sub(c) as usize
}

pub fn is_empty(header: &Header) -> bool {
    len(header) == 0
}

pub fn is_full(header: &Header, capacity: usize) -> bool {
    len(header) == capacity
}
