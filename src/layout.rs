//! Ring State (C2): the passive data model stored in the shared segment.
//!
//! A segment is `[Header][slot 0][slot 1]...[slot capacity-1]`. Each slot is
//! `[sequence: u64][data: element_size bytes][padding]`. This module only
//! describes the layout and gives raw-pointer accessors into it; the engine
//! (`engine.rs`) and the waiting layer (`waiting.rs`) are the only callers
//! that read or write through these accessors.

use std::sync::atomic::AtomicU64;

use crate::constants::CACHE_LINE;
use crate::sync::SyncBlock;

/// Wraps a value so it occupies its own cache line, the same trick
/// `kaos::disruptor::completion_tracker::PaddedAtomicU64` uses to keep the
/// producer and consumer cursors from sharing a line.
#[repr(align(64))]
pub struct CacheAligned<T>(pub T);

/// The fixed-size part of the segment, stored at offset 0.
///
/// `producer_cursor` and `consumer_cursor` are each pinned to their own
/// cache line (§3's false-sharing invariant); everything before them is
/// read-mostly metadata written once by the creator.
#[repr(C)]
pub struct Header {
    /// Zero until the creator finishes initializing the rest of the header
    /// and slot array; published last via a release store (§4.1).
    pub magic: AtomicU64,
    pub version: std::sync::atomic::AtomicU32,
    pub element_size: std::sync::atomic::AtomicU32,
    pub capacity: std::sync::atomic::AtomicU32,
    pub mask: std::sync::atomic::AtomicU32,
    pub sync: SyncBlock,
    pub producer_cursor: CacheAligned<AtomicU64>,
    pub consumer_cursor: CacheAligned<AtomicU64>,
}

impl Header {
    pub fn producer_cursor(&self) -> &AtomicU64 {
        &self.producer_cursor.0
    }

    pub fn consumer_cursor(&self) -> &AtomicU64 {
        &self.consumer_cursor.0
    }

    pub fn element_size(&self) -> usize {
        self.element_size.load(std::sync::atomic::Ordering::Relaxed) as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(std::sync::atomic::Ordering::Relaxed) as usize
    }

    pub fn mask(&self) -> u64 {
        self.mask.load(std::sync::atomic::Ordering::Relaxed) as u64
    }
}

/// Size of `Header`, rounded up to a whole number of cache lines so the
/// first slot never shares a line with the sync block.
pub fn header_bytes() -> usize {
    round_up(std::mem::size_of::<Header>(), CACHE_LINE)
}

/// Bytes occupied by one slot: an 8-byte sequence counter plus
/// `element_size` bytes of payload, padded so slots stay aligned and small
/// elements don't false-share a cache line with their neighbor.
pub fn slot_stride(element_size: usize) -> usize {
    let raw = std::mem::size_of::<u64>() + element_size;
    if raw <= CACHE_LINE {
        CACHE_LINE
    } else {
        round_up(raw, std::mem::size_of::<u64>())
    }
}

/// Total segment size for a given element size and capacity.
pub fn segment_bytes(element_size: usize, capacity: usize) -> usize {
    header_bytes() + capacity * slot_stride(element_size)
}

fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

/// # Safety
/// `base` must point to a mapping of at least `header_bytes()` bytes that
/// outlives the returned reference.
pub unsafe fn header<'a>(base: *mut u8) -> &'a Header {
    &*(base as *const Header)
}

fn slot_offset(element_size: usize, mask: u64, cursor: u64) -> usize {
    let idx = (cursor & mask) as usize;
    header_bytes() + idx * slot_stride(element_size)
}

/// # Safety
/// `base` must point to a mapping large enough to hold `capacity` slots of
/// `element_size` bytes, and `cursor & mask` must be in range.
pub unsafe fn slot_sequence<'a>(
    base: *mut u8,
    element_size: usize,
    mask: u64,
    cursor: u64,
) -> &'a AtomicU64 {
    let off = slot_offset(element_size, mask, cursor);
    &*(base.add(off) as *const AtomicU64)
}

/// # Safety
/// Same preconditions as [`slot_sequence`]. Caller must not alias this
/// slice with another live reference into the same slot.
pub unsafe fn slot_data<'a>(
    base: *mut u8,
    element_size: usize,
    mask: u64,
    cursor: u64,
) -> &'a mut [u8] {
    let off = slot_offset(element_size, mask, cursor) + std::mem::size_of::<u64>();
    std::slice::from_raw_parts_mut(base.add(off), element_size)
}
