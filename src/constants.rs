//! Layout constants for ringshm segments.

/// "RNGSHM01" as a little-endian u64.
pub const MAGIC: u64 = 0x3130_4d48_5347_4e52;

/// Header format version. Bumped on any layout-incompatible change.
pub const VERSION: u32 = 1;

/// Cache line size assumed for padding producer/consumer cursors apart.
pub const CACHE_LINE: usize = 64;

/// Minimum capacity accepted by `Segment::create`. A single slot can't
/// distinguish "just written" from "just read" across rounds, so two
/// is the smallest capacity the sequence discipline supports.
pub const MIN_CAPACITY: usize = 2;
