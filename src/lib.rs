//! ringshm: a lock-free bounded FIFO queue over a named POSIX shared
//! memory segment, for same-host inter-process communication of
//! fixed-size binary payloads.
//!
//! Two or more processes open a queue by name; producers `put` and
//! consumers `get` in FIFO order; the hot path is an atomic-sequenced
//! memcpy with no kernel message passing. See [`Queue`] for the handle
//! API.
//!
//! ```no_run
//! use ringshm::Queue;
//!
//! let q = Queue::create("/demo", Some(8), Some(16))?;
//! q.put_nowait(&[0u8; 8])?;
//! let item = q.get_nowait()?;
//! assert_eq!(item.len(), 8);
//! # Ok::<(), ringshm::QueueError>(())
//! ```

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod insights;
pub mod layout;
pub mod metrics;
pub mod queue;
pub mod segment;
pub mod sync;
pub mod waiting;

pub use config::QueueConfig;
pub use error::{QueueError, Result};
pub use queue::Queue;
pub use waiting::Timeout;

/// Crate format version; matches the header's `version` field written by
/// `Segment::create`.
pub const VERSION: u32 = constants::VERSION;
