//! Handle API (C5): the per-process object returned by `Queue::create` or
//! `Queue::open`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::engine::{self, GetOutcome, PutOutcome};
use crate::error::{QueueError, Result};
use crate::insights;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::segment::Segment;
use crate::waiting::{self, Timeout};

/// A handle onto a named shared-memory queue. Multiple handles, in the
/// same process or across processes, may refer to the same segment; they
/// observe each other's state through the segment header.
pub struct Queue {
    segment: Segment,
    metrics: Metrics,
    /// Set once an integrity error is observed (§7: "the handle is marked
    /// poisoned and further operations fail"). Checked before every
    /// operation; never cleared.
    poisoned: AtomicBool,
    closed: AtomicBool,
}

impl Queue {
    /// Creates a brand-new named queue. See `Segment::create` for the
    /// argument contract (power-of-two capacity, non-omittable sizes, …).
    pub fn create(name: &str, element_size: Option<i64>, capacity: Option<i64>) -> Result<Self> {
        let segment = Segment::create(name, element_size, capacity)?;
        Ok(Self {
            segment,
            metrics: Metrics::new(),
            poisoned: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Attaches to an existing named queue.
    pub fn open(name: &str) -> Result<Self> {
        let segment = Segment::open(name)?;
        Ok(Self {
            segment,
            metrics: Metrics::new(),
            poisoned: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    fn guard_usable(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::invalid_argument("queue handle is closed"));
        }
        if self.poisoned.load(Ordering::Acquire) {
            return Err(QueueError::ChecksumOrVersionMismatch {
                name: self.segment.name().to_string(),
                reason: "handle is poisoned by a prior integrity error".to_string(),
            });
        }
        Ok(())
    }

    fn poison(&self, reason: &str) {
        self.poisoned.store(true, Ordering::Release);
        insights::record_poisoned(self.segment.name(), reason);
    }

    /// Blocking enqueue. `timeout=None` waits indefinitely; `Some(d)`
    /// surfaces *Full* once `d` elapses without success.
    pub fn put(&self, item: &[u8], timeout: Timeout) -> Result<()> {
        self.guard_usable()?;
        insights::record_put(item.len());
        let result = waiting::put(&self.segment, item, timeout);
        match &result {
            Ok(()) => self.metrics.record_put(item.len() as u64),
            Err(QueueError::Full) => {
                self.metrics.record_full();
                insights::record_full(self.segment.name());
            }
            Err(QueueError::ChecksumOrVersionMismatch { reason, .. }) => self.poison(reason),
            Err(_) => {}
        }
        result
    }

    /// Blocking dequeue. Returns the next item's bytes in FIFO order.
    pub fn get(&self, timeout: Timeout) -> Result<Vec<u8>> {
        self.guard_usable()?;
        let mut buf = vec![0u8; self.segment.element_size()];
        insights::record_get(buf.len());
        let result = waiting::get(&self.segment, &mut buf, timeout);
        match &result {
            Ok(()) => self.metrics.record_get(buf.len() as u64),
            Err(QueueError::Empty) => {
                self.metrics.record_empty();
                insights::record_empty(self.segment.name());
            }
            Err(QueueError::ChecksumOrVersionMismatch { reason, .. }) => self.poison(reason),
            Err(_) => {}
        }
        result.map(|()| buf)
    }

    /// Non-blocking enqueue; equivalent to `put(item, Some(Duration::ZERO))`.
    pub fn put_nowait(&self, item: &[u8]) -> Result<()> {
        self.put(item, Some(Duration::ZERO))
    }

    /// Non-blocking dequeue; equivalent to `get(Some(Duration::ZERO))`.
    pub fn get_nowait(&self) -> Result<Vec<u8>> {
        self.get(Some(Duration::ZERO))
    }

    /// Best-effort snapshot of the current item count.
    pub fn len(&self) -> usize {
        engine::len(self.segment.header())
    }

    pub fn is_empty(&self) -> bool {
        engine::is_empty(self.segment.header())
    }

    pub fn is_full(&self) -> bool {
        engine::is_full(self.segment.header(), self.segment.capacity())
    }

    /// Configured payload size in bytes.
    pub fn element_size(&self) -> usize {
        self.segment.element_size()
    }

    /// Configured slot count; fixed at creation (§9: `maxsize == capacity`).
    pub fn maxsize(&self) -> usize {
        self.segment.capacity()
    }

    pub fn name(&self) -> &str {
        self.segment.name()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Unmaps the local view. Never destroys the segment; subsequent
    /// operations on this handle fail. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Truthiness: a queue is "truthy" iff non-empty, matching the Python
/// source's `__bool__`/`__len__` convention (§4.5).
impl From<&Queue> for bool {
    fn from(queue: &Queue) -> bool {
        !queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/ringshm-test-queue-{tag}-{}", std::process::id())
    }

    #[test]
    fn fresh_queue_reports_expected_attributes() {
        let name = unique_name("attrs");
        let _ = Segment::unlink(&name);
        let q = Queue::create(&name, Some(8), Some(4)).unwrap();

        assert_eq!(q.len(), 0);
        assert!(q.is_empty());
        assert!(!q.is_full());
        assert_eq!(q.element_size(), 8);
        assert_eq!(q.maxsize(), 4);
        assert!(!bool::from(&q));

        q.close();
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn put_then_get_round_trips() {
        let name = unique_name("roundtrip");
        let _ = Segment::unlink(&name);
        let q = Queue::create(&name, Some(4), Some(4)).unwrap();

        q.put_nowait(&[1, 2, 3, 4]).unwrap();
        assert!(bool::from(&q));
        let item = q.get_nowait().unwrap();
        assert_eq!(item, vec![1, 2, 3, 4]);

        q.close();
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn put_nowait_raises_full_after_capacity_reached() {
        let name = unique_name("full");
        let _ = Segment::unlink(&name);
        let q = Queue::create(&name, Some(1), Some(4)).unwrap();

        for _ in 0..4 {
            q.put_nowait(&[9]).unwrap();
        }
        let err = q.put_nowait(&[9]).unwrap_err();
        assert!(matches!(err, QueueError::Full));
        assert_eq!(q.len(), 4);
        assert!(q.is_full());

        q.close();
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn get_nowait_raises_empty_on_fresh_queue() {
        let name = unique_name("fresh-empty");
        let _ = Segment::unlink(&name);
        let q = Queue::create(&name, Some(1), Some(2)).unwrap();

        let err = q.get_nowait().unwrap_err();
        assert!(matches!(err, QueueError::Empty));

        q.close();
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn second_handle_observes_identical_state() {
        let name = unique_name("second-handle");
        let _ = Segment::unlink(&name);
        let first = Queue::create(&name, Some(4), Some(8)).unwrap();
        first.put_nowait(&[1, 2, 3, 4]).unwrap();

        let second = Queue::open(&name).unwrap();
        assert_eq!(second.len(), first.len());
        assert_eq!(second.element_size(), first.element_size());
        assert_eq!(second.maxsize(), first.maxsize());
        assert_eq!(second.is_empty(), first.is_empty());
        assert_eq!(second.is_full(), first.is_full());

        first.close();
        second.close();
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn recreating_an_existing_name_leaves_original_untouched() {
        let name = unique_name("recreate");
        let _ = Segment::unlink(&name);
        let original = Queue::create(&name, Some(1), Some(2)).unwrap();
        original.put_nowait(&[1]).unwrap();

        let err = Queue::create(&name, Some(1), Some(2)).unwrap_err();
        assert!(matches!(err, QueueError::AlreadyExists { .. }));

        assert_eq!(original.len(), 1);
        assert_eq!(original.get_nowait().unwrap(), vec![1]);

        original.close();
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn closed_handle_rejects_further_operations() {
        let name = unique_name("closed");
        let _ = Segment::unlink(&name);
        let q = Queue::create(&name, Some(1), Some(2)).unwrap();
        q.close();

        let err = q.put_nowait(&[1]).unwrap_err();
        assert!(matches!(err, QueueError::InvalidArgument { .. }));

        let _ = Segment::unlink(&name);
    }
}
