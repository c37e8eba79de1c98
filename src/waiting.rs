//! Blocking/Waiting Layer (C4): `put`/`get` with optional timeouts, layered
//! on top of the engine's non-blocking `try_put`/`try_get` via the
//! process-shared mutex and condvars embedded in the segment header.

use std::time::{Duration, Instant};

use crate::engine::{self, GetOutcome, PutOutcome};
use crate::error::{QueueError, Result};
use crate::segment::Segment;
use crate::sync::WaitResult;

/// `None` blocks indefinitely; `Some(Duration::ZERO)` behaves exactly like
/// the non-blocking variant (§4.4: "timeout of zero is equivalent to the
/// non-blocking variant").
pub type Timeout = Option<Duration>;

pub fn put(segment: &Segment, payload: &[u8], timeout: Timeout) -> Result<()> {
    match engine::try_put(segment, payload)? {
        PutOutcome::Enqueued { was_empty } => {
            if was_empty {
                signal_not_empty(segment);
            }
            return Ok(());
        }
        PutOutcome::Full => {}
    }

    if timeout == Some(Duration::ZERO) {
        return Err(QueueError::Full);
    }

    let deadline = timeout.map(|d| Instant::now() + d);
    let header = segment.header();
    let mut guard = header.sync.mutex.lock();

    loop {
        match engine::try_put(segment, payload)? {
            PutOutcome::Enqueued { was_empty } => {
                drop(guard);
                if was_empty {
                    signal_not_empty(segment);
                }
                return Ok(());
            }
            PutOutcome::Full => {}
        }

        let remaining = match deadline {
            None => None,
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    return Err(QueueError::Full);
                }
                Some(d - now)
            }
        };

        guard = match remaining {
            None => header.sync.cond_not_full.wait(guard),
            Some(remaining) => {
                let (guard, outcome) = header.sync.cond_not_full.wait_timeout(guard, remaining);
                if matches!(outcome, WaitResult::TimedOut) {
                    drop(guard);
                    return Err(QueueError::Full);
                }
                guard
            }
        };
    }
}

pub fn get(segment: &Segment, out: &mut [u8], timeout: Timeout) -> Result<()> {
    match engine::try_get(segment, out)? {
        GetOutcome::Dequeued { was_full } => {
            if was_full {
                signal_not_full(segment);
            }
            return Ok(());
        }
        GetOutcome::Empty => {}
    }

    if timeout == Some(Duration::ZERO) {
        return Err(QueueError::Empty);
    }

    let deadline = timeout.map(|d| Instant::now() + d);
    let header = segment.header();
    let mut guard = header.sync.mutex.lock();

    loop {
        match engine::try_get(segment, out)? {
            GetOutcome::Dequeued { was_full } => {
                drop(guard);
                if was_full {
                    signal_not_full(segment);
                }
                return Ok(());
            }
            GetOutcome::Empty => {}
        }

        let remaining = match deadline {
            None => None,
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    return Err(QueueError::Empty);
                }
                Some(d - now)
            }
        };

        guard = match remaining {
            None => header.sync.cond_not_empty.wait(guard),
            Some(remaining) => {
                let (guard, outcome) = header.sync.cond_not_empty.wait_timeout(guard, remaining);
                if matches!(outcome, WaitResult::TimedOut) {
                    drop(guard);
                    return Err(QueueError::Empty);
                }
                guard
            }
        };
    }
}

fn signal_not_empty(segment: &Segment) {
    let header = segment.header();
    let _guard = header.sync.mutex.lock();
    header.sync.cond_not_empty.notify_all();
}

fn signal_not_full(segment: &Segment) {
    let header = segment.header();
    let _guard = header.sync.mutex.lock();
    header.sync.cond_not_full.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn unique_name(tag: &str) -> String {
        format!("/ringshm-test-waiting-{tag}-{}", std::process::id())
    }

    #[test]
    fn zero_timeout_on_full_queue_returns_full_immediately() {
        let name = unique_name("zero-full");
        let _ = Segment::unlink(&name);
        let seg = Segment::create(&name, Some(1), Some(2)).unwrap();

        put(&seg, &[1], None).unwrap();
        put(&seg, &[2], None).unwrap();
        let err = put(&seg, &[3], Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, QueueError::Full));

        drop(seg);
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn zero_timeout_on_empty_queue_returns_empty_immediately() {
        let name = unique_name("zero-empty");
        let _ = Segment::unlink(&name);
        let seg = Segment::create(&name, Some(1), Some(2)).unwrap();

        let mut out = [0u8; 1];
        let err = get(&seg, &mut out, Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, QueueError::Empty));

        drop(seg);
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn positive_timeout_expires_on_persistently_full_queue() {
        let name = unique_name("timeout-full");
        let _ = Segment::unlink(&name);
        let seg = Segment::create(&name, Some(1), Some(2)).unwrap();

        put(&seg, &[1], None).unwrap();
        put(&seg, &[2], None).unwrap();
        let start = Instant::now();
        let err = put(&seg, &[3], Some(Duration::from_millis(30))).unwrap_err();
        assert!(matches!(err, QueueError::Full));
        assert!(start.elapsed() >= Duration::from_millis(20));

        drop(seg);
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn blocking_get_wakes_when_another_thread_puts() {
        let name = unique_name("wake");
        let _ = Segment::unlink(&name);
        let seg = Arc::new(Segment::create(&name, Some(1), Some(2)).unwrap());

        let producer = {
            let seg = seg.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                put(&seg, &[42], None).unwrap();
            })
        };

        let mut out = [0u8; 1];
        get(&seg, &mut out, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(out[0], 42);

        producer.join().unwrap();
        drop(seg);
        let _ = Segment::unlink(&name);
    }
}
