//! Process-shared mutex and condition variables backing the Blocking /
//! Waiting Layer (C4).
//!
//! These wrap raw `libc` pthread primitives configured with
//! `PTHREAD_PROCESS_SHARED` so that the mutex and condvars stored inside the
//! segment header (`layout::Header::sync`) can be locked and waited on from
//! any process that has the segment mapped, not just the one that created
//! it. The ring-buffer engine itself (`engine.rs`) never touches these; they
//! exist only for the blocking `put`/`get` slow path.

use std::cell::UnsafeCell;
use std::io;
use std::time::Duration;

/// A `pthread_mutex_t` made process-shared at initialization time.
#[repr(transparent)]
pub struct RawMutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

unsafe impl Send for RawMutex {}
unsafe impl Sync for RawMutex {}

impl RawMutex {
    /// # Safety
    /// `ptr` must point to valid, writable memory for a `RawMutex` that no
    /// other thread or process is concurrently initializing or using.
    /// Called exactly once, by the segment creator.
    pub unsafe fn init_in_place(ptr: *mut Self) -> io::Result<()> {
        let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
        check(libc::pthread_mutexattr_init(&mut attr))?;
        check(libc::pthread_mutexattr_setpshared(
            &mut attr,
            libc::PTHREAD_PROCESS_SHARED,
        ))?;
        let mutex_ptr = UnsafeCell::raw_get(std::ptr::addr_of!((*ptr).inner));
        let res = check(libc::pthread_mutex_init(mutex_ptr, &attr));
        libc::pthread_mutexattr_destroy(&mut attr);
        res
    }

    pub fn lock(&self) -> MutexGuard<'_> {
        unsafe {
            let rc = libc::pthread_mutex_lock(self.inner.get());
            debug_assert_eq!(rc, 0, "pthread_mutex_lock failed: {rc}");
        }
        MutexGuard { mutex: self }
    }

    fn raw(&self) -> *mut libc::pthread_mutex_t {
        self.inner.get()
    }
}

pub struct MutexGuard<'a> {
    mutex: &'a RawMutex,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            let rc = libc::pthread_mutex_unlock(self.mutex.raw());
            debug_assert_eq!(rc, 0, "pthread_mutex_unlock failed: {rc}");
        }
    }
}

/// A `pthread_cond_t` made process-shared at initialization time.
#[repr(transparent)]
pub struct RawCondvar {
    inner: UnsafeCell<libc::pthread_cond_t>,
}

unsafe impl Send for RawCondvar {}
unsafe impl Sync for RawCondvar {}

pub enum WaitResult {
    Woken,
    TimedOut,
}

impl RawCondvar {
    /// # Safety
    /// Same contract as [`RawMutex::init_in_place`].
    pub unsafe fn init_in_place(ptr: *mut Self) -> io::Result<()> {
        let mut attr: libc::pthread_condattr_t = std::mem::zeroed();
        check(libc::pthread_condattr_init(&mut attr))?;
        check(libc::pthread_condattr_setpshared(
            &mut attr,
            libc::PTHREAD_PROCESS_SHARED,
        ))?;
        let cond_ptr = UnsafeCell::raw_get(std::ptr::addr_of!((*ptr).inner));
        let res = check(libc::pthread_cond_init(cond_ptr, &attr));
        libc::pthread_condattr_destroy(&mut attr);
        res
    }

    /// Wait until signalled. The mutex is released while waiting and
    /// reacquired before returning, per pthread_cond_wait semantics.
    pub fn wait<'a>(&self, guard: MutexGuard<'a>) -> MutexGuard<'a> {
        unsafe {
            let rc = libc::pthread_cond_wait(self.inner.get(), guard.mutex.raw());
            debug_assert_eq!(rc, 0, "pthread_cond_wait failed: {rc}");
        }
        guard
    }

    /// Wait until signalled or `timeout` elapses, whichever comes first.
    pub fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a>,
        timeout: Duration,
    ) -> (MutexGuard<'a>, WaitResult) {
        let deadline = absolute_deadline(timeout);
        let rc = unsafe { libc::pthread_cond_timedwait(self.inner.get(), guard.mutex.raw(), &deadline) };
        let outcome = if rc == 0 {
            WaitResult::Woken
        } else {
            debug_assert_eq!(rc, libc::ETIMEDOUT, "pthread_cond_timedwait failed: {rc}");
            WaitResult::TimedOut
        };
        (guard, outcome)
    }

    pub fn notify_one(&self) {
        unsafe {
            libc::pthread_cond_signal(self.inner.get());
        }
    }

    pub fn notify_all(&self) {
        unsafe {
            libc::pthread_cond_broadcast(self.inner.get());
        }
    }
}

/// The block embedded in the segment header: one mutex plus the two
/// condvars described in §3 ("mutex, cond_not_full, cond_not_empty").
#[repr(C)]
pub struct SyncBlock {
    pub mutex: RawMutex,
    pub cond_not_full: RawCondvar,
    pub cond_not_empty: RawCondvar,
}

impl SyncBlock {
    /// # Safety
    /// Same contract as [`RawMutex::init_in_place`]; called once by the
    /// segment creator before the header's `magic` is published.
    pub unsafe fn init_in_place(ptr: *mut Self) -> io::Result<()> {
        RawMutex::init_in_place(std::ptr::addr_of_mut!((*ptr).mutex))?;
        RawCondvar::init_in_place(std::ptr::addr_of_mut!((*ptr).cond_not_full))?;
        RawCondvar::init_in_place(std::ptr::addr_of_mut!((*ptr).cond_not_empty))?;
        Ok(())
    }
}

fn absolute_deadline(timeout: Duration) -> libc::timespec {
    let mut now = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    unsafe {
        libc::clock_gettime(libc::CLOCK_REALTIME, &mut now);
    }
    let mut sec = now.tv_sec + timeout.as_secs() as i64;
    let mut nsec = now.tv_nsec + timeout.subsec_nanos() as i64;
    if nsec >= 1_000_000_000 {
        sec += 1;
        nsec -= 1_000_000_000;
    }
    libc::timespec { tv_sec: sec, tv_nsec: nsec }
}

fn check(rc: i32) -> io::Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rc))
    }
}
