//! Segment Manager (C1): create, open, map, unmap, and unlink a named
//! POSIX shared memory segment.

use std::ffi::CString;
use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;

use crate::constants::{MAGIC, MIN_CAPACITY, VERSION};
use crate::error::{QueueError, Result};
use crate::layout::{self, Header};
use crate::sync::SyncBlock;

/// How long `Segment::open` spins before falling back to yielding while it
/// waits for the creator to publish `magic` (§4.1: "bounded spin + yield").
const OPEN_SPIN_BUDGET: Duration = Duration::from_millis(500);

/// An attached view of a named shared memory segment: the mapping plus
/// enough metadata to address slots without re-reading the header's atomics
/// on every call. Owned exclusively by one `Handle` (C5); never cloned.
pub struct Segment {
    base: *mut u8,
    len: usize,
    element_size: usize,
    capacity: usize,
    mask: u64,
    name: String,
    /// Whether this handle created the segment. Only informational; `close`
    /// behaves identically for creators and openers (§9: close never
    /// unlinks).
    is_creator: bool,
}

unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

fn shm_name(name: &str) -> Result<CString> {
    let full = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    };
    CString::new(full).map_err(|_| QueueError::invalid_argument("name must not contain NUL bytes"))
}

fn validate_create_args(element_size: Option<i64>, capacity: Option<i64>) -> Result<(usize, usize)> {
    let element_size = element_size
        .ok_or_else(|| QueueError::invalid_argument("element_size is required when create=true"))?;
    let capacity =
        capacity.ok_or_else(|| QueueError::invalid_argument("capacity is required when create=true"))?;

    if element_size < 0 {
        return Err(QueueError::negative_size("element_size", element_size));
    }
    if capacity < 0 {
        return Err(QueueError::negative_size("capacity", capacity));
    }
    let element_size = element_size as usize;
    let capacity = capacity as usize;

    if element_size == 0 {
        return Err(QueueError::invalid_argument("element_size must be greater than zero"));
    }
    if capacity < MIN_CAPACITY || !capacity.is_power_of_two() {
        return Err(QueueError::invalid_argument("capacity must be a power of two"));
    }
    Ok((element_size, capacity))
}

impl Segment {
    /// Creates a brand new named segment. Fails with `AlreadyExists` if the
    /// name is already taken, leaving the existing segment untouched.
    pub fn create(name: &str, element_size: Option<i64>, capacity: Option<i64>) -> Result<Self> {
        let (element_size, capacity) = validate_create_args(element_size, capacity)?;
        let c_name = shm_name(name)?;

        let fd = shm_open(
            c_name.as_c_str(),
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|errno| {
            if errno == nix::errno::Errno::EEXIST {
                QueueError::AlreadyExists { name: name.to_string() }
            } else {
                QueueError::Io(std::io::Error::from(errno))
            }
        })?;

        let len = layout::segment_bytes(element_size, capacity);
        if let Err(errno) = ftruncate(&fd, len as i64) {
            let _ = shm_unlink(c_name.as_c_str());
            return Err(QueueError::Io(std::io::Error::from(errno)));
        }

        let base = unsafe {
            mmap(
                None,
                NonZeroUsize::new(len).expect("segment length is always > 0"),
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|errno| {
            let _ = shm_unlink(c_name.as_c_str());
            QueueError::Io(std::io::Error::from(errno))
        })?
        .as_ptr() as *mut u8;
        // `fd` closes here; the mapping stays valid, matching the
        // create-then-close-fd convention used throughout the pack.
        drop(fd);

        unsafe {
            Self::init_header(base, element_size, capacity)?;
        }

        tracing_created(name, element_size, capacity);

        Ok(Self {
            base,
            len,
            element_size,
            capacity,
            mask: (capacity - 1) as u64,
            name: name.to_string(),
            is_creator: true,
        })
    }

    /// Attaches to an existing segment by name.
    pub fn open(name: &str) -> Result<Self> {
        let c_name = shm_name(name)?;

        let fd = shm_open(c_name.as_c_str(), OFlag::O_RDWR, Mode::empty()).map_err(|errno| {
            if errno == nix::errno::Errno::ENOENT {
                QueueError::NotFound { name: name.to_string() }
            } else {
                QueueError::Io(std::io::Error::from(errno))
            }
        })?;

        // The header is the only part of the segment whose size is known
        // before the header itself is read, so map it first, read
        // capacity/element_size, then the full mapping's size is already
        // implied — the file was sized by the creator and ftruncate never
        // shrinks, so a second mmap isn't needed; the header's fields
        // suffice to interpret the rest of the same mapping.
        let header_len = layout::header_bytes();
        let probe = unsafe {
            mmap(
                None,
                NonZeroUsize::new(header_len).expect("header is non-empty"),
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|errno| QueueError::Io(std::io::Error::from(errno)))?
        .as_ptr() as *mut u8;

        let deadline = Instant::now() + OPEN_SPIN_BUDGET;
        let magic = loop {
            let magic = unsafe { layout::header(probe) }.magic.load(Ordering::Acquire);
            if magic != 0 {
                break magic;
            }
            if Instant::now() >= deadline {
                unsafe { let _ = munmap(std::ptr::NonNull::new_unchecked(probe as *mut _), header_len); }
                return Err(QueueError::ChecksumOrVersionMismatch {
                    name: name.to_string(),
                    reason: "segment was never fully initialized by its creator".to_string(),
                });
            }
            std::thread::yield_now();
        };

        if magic != MAGIC {
            unsafe { let _ = munmap(std::ptr::NonNull::new_unchecked(probe as *mut _), header_len); }
            return Err(QueueError::ChecksumOrVersionMismatch {
                name: name.to_string(),
                reason: format!("bad magic: expected {MAGIC:#x}, found {magic:#x}"),
            });
        }

        let header = unsafe { layout::header(probe) };
        let version = header.version.load(Ordering::Acquire);
        if version != VERSION {
            unsafe { let _ = munmap(std::ptr::NonNull::new_unchecked(probe as *mut _), header_len); }
            return Err(QueueError::ChecksumOrVersionMismatch {
                name: name.to_string(),
                reason: format!("version mismatch: expected {VERSION}, found {version}"),
            });
        }

        let element_size = header.element_size();
        let capacity = header.capacity();
        let mask = header.mask();
        unsafe {
            let _ = munmap(std::ptr::NonNull::new_unchecked(probe as *mut _), header_len);
        }

        let len = layout::segment_bytes(element_size, capacity);
        let base = unsafe {
            mmap(
                None,
                NonZeroUsize::new(len).expect("segment length is always > 0"),
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|errno| QueueError::Io(std::io::Error::from(errno)))?
        .as_ptr() as *mut u8;

        Ok(Self {
            base,
            len,
            element_size,
            capacity,
            mask,
            name: name.to_string(),
            is_creator: false,
        })
    }

    /// # Safety
    /// `base` must be a fresh, zero-filled mapping of at least
    /// `segment_bytes(element_size, capacity)` bytes that no other thread
    /// can observe yet.
    unsafe fn init_header(base: *mut u8, element_size: usize, capacity: usize) -> Result<()> {
        let header_ptr = base as *mut Header;

        SyncBlock::init_in_place(std::ptr::addr_of_mut!((*header_ptr).sync))?;

        (*header_ptr).version.store(VERSION, Ordering::Relaxed);
        (*header_ptr).element_size.store(element_size as u32, Ordering::Relaxed);
        (*header_ptr).capacity.store(capacity as u32, Ordering::Relaxed);
        (*header_ptr).mask.store((capacity - 1) as u32, Ordering::Relaxed);
        (*header_ptr).producer_cursor().store(0, Ordering::Relaxed);
        (*header_ptr).consumer_cursor().store(0, Ordering::Relaxed);

        for i in 0..capacity as u64 {
            let seq = layout::slot_sequence(base, element_size, (capacity - 1) as u64, i);
            seq.store(i, Ordering::Relaxed);
        }

        // Publish last: any opener that sees a nonzero magic is guaranteed
        // to see every store above, by the release/acquire pairing in
        // `Segment::open`.
        (*header_ptr).magic.store(MAGIC, Ordering::Release);
        Ok(())
    }

    pub fn header(&self) -> &Header {
        unsafe { layout::header(self.base) }
    }

    pub fn base(&self) -> *mut u8 {
        self.base
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_creator(&self) -> bool {
        self.is_creator
    }

    /// Removes the segment's name from the filesystem namespace. Existing
    /// mappings (this one included) stay valid until unmapped.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = shm_name(name)?;
        shm_unlink(c_name.as_c_str()).map_err(|errno| {
            if errno == nix::errno::Errno::ENOENT {
                QueueError::NotFound { name: name.to_string() }
            } else {
                QueueError::Io(std::io::Error::from(errno))
            }
        })
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        unsafe {
            if let Some(ptr) = std::ptr::NonNull::new(self.base as *mut _) {
                let _ = munmap(ptr, self.len);
            }
        }
    }
}

#[cfg(feature = "tracing")]
fn tracing_created(name: &str, element_size: usize, capacity: usize) {
    tracing::debug!(name, element_size, capacity, "shared memory segment created");
}

#[cfg(not(feature = "tracing"))]
fn tracing_created(_name: &str, _element_size: usize, _capacity: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/ringshm-test-{tag}-{}", std::process::id())
    }

    #[test]
    fn create_then_open_agree_on_layout() {
        let name = unique_name("create-open");
        let _ = Segment::unlink(&name);

        let created = Segment::create(&name, Some(8), Some(4)).unwrap();
        assert_eq!(created.element_size(), 8);
        assert_eq!(created.capacity(), 4);

        let opened = Segment::open(&name).unwrap();
        assert_eq!(opened.element_size(), 8);
        assert_eq!(opened.capacity(), 4);
        assert_eq!(opened.mask(), 3);

        drop(created);
        drop(opened);
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn create_rejects_duplicate_name() {
        let name = unique_name("dup");
        let _ = Segment::unlink(&name);
        let first = Segment::create(&name, Some(4), Some(2)).unwrap();

        let second = Segment::create(&name, Some(4), Some(2));
        assert!(matches!(second, Err(QueueError::AlreadyExists { .. })));

        drop(first);
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn open_rejects_missing_name() {
        let name = unique_name("missing");
        let _ = Segment::unlink(&name);
        let err = Segment::open(&name).unwrap_err();
        assert!(matches!(err, QueueError::NotFound { .. }));
        assert!(err.to_string().contains("Failed to open shared memory"));
    }

    #[test]
    fn create_rejects_non_power_of_two_capacity() {
        let name = unique_name("pow2");
        let _ = Segment::unlink(&name);
        let err = Segment::create(&name, Some(4), Some(3)).unwrap_err();
        assert!(err.to_string().contains("must be a power of two"));
    }

    #[test]
    fn create_rejects_negative_sizes() {
        let name = unique_name("neg");
        let _ = Segment::unlink(&name);
        let err = Segment::create(&name, Some(-4), Some(2)).unwrap_err();
        assert!(matches!(err, QueueError::NegativeSize { .. }));
    }

    #[test]
    fn create_requires_element_size_and_capacity() {
        let name = unique_name("missing-args");
        let _ = Segment::unlink(&name);
        let err = Segment::create(&name, None, Some(2)).unwrap_err();
        assert!(err.to_string().contains("required when create=true"));
    }

    #[test]
    fn header_slot_sequences_start_at_index() {
        let name = unique_name("seq-init");
        let _ = Segment::unlink(&name);
        let seg = Segment::create(&name, Some(4), Some(8)).unwrap();
        for i in 0..8u64 {
            let seq = unsafe { layout::slot_sequence(seg.base(), 4, 7, i) };
            assert_eq!(seq.load(Ordering::Relaxed), i);
        }
        drop(seg);
        let _ = Segment::unlink(&name);
    }

    #[test]
    fn large_segment_allocates_expected_size() {
        let name = unique_name("large");
        let _ = Segment::unlink(&name);
        let element_size = 1024 * 1024;
        let capacity = 1024;
        let seg = Segment::create(&name, Some(element_size), Some(capacity)).unwrap();
        assert_eq!(seg.element_size(), element_size as usize);
        assert_eq!(seg.capacity(), capacity as usize);
        drop(seg);
        let _ = Segment::unlink(&name);
    }
}
