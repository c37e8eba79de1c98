//! Configuration surface for creating or opening a queue, in the spirit
//! of `kaos::disruptor::RingBufferConfig`: a validated builder that
//! `Queue::create`/`Queue::open` can be driven from instead of raw
//! positional arguments.

use crate::error::{QueueError, Result};
use crate::queue::Queue;

/// Validated parameters for creating a new named queue. Validation
/// happens at `element_size`/`capacity`/`with_*` call time so a caller
/// gets the same error categories (`InvalidArgument`, `NegativeSize`)
/// whether they go through `QueueConfig` or `Queue::create` directly.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    name: String,
    element_size: Option<i64>,
    capacity: Option<i64>,
}

impl QueueConfig {
    /// Starts a config for the named segment. Neither `element_size` nor
    /// `capacity` is set yet; both are required before `create()` if the
    /// segment doesn't already exist.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), element_size: None, capacity: None }
    }

    pub fn with_element_size(mut self, element_size: i64) -> Result<Self> {
        if element_size < 0 {
            return Err(QueueError::negative_size("element_size", element_size));
        }
        if element_size == 0 {
            return Err(QueueError::invalid_argument("element_size must be greater than zero"));
        }
        self.element_size = Some(element_size);
        Ok(self)
    }

    pub fn with_capacity(mut self, capacity: i64) -> Result<Self> {
        if capacity < 0 {
            return Err(QueueError::negative_size("capacity", capacity));
        }
        if capacity < 2 || !(capacity as u64).is_power_of_two() {
            return Err(QueueError::invalid_argument("capacity must be a power of two"));
        }
        self.capacity = Some(capacity);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a new segment from this configuration.
    pub fn create(self) -> Result<Queue> {
        Queue::create(&self.name, self.element_size, self.capacity)
    }

    /// Opens an existing segment by name; `element_size`/`capacity` set
    /// on this config (if any) are ignored since they're read from the
    /// segment's own header.
    pub fn open(self) -> Result<Queue> {
        Queue::open(&self.name)
    }
}
