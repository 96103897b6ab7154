//! Fixed-size record pool.
//!
//! [`RecordPool`] pairs a typed header per slot with an opaque byte payload
//! of `record_size` bytes. Payloads live contiguously in one `Vec<u8>` at
//! `index * record_size`, and are zero-filled on every allocation.

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::handle::SlotHandle;
use crate::pool::Pool;

/// Pool of `(header, [u8; record_size])` records.
#[derive(Debug)]
pub struct RecordPool<H> {
    headers: Pool<H>,
    bytes: Vec<u8>,
    record_size: usize,
}

impl<H> RecordPool<H> {
    /// Create a record pool. `record_size` must be non-zero.
    pub fn new(config: PoolConfig, record_size: usize) -> Result<Self, PoolError> {
        if record_size == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "record size must be at least 1 byte".into(),
            });
        }
        let headers = Pool::new(config)?;
        let total = byte_len(headers.capacity(), record_size)?;
        Ok(Self {
            headers,
            bytes: vec![0; total],
            record_size,
        })
    }

    /// Allocate a record with the given header and a zeroed payload.
    pub fn allocate(&mut self, header: H) -> Result<SlotHandle, PoolError> {
        let handle = self.headers.allocate(header)?;
        let needed = match byte_len(self.headers.capacity(), self.record_size) {
            Ok(needed) => needed,
            Err(err) => {
                self.headers.free(handle)?;
                return Err(err);
            }
        };
        if self.bytes.len() < needed {
            self.bytes.resize(needed, 0);
        }
        let range = self.range(handle);
        self.bytes[range].fill(0);
        Ok(handle)
    }

    /// Release a record, zero its payload, and return its header.
    pub fn free(&mut self, handle: SlotHandle) -> Result<H, PoolError> {
        let header = self.headers.free(handle)?;
        let range = self.range(handle);
        self.bytes[range].fill(0);
        Ok(header)
    }

    fn range(&self, handle: SlotHandle) -> std::ops::Range<usize> {
        let start = handle.index() as usize * self.record_size;
        start..start + self.record_size
    }

    /// Header of a live record.
    pub fn header(&self, handle: SlotHandle) -> Option<&H> {
        self.headers.get(handle)
    }

    /// Mutable header of a live record.
    pub fn header_mut(&mut self, handle: SlotHandle) -> Option<&mut H> {
        self.headers.get_mut(handle)
    }

    /// Header of a live record, or the reason the handle is unusable.
    pub fn try_header(&self, handle: SlotHandle) -> Result<&H, PoolError> {
        self.headers.try_get(handle)
    }

    /// Mutable header of a live record, or the reason the handle is unusable.
    pub fn try_header_mut(&mut self, handle: SlotHandle) -> Result<&mut H, PoolError> {
        self.headers.try_get_mut(handle)
    }

    /// Payload bytes of a live record.
    pub fn payload(&self, handle: SlotHandle) -> Result<&[u8], PoolError> {
        self.headers.validate(handle)?;
        Ok(&self.bytes[self.range(handle)])
    }

    /// Mutable payload bytes of a live record.
    pub fn payload_mut(&mut self, handle: SlotHandle) -> Result<&mut [u8], PoolError> {
        self.headers.validate(handle)?;
        let range = self.range(handle);
        Ok(&mut self.bytes[range])
    }

    /// Header and payload of a live record, borrowed together.
    pub fn record_mut(&mut self, handle: SlotHandle) -> Result<(&mut H, &mut [u8]), PoolError> {
        let range = self.range(handle);
        let header = self.headers.try_get_mut(handle)?;
        Ok((header, &mut self.bytes[range]))
    }

    /// Validate a handle, returning the precise reason it is unusable.
    pub fn validate(&self, handle: SlotHandle) -> Result<(), PoolError> {
        self.headers.validate(handle)
    }

    /// Whether `handle` refers to a live record.
    pub fn contains(&self, handle: SlotHandle) -> bool {
        self.headers.contains(handle)
    }

    /// The next live record after `cursor` in slot order.
    pub fn next(&self, cursor: Option<SlotHandle>) -> Option<SlotHandle> {
        self.headers.next(cursor)
    }

    /// Iterate over live records' headers in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &H)> {
        self.headers.iter()
    }

    /// Free every record and zero all payload bytes.
    pub fn clear(&mut self) -> usize {
        self.bytes.fill(0);
        self.headers.clear()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether no record is live.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Total number of record slots.
    pub fn capacity(&self) -> usize {
        self.headers.capacity()
    }

    /// Payload size of every record, in bytes.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        self.headers.config()
    }

    /// Memory usage of headers and payloads in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.headers.memory_bytes() + self.bytes.len()
    }
}

/// Bytes of payload storage for `capacity` records.
fn byte_len(capacity: usize, record_size: usize) -> Result<usize, PoolError> {
    capacity
        .checked_mul(record_size)
        .ok_or_else(|| PoolError::InvalidConfig {
            reason: format!("{capacity} records of {record_size} bytes overflow usize"),
        })
}
