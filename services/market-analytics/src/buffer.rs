//! Bounded circular buffer for historical market-data series
//!
//! Fixed-capacity, FIFO-evicting store used for sealed candles and any
//! other ordered historical series. Overwrite mode (the default) evicts
//! the oldest element when full; non-overwrite mode surfaces a
//! "buffer full" error instead. All reads and writes go through an
//! internal mutex, so a single buffer instance is safe to share between
//! one writer and concurrent readers.
//!
//! Buffers can be snapshotted for persistence: the snapshot carries
//! capacity, element type tag, mode, the ordered data, size/head/tail
//! metadata, and a SHA-256 checksum, and round-trips exactly through
//! [`CircularBuffer::restore`].

use std::any::type_name;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use types::errors::ConfigError;

/// Items queryable by timestamp range expose their event time.
pub trait Timestamped {
    /// Event timestamp in Unix nanoseconds.
    fn timestamp_nanos(&self) -> i64;
}

/// State errors raised on caller misuse of the buffer contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("buffer empty")]
    Empty,

    #[error("buffer full: capacity {capacity}")]
    Full { capacity: usize },

    #[error("index out of range: {index} (size {size})")]
    IndexOutOfRange { index: i64, size: usize },

    #[error("snapshot rejected: {0}")]
    CorruptSnapshot(String),

    #[error("snapshot serialization failed: {0}")]
    Serialization(String),
}

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    /// Total elements ever appended (serialized as `tail`).
    total_appended: u64,
    /// Total elements ever evicted (serialized as `head`).
    total_evicted: u64,
}

/// Fixed-capacity ring store with FIFO eviction.
#[derive(Debug)]
pub struct CircularBuffer<T> {
    capacity: usize,
    allow_overwrite: bool,
    inner: Mutex<Inner<T>>,
}

impl<T> CircularBuffer<T> {
    /// Create an overwrite-mode buffer.
    ///
    /// # Panics
    /// Panics if `capacity` is zero. Use [`CircularBuffer::try_new`]
    /// where the capacity comes from unvalidated configuration.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be at least 1");
        Self::build(capacity, true)
    }

    /// Create a buffer, failing fast on a zero capacity.
    pub fn try_new(capacity: usize, allow_overwrite: bool) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { value: capacity });
        }
        Ok(Self::build(capacity, allow_overwrite))
    }

    fn build(capacity: usize, allow_overwrite: bool) -> Self {
        Self {
            capacity,
            allow_overwrite,
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                total_appended: 0,
                total_evicted: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item, evicting and returning the oldest element when
    /// full in overwrite mode. Non-overwrite mode returns
    /// [`BufferError::Full`] instead.
    pub fn append(&self, item: T) -> Result<Option<T>, BufferError> {
        let mut inner = self.lock();

        let evicted = if inner.items.len() >= self.capacity {
            if !self.allow_overwrite {
                return Err(BufferError::Full {
                    capacity: self.capacity,
                });
            }
            inner.total_evicted += 1;
            inner.items.pop_front()
        } else {
            None
        };

        inner.items.push_back(item);
        inner.total_appended += 1;
        Ok(evicted)
    }

    /// Remove all items. Capacity and mode are unchanged.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.items.clear();
        inner.total_appended = 0;
        inner.total_evicted = 0;
    }

    /// Number of items currently stored.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the buffer holds no items.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Whether the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.lock().items.len() >= self.capacity
    }

    /// Fixed capacity set at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill ratio in [0, 1].
    pub fn utilization(&self) -> f64 {
        self.lock().items.len() as f64 / self.capacity as f64
    }

    /// Total elements ever appended.
    pub fn total_appended(&self) -> u64 {
        self.lock().total_appended
    }

    /// Total elements ever evicted by overwrite.
    pub fn total_evicted(&self) -> u64 {
        self.lock().total_evicted
    }
}

impl<T: Clone> CircularBuffer<T> {
    /// Get by logical index: 0 is the oldest item, negative indices
    /// count back from the newest (-1 = newest).
    pub fn get(&self, index: i64) -> Result<T, BufferError> {
        let inner = self.lock();
        let size = inner.items.len();
        if size == 0 {
            return Err(BufferError::Empty);
        }

        let resolved = if index < 0 {
            size as i64 + index
        } else {
            index
        };

        if resolved < 0 || resolved >= size as i64 {
            return Err(BufferError::IndexOutOfRange { index, size });
        }

        Ok(inner.items[resolved as usize].clone())
    }

    /// Newest item.
    pub fn latest(&self) -> Result<T, BufferError> {
        self.lock().items.back().cloned().ok_or(BufferError::Empty)
    }

    /// Oldest item.
    pub fn oldest(&self) -> Result<T, BufferError> {
        self.lock().items.front().cloned().ok_or(BufferError::Empty)
    }

    /// Up to `count` most recent items, newest first.
    pub fn get_latest(&self, count: usize) -> Result<Vec<T>, BufferError> {
        let inner = self.lock();
        if inner.items.is_empty() {
            return Err(BufferError::Empty);
        }
        Ok(inner.items.iter().rev().take(count).cloned().collect())
    }

    /// The most recent `count` items in insertion order (oldest first).
    pub fn get_range(&self, count: usize) -> Vec<T> {
        let inner = self.lock();
        let skip = inner.items.len().saturating_sub(count);
        inner.items.iter().skip(skip).cloned().collect()
    }

    /// All items, oldest first.
    pub fn to_list(&self) -> Vec<T> {
        self.lock().items.iter().cloned().collect()
    }
}

impl<T: Clone + Timestamped> CircularBuffer<T> {
    /// Items whose timestamp falls within `[start, end]`, oldest first.
    /// Linear scan.
    pub fn get_by_timestamp_range(&self, start: i64, end: i64) -> Vec<T> {
        let inner = self.lock();
        inner
            .items
            .iter()
            .filter(|item| {
                let ts = item.timestamp_nanos();
                ts >= start && ts <= end
            })
            .cloned()
            .collect()
    }
}

/// Serialized form of a buffer, suitable for snapshotting to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSnapshot<T> {
    /// Fixed capacity at snapshot time.
    pub capacity: usize,
    /// Rust type tag of the stored elements.
    pub data_type: String,
    /// Whether overwrite mode was enabled.
    pub allow_overwrite: bool,
    /// Stored items, oldest first.
    pub data: Vec<T>,
    /// Item count at snapshot time.
    pub size: usize,
    /// Logical head: total elements evicted before the oldest stored one.
    pub head: u64,
    /// Logical tail: total elements ever appended.
    pub tail: u64,
    /// SHA-256 checksum over the serialized data and metadata.
    pub checksum: String,
}

impl<T: Clone + Serialize> CircularBuffer<T> {
    /// Serialize the buffer state for persistence.
    pub fn snapshot(&self) -> Result<BufferSnapshot<T>, BufferError> {
        let inner = self.lock();
        let data: Vec<T> = inner.items.iter().cloned().collect();
        let checksum = compute_checksum(
            &data,
            self.capacity,
            inner.total_evicted,
            inner.total_appended,
        )?;

        Ok(BufferSnapshot {
            capacity: self.capacity,
            data_type: type_name::<T>().to_string(),
            allow_overwrite: self.allow_overwrite,
            size: data.len(),
            head: inner.total_evicted,
            tail: inner.total_appended,
            data,
            checksum,
        })
    }
}

impl<T: Clone + Serialize + DeserializeOwned> CircularBuffer<T> {
    /// Rebuild a buffer from a snapshot, verifying the element type tag
    /// and checksum. The restored buffer has identical capacity, size,
    /// and `to_list()` output.
    pub fn restore(snapshot: BufferSnapshot<T>) -> Result<Self, BufferError> {
        if snapshot.data_type != type_name::<T>() {
            return Err(BufferError::CorruptSnapshot(format!(
                "data type mismatch: snapshot holds {}, expected {}",
                snapshot.data_type,
                type_name::<T>()
            )));
        }
        if snapshot.capacity == 0 || snapshot.data.len() > snapshot.capacity {
            return Err(BufferError::CorruptSnapshot(format!(
                "size {} exceeds capacity {}",
                snapshot.data.len(),
                snapshot.capacity
            )));
        }

        let expected =
            compute_checksum(&snapshot.data, snapshot.capacity, snapshot.head, snapshot.tail)?;
        if expected != snapshot.checksum {
            return Err(BufferError::CorruptSnapshot(
                "checksum mismatch".to_string(),
            ));
        }

        let buffer = Self::build(snapshot.capacity, snapshot.allow_overwrite);
        {
            let mut inner = buffer.lock();
            inner.items = snapshot.data.into_iter().collect();
            inner.total_evicted = snapshot.head;
            inner.total_appended = snapshot.tail;
        }
        Ok(buffer)
    }
}

/// SHA-256 over the serialized data plus buffer metadata.
fn compute_checksum<T: Serialize>(
    data: &[T],
    capacity: usize,
    head: u64,
    tail: u64,
) -> Result<String, BufferError> {
    let payload =
        serde_json::to_vec(data).map_err(|e| BufferError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&payload);
    hasher.update(b"|");
    hasher.update(capacity.to_le_bytes());
    hasher.update(head.to_le_bytes());
    hasher.update(tail.to_le_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
