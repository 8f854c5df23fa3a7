//! Fixed-capacity circular buffer with overwrite-on-full semantics.
//!
//! The buffer grows by appending until it holds `capacity` items. From then
//! on every write replaces the slot under `write_ptr` and advances the
//! pointer, so the slot being overwritten is always the oldest one.
//!
//! ```text
//! capacity = 3, appends T0..T4
//!
//! after T2:  [T0, T1, T2]   full, write_ptr = 0
//! after T3:  [T3, T1, T2]   write_ptr = 1
//! after T4:  [T3, T4, T2]   write_ptr = 2
//!
//! logical view (oldest first): get(0)=T2, get(1)=T3, get(2)=T4
//! ```

use crate::error::{ReplayError, ReplayResult};

/// Ring buffer with O(1) append and random access.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    /// Physical slots.
    items: Vec<T>,
    capacity: usize,
    /// Next slot to overwrite once full.
    write_ptr: usize,
    full: bool,
}

impl<T> CircularBuffer<T> {
    /// Create an empty buffer.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `capacity` is zero.
    pub fn new(capacity: usize) -> ReplayResult<Self> {
        if capacity == 0 {
            return Err(ReplayError::InvalidConfig(
                "buffer capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            items: Vec::with_capacity(capacity),
            capacity,
            write_ptr: 0,
            full: false,
        })
    }

    /// Append an item, returning the item it replaced once the buffer is full.
    pub fn append(&mut self, item: T) -> Option<T> {
        if self.full {
            let evicted = std::mem::replace(&mut self.items[self.write_ptr], item);
            self.write_ptr = (self.write_ptr + 1) % self.capacity;
            Some(evicted)
        } else {
            self.items.push(item);
            if self.items.len() == self.capacity {
                self.write_ptr = 0;
                self.full = true;
            }
            None
        }
    }

    /// Number of valid items.
    #[inline]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the buffer has reached capacity (and now overwrites).
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Current write pointer. Only meaningful once full.
    #[inline]
    pub fn write_ptr(&self) -> usize {
        self.write_ptr
    }

    /// Get an item by logical index, `0` being the oldest surviving item.
    pub fn get(&self, index: usize) -> ReplayResult<&T> {
        let count = self.count();
        if index >= count {
            return Err(ReplayError::OutOfRange { index, count });
        }
        Ok(&self.items[self.physical_index(index)])
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count()).map(move |i| &self.items[self.physical_index(i)])
    }

    #[inline]
    fn physical_index(&self, index: usize) -> usize {
        if self.full {
            (self.write_ptr + index) % self.capacity
        } else {
            index
        }
    }
}
