//! Generational slot pool.
//!
//! [`Pool`] hands out fixed slots for values of one type. Freed slots go on
//! a LIFO free list and are reused before any fresh slot; each free bumps the
//! slot's generation so outstanding [`SlotHandle`]s to it become stale.

use stowage_core::MemoryClass;

use crate::config::{Growth, PoolConfig};
use crate::error::PoolError;
use crate::handle::SlotHandle;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Fixed-capacity (optionally growable) pool of `T` slots.
///
/// All operations are O(1) except [`next`](Self::next), [`iter`](Self::iter)
/// and [`clear`](Self::clear), which scan the slot table.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Indices of dead slots, most recently freed last.
    free_list: Vec<u32>,
    live: usize,
    config: PoolConfig,
}

impl<T> Pool<T> {
    /// Create a pool with `config.capacity` empty slots.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let mut pool = Self {
            slots: Vec::with_capacity(config.capacity as usize),
            free_list: Vec::with_capacity(config.capacity as usize),
            live: 0,
            config,
        };
        pool.grow_by(config.capacity);
        Ok(pool)
    }

    /// Append `additional` fresh slots. Callers guarantee the free list is
    /// empty or that appending below existing free entries is acceptable.
    fn grow_by(&mut self, additional: u32) {
        let start = self.slots.len() as u32;
        let end = start + additional;
        self.slots.extend((start..end).map(|_| Slot {
            generation: 0,
            value: None,
        }));
        // Reversed so that the lowest fresh index is popped first.
        self.free_list.extend((start..end).rev());
    }

    /// Store `value` in a free slot.
    ///
    /// Returns [`PoolError::Exhausted`] if every slot is live and the pool
    /// is fixed-capacity (or growing would exceed [`PoolConfig::MAX_SLOTS`]).
    pub fn allocate(&mut self, value: T) -> Result<SlotHandle, PoolError> {
        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                self.try_grow()?;
                self.free_list.pop().ok_or(PoolError::Exhausted {
                    capacity: self.slots.len(),
                })?
            }
        };

        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.value.is_none(), "free list held a live slot {index}");
        slot.value = Some(value);
        self.live += 1;
        Ok(SlotHandle::new(index, slot.generation))
    }

    fn try_grow(&mut self) -> Result<(), PoolError> {
        let capacity = self.slots.len();
        match self.config.growth {
            Growth::Fixed => Err(PoolError::Exhausted { capacity }),
            Growth::Chunked(chunk) => {
                let room = (PoolConfig::MAX_SLOTS as usize).saturating_sub(capacity);
                let chunk = (chunk as usize).min(room) as u32;
                if chunk == 0 {
                    return Err(PoolError::Exhausted { capacity });
                }
                tracing::debug!(
                    capacity,
                    chunk,
                    memory_class = %self.config.memory_class,
                    "pool exhausted, growing"
                );
                self.grow_by(chunk);
                Ok(())
            }
        }
    }

    fn check(&self, handle: SlotHandle) -> Result<(), PoolError> {
        self.try_get(handle).map(|_| ())
    }

    fn stale(handle: SlotHandle, slot_generation: u32) -> PoolError {
        PoolError::StaleHandle {
            index: handle.index,
            handle_generation: handle.generation,
            slot_generation,
        }
    }

    /// Release the slot and return its value.
    ///
    /// The slot's generation is bumped, so `handle` (and every copy of it)
    /// is stale afterwards. Freeing twice fails with [`PoolError::StaleHandle`].
    pub fn free(&mut self, handle: SlotHandle) -> Result<T, PoolError> {
        self.check(handle)?;
        let slot = &mut self.slots[handle.index as usize];
        let value = slot
            .value
            .take()
            .ok_or(Self::stale(handle, slot.generation))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.live -= 1;
        Ok(value)
    }

    /// Shared access to a live slot.
    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutable access to a live slot.
    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Shared access to a live slot, or the reason the handle is unusable.
    pub fn try_get(&self, handle: SlotHandle) -> Result<&T, PoolError> {
        let slot = self
            .slots
            .get(handle.index as usize)
            .ok_or(PoolError::OutOfBounds {
                index: handle.index,
                capacity: self.slots.len(),
            })?;
        if slot.generation != handle.generation {
            return Err(Self::stale(handle, slot.generation));
        }
        slot.value
            .as_ref()
            .ok_or(Self::stale(handle, slot.generation))
    }

    /// Mutable access to a live slot, or the reason the handle is unusable.
    pub fn try_get_mut(&mut self, handle: SlotHandle) -> Result<&mut T, PoolError> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .ok_or(PoolError::OutOfBounds {
                index: handle.index,
                capacity,
            })?;
        if slot.generation != handle.generation {
            return Err(Self::stale(handle, slot.generation));
        }
        let generation = slot.generation;
        slot.value.as_mut().ok_or(Self::stale(handle, generation))
    }

    /// Validate a handle, returning the precise reason it is unusable.
    pub fn validate(&self, handle: SlotHandle) -> Result<(), PoolError> {
        self.check(handle)
    }

    /// Whether `handle` refers to a live slot.
    pub fn contains(&self, handle: SlotHandle) -> bool {
        self.check(handle).is_ok()
    }

    /// The next live slot after `cursor` in slot order.
    ///
    /// `None` as the cursor starts from the beginning. The cursor itself
    /// does not need to be live.
    pub fn next(&self, cursor: Option<SlotHandle>) -> Option<SlotHandle> {
        let start = cursor.map_or(0, |c| c.index as usize + 1);
        self.slots
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| SlotHandle::new(index as u32, slot.generation))
    }

    /// Iterate over live slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (SlotHandle::new(index as u32, slot.generation), value))
        })
    }

    /// Free every live slot, keeping the slot table.
    ///
    /// Every outstanding handle becomes stale. Returns the number of slots
    /// that were live.
    pub fn clear(&mut self) -> usize {
        let cleared = self.live;
        for slot in &mut self.slots {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free_list.clear();
        self.free_list.extend((0..self.slots.len() as u32).rev());
        self.live = 0;
        cleared
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no slot is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total number of slots (live + free).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of free slots available without growing.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Memory class the pool is accounted against.
    pub fn memory_class(&self) -> MemoryClass {
        self.config.memory_class
    }

    /// Memory usage of the slot table in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Slot<T>>()
            + self.free_list.capacity() * std::mem::size_of::<u32>()
    }
}

/// # Panics
///
/// Panics if the handle is stale or out of bounds. Use [`Pool::get`] when
/// the handle has not already been validated.
impl<T> std::ops::Index<SlotHandle> for Pool<T> {
    type Output = T;

    fn index(&self, handle: SlotHandle) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("no live slot for {handle}"),
        }
    }
}

/// # Panics
///
/// Panics if the handle is stale or out of bounds.
impl<T> std::ops::IndexMut<SlotHandle> for Pool<T> {
    fn index_mut(&mut self, handle: SlotHandle) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("no live slot for {handle}"),
        }
    }
}
