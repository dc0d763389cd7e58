//! Fixed-capacity slot arena with generational handles
//!
//! A slot is reused as soon as its occupant is deactivated. The generation
//! counter is bumped on every deactivation, so a handle kept from an earlier
//! occupant never resolves to the new one.

use serde::{Deserialize, Serialize};

/// Reference to a pooled value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generic pool with a hard capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPool<T> {
    slots: Vec<Slot<T>>,
    active: usize,
}

impl<T> EntityPool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                value: None,
            })
            .collect();
        Self { slots, active: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn is_full(&self) -> bool {
        self.active == self.slots.len()
    }

    /// Place `value` in the lowest free slot.
    ///
    /// Returns `None` when the pool is full; the caller is expected to
    /// throttle and retry on a later frame.
    pub fn spawn(&mut self, value: T) -> Option<Handle> {
        let Some(index) = self.slots.iter().position(|s| s.value.is_none()) else {
            log::debug!("pool full ({} slots), spawn rejected", self.slots.len());
            return None;
        };
        let slot = &mut self.slots[index];
        slot.value = Some(value);
        self.active += 1;
        Some(Handle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Remove the value behind `handle`. Stale handles return `None`.
    pub fn deactivate(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.active -= 1;
        Some(value)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Active values in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    Handle {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|v| {
                (
                    Handle {
                        index: i as u32,
                        generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn for_each_active(&self, mut f: impl FnMut(Handle, &T)) {
        for (handle, value) in self.iter_active() {
            f(handle, value);
        }
    }

    /// Deactivate every value for which `keep` returns false
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        for slot in &mut self.slots {
            if slot.value.as_ref().is_some_and(|v| !keep(v)) {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                removed += 1;
            }
        }
        self.active -= removed;
        removed
    }

    /// Deactivate everything (run reset)
    pub fn clear(&mut self) {
        self.retain(|_| false);
    }
}
