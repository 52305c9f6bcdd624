//! Generation-checked handle table.
//!
//! A handle packs a slot index (upper 32 bits) and the slot's generation
//! (lower 32 bits). Removing a value bumps the generation, so a stale
//! handle never resolves to a later occupant of the same slot and a
//! second destroy is a harmless miss.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Handle {
    slot: u32,
    generation: u32,
}

impl Handle {
    fn to_raw(self) -> u64 {
        (u64::from(self.slot) << 32) | u64::from(self.generation)
    }

    fn from_raw(raw: u64) -> Self {
        Self {
            slot: (raw >> 32) as u32,
            generation: raw as u32,
        }
    }
}

enum Entry<T> {
    Live { generation: u32, value: T },
    /// Reusable slot; `next` chains the vacant slots.
    Vacant { generation: u32, next: Option<u32> },
    /// Generation exhausted; never handed out again.
    Retired,
}

/// Table of values addressed by `u64` handles.
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    vacant: Option<u32>,
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: None,
        }
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> u64 {
        if let Some(slot) = self.vacant {
            let entry = &mut self.entries[slot as usize];
            if let Entry::Vacant { generation, next } = *entry {
                self.vacant = next;
                *entry = Entry::Live { generation, value };
                return Handle { slot, generation }.to_raw();
            }
        }
        let slot = self.entries.len() as u32;
        self.entries.push(Entry::Live {
            generation: 0,
            value,
        });
        Handle {
            slot,
            generation: 0,
        }
        .to_raw()
    }

    pub fn get_mut(&mut self, raw: u64) -> Option<&mut T> {
        let handle = Handle::from_raw(raw);
        match self.entries.get_mut(handle.slot as usize)? {
            Entry::Live { generation, value } if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    /// Take the value out, invalidating `raw` and every copy of it.
    pub fn remove(&mut self, raw: u64) -> Option<T> {
        let handle = Handle::from_raw(raw);
        let entry = self.entries.get_mut(handle.slot as usize)?;
        match entry {
            Entry::Live { generation, .. } if *generation == handle.generation => {}
            _ => return None,
        }
        let replacement = match handle.generation.checked_add(1) {
            Some(generation) => Entry::Vacant {
                generation,
                next: self.vacant,
            },
            None => Entry::Retired,
        };
        let recycled = matches!(replacement, Entry::Vacant { .. });
        match std::mem::replace(entry, replacement) {
            Entry::Live { value, .. } => {
                if recycled {
                    self.vacant = Some(handle.slot);
                }
                Some(value)
            }
            _ => None,
        }
    }
}
