//! Generational slab
//!
//! Stable integer slots with a generation counter each. Removing a value
//! bumps its slot's generation, so a handle taken before the removal no
//! longer resolves even after the slot is reused.

/// Why a lookup found nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Miss {
    /// The slot never existed
    Invalid,
    /// The slot exists but was emptied or reused since the handle was made
    Stale,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct Slab<T> {
    slots: Vec<Slot<T>>,
    vacant: Vec<u32>,
    len: usize,
}

impl<T> Slab<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            len: 0,
        }
    }

    /// Store `value`, reusing a vacant slot first. Returns `(index, generation)`.
    pub(crate) fn insert(&mut self, value: T) -> Option<(u32, u32)> {
        let index = match self.vacant.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                index
            },
        };

        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.value.is_none());
        slot.value = Some(value);
        self.len += 1;
        Some((index, slot.generation))
    }

    pub(crate) fn get(&self, index: usize, generation: u32) -> Result<&T, Miss> {
        let slot = self.slots.get(index).ok_or(Miss::Invalid)?;
        if slot.generation != generation {
            return Err(Miss::Stale);
        }
        slot.value.as_ref().ok_or(Miss::Stale)
    }

    pub(crate) fn get_mut(&mut self, index: usize, generation: u32) -> Result<&mut T, Miss> {
        let slot = self.slots.get_mut(index).ok_or(Miss::Invalid)?;
        if slot.generation != generation {
            return Err(Miss::Stale);
        }
        slot.value.as_mut().ok_or(Miss::Stale)
    }

    /// Current generation of an occupied slot
    pub(crate) fn generation_of(&self, index: usize) -> Option<u32> {
        let slot = self.slots.get(index)?;
        slot.value.as_ref().map(|_| slot.generation)
    }

    /// Empty a slot and retire its generation
    pub(crate) fn remove(&mut self, index: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(index);
        self.len -= 1;
        Some(value)
    }

    /// Occupied slots as `(index, generation, value)`
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (index as u32, slot.generation, value))
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of slots ever created; bounds every index handed out
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
