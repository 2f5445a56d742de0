//! Fixed-size-class slot pools backing every node and attribute.
//!
//! Slots are handed out from blocks of roughly one kilobyte. A freed
//! slot is poisoned (its value dropped and its generation bumped) and
//! threaded back onto the pool's free list, so it is only ever reused
//! by a later allocation from the same pool.

use std::mem;

use tracing::trace;

const BLOCK_BYTES: usize = 1024;

/// A handle to an allocated slot.
///
/// The generation makes handles to freed slots detectable: once a slot
/// has been freed, every handle issued before that point stops
/// resolving, even after the slot is reused. The epoch does the same
/// for every slot at once when the whole pool is cleared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    index: u32,
    generation: u32,
    epoch: u32,
}

enum Entry<T> {
    Occupied(T),
    Vacant(Option<u32>),
}

struct Cell<T> {
    generation: u32,
    entry: Entry<T>,
}

pub struct Pool<T> {
    blocks: Vec<Vec<Cell<T>>>,
    free: Option<u32>,
    live: usize,
    per_block: usize,
    epoch: u32,
}

impl<T> Pool<T> {
    pub fn new() -> Pool<T> {
        let per_block = (BLOCK_BYTES / mem::size_of::<Cell<T>>()).max(1);

        Pool {
            blocks: Vec::new(),
            free: None,
            live: 0,
            per_block,
            epoch: 0,
        }
    }

    /// Number of slots currently handed out.
    pub fn live(&self) -> usize { self.live }

    /// Number of slots owned, handed out or not.
    pub fn capacity(&self) -> usize { self.blocks.len() * self.per_block }

    #[cfg(test)]
    pub fn slots_per_block(&self) -> usize { self.per_block }

    fn locate(&self, index: u32) -> (usize, usize) {
        let index = index as usize;
        (index / self.per_block, index % self.per_block)
    }

    fn cell(&self, index: u32) -> Option<&Cell<T>> {
        let (block, offset) = self.locate(index);
        self.blocks.get(block).and_then(|b| b.get(offset))
    }

    fn cell_mut(&mut self, index: u32) -> Option<&mut Cell<T>> {
        let (block, offset) = self.locate(index);
        self.blocks.get_mut(block).and_then(|b| b.get_mut(offset))
    }

    // Threads a fresh block onto the free list and returns its first index.
    fn grow(&mut self) -> u32 {
        let base = self.capacity();
        let mut block = Vec::with_capacity(self.per_block);

        for i in 0..self.per_block {
            let next = if i + 1 < self.per_block {
                Some((base + i + 1) as u32)
            } else {
                self.free
            };
            block.push(Cell { generation: 0, entry: Entry::Vacant(next) });
        }

        self.blocks.push(block);
        self.free = Some(base as u32);

        trace!(blocks = self.blocks.len(), per_block = self.per_block, "pool grew");

        base as u32
    }

    pub fn alloc(&mut self, value: T) -> Slot {
        let index = match self.free {
            Some(index) => index,
            None => self.grow(),
        };

        let (block, offset) = self.locate(index);
        let cell = &mut self.blocks[block][offset];
        let generation = cell.generation;

        let next = match mem::replace(&mut cell.entry, Entry::Occupied(value)) {
            Entry::Vacant(next) => next,
            Entry::Occupied(_) => {
                debug_assert!(false, "free list pointed at an occupied slot");
                None
            }
        };

        self.free = next;
        self.live += 1;

        Slot { index, generation, epoch: self.epoch }
    }

    /// Returns the slot to the free list, handing back its value.
    /// Freeing a stale handle does nothing.
    pub fn free(&mut self, slot: Slot) -> Option<T> {
        if slot.epoch != self.epoch {
            return None;
        }

        let free = self.free;
        let cell = self.cell_mut(slot.index)?;

        if cell.generation != slot.generation {
            return None;
        }

        match mem::replace(&mut cell.entry, Entry::Vacant(free)) {
            Entry::Occupied(value) => {
                cell.generation = cell.generation.wrapping_add(1);
                self.free = Some(slot.index);
                self.live -= 1;
                Some(value)
            }
            vacant => {
                cell.entry = vacant;
                None
            }
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&T> {
        if slot.epoch != self.epoch {
            return None;
        }

        match self.cell(slot.index) {
            Some(Cell { generation, entry: Entry::Occupied(value) }) if *generation == slot.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut T> {
        if slot.epoch != self.epoch {
            return None;
        }

        match self.cell_mut(slot.index) {
            Some(Cell { generation, entry: Entry::Occupied(value) }) if *generation == slot.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    /// Drops every value and releases every block. Handles issued
    /// before the clear never resolve again.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.free = None;
        self.live = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Pool<T> {
        Pool::new()
    }
}

#[cfg(test)]
mod test {
    use super::Pool;

    #[test]
    fn allocation_grows_by_whole_blocks() {
        let mut pool = Pool::new();
        assert_eq!(0, pool.capacity());

        pool.alloc(1u64);

        assert_eq!(pool.slots_per_block(), pool.capacity());
        assert_eq!(1, pool.live());
    }

    #[test]
    fn slots_per_block_follows_record_size() {
        let small: Pool<u8> = Pool::new();
        let large: Pool<[u8; 256]> = Pool::new();

        assert!(small.slots_per_block() > large.slots_per_block());
        assert!(large.slots_per_block() >= 1);
    }

    #[test]
    fn oversized_records_still_get_a_slot() {
        let mut pool: Pool<[u8; 4096]> = Pool::new();
        let slot = pool.alloc([7; 4096]);

        assert_eq!(1, pool.slots_per_block());
        assert_eq!(Some(7), pool.get(slot).map(|v| v[0]));
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut pool = Pool::new();
        let a = pool.alloc("a");
        let capacity = pool.capacity();

        assert_eq!(Some("a"), pool.free(a));
        let b = pool.alloc("b");

        assert_eq!(capacity, pool.capacity());
        assert_eq!(Some(&"b"), pool.get(b));
    }

    #[test]
    fn stale_handles_do_not_resolve() {
        let mut pool = Pool::new();
        let a = pool.alloc(1);
        pool.free(a);
        let b = pool.alloc(2);

        assert_eq!(None, pool.get(a));
        assert_eq!(None, pool.free(a));
        assert_eq!(Some(&2), pool.get(b));
    }

    #[test]
    fn double_free_is_ignored() {
        let mut pool = Pool::new();
        let a = pool.alloc(1);

        assert_eq!(Some(1), pool.free(a));
        assert_eq!(None, pool.free(a));
        assert_eq!(0, pool.live());
    }

    #[test]
    fn live_count_returns_to_zero() {
        let mut pool = Pool::new();
        let slots: Vec<_> = (0..1000).map(|i| pool.alloc(i)).collect();
        assert_eq!(1000, pool.live());

        for s in slots {
            pool.free(s);
        }

        assert_eq!(0, pool.live());
    }

    #[test]
    fn clear_releases_everything() {
        let mut pool = Pool::new();
        let a = pool.alloc(String::from("owned"));
        pool.clear();

        assert_eq!(0, pool.live());
        assert_eq!(0, pool.capacity());
        assert_eq!(None, pool.get(a));
    }

    #[test]
    fn handles_from_before_a_clear_do_not_resolve() {
        let mut pool = Pool::new();
        let old = pool.alloc("old");
        pool.clear();
        let new = pool.alloc("new");

        assert_eq!(None, pool.get(old));
        assert_eq!(None, pool.free(old));
        assert_eq!(Some(&"new"), pool.get(new));
        assert_eq!(1, pool.live());
    }
}
