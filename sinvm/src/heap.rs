//! The first-fit heap allocator.
//!
//! Live blocks are kept in a list sorted by start address, pairwise
//! disjoint and contained in `[HEAP_START, HEAP_MAX)`. Allocation walks
//! the gaps in address order; reallocation grows in place when the slack
//! before the next block allows, and moves the block otherwise.

use arch::mem::{HEAP_MAX, HEAP_START};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicObject {
    pub start: u16,
    pub size: u16,
}

/// What a reallocation did; the machine finishes the job (byte copy,
/// register updates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realloc {
    /// Resized where it was.
    InPlace,
    /// A new block was carved out; copy `old_size` bytes from `old_start`.
    Moved {
        to: u16,
        old_start: u16,
        old_size: u16,
    },
    /// No room anywhere.
    Failed,
    /// No block starts at the given address.
    NotFound,
}

#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<DynamicObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    pub fn objects(&self) -> &[DynamicObject] {
        &self.objects
    }

    /// First-fit allocation; returns the new block's start address.
    pub fn allocate(&mut self, size: u16) -> Option<u16> {
        if size == 0 || size > HEAP_MAX - HEAP_START {
            return None;
        }
        let mut previous_end = HEAP_START;
        let mut insert_at = self.objects.len();
        let mut start = None;
        for (i, object) in self.objects.iter().enumerate() {
            if size <= object.start - previous_end {
                insert_at = i;
                start = Some(previous_end);
                break;
            }
            previous_end = object.start + object.size;
        }
        // the tail gap, up to the heap ceiling
        if start.is_none() && size <= HEAP_MAX - previous_end {
            start = Some(previous_end);
        }
        let start = start?;
        self.objects.insert(
            insert_at,
            DynamicObject { start, size },
        );
        Some(start)
    }

    /// Removes the block starting at `start`; `false` when none does.
    #[must_use]
    pub fn free(&mut self, start: u16) -> bool {
        match self.objects.iter().position(|o| o.start == start) {
            Some(index) => {
                self.objects.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn reallocate(&mut self, start: u16, new_size: u16) -> Realloc {
        let Some(index) = self.objects.iter().position(|o| o.start == start) else {
            return Realloc::NotFound;
        };
        let next_start = self
            .objects
            .get(index + 1)
            .map(|o| o.start)
            .unwrap_or(HEAP_MAX);
        if new_size <= next_start - start {
            self.objects[index].size = new_size;
            return Realloc::InPlace;
        }
        // no slack: move the block, old contents intact until the copy
        let old = self.objects[index];
        match self.allocate(new_size) {
            Some(to) => {
                let removed = self.free(old.start);
                debug_assert!(removed);
                Realloc::Moved {
                    to,
                    old_start: old.start,
                    old_size: old.size,
                }
            }
            None => Realloc::Failed,
        }
    }
}
