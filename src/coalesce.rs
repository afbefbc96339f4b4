//! Boundary-tag coalescing.
//!
//! ```text
//!   prev free, next free:
//!
//!   ┌────────────┬────────────┬────────────┐       ┌──────────────────────────────────┐
//!   │ prev (f)   │ bp (f)     │ next (f)   │  ──►  │ prev (f), size = p + b + n       │
//!   └────────────┴────────────┴────────────┘       └──────────────────────────────────┘
//! ```
//!
//! The prologue and epilogue are always allocated, so both neighbors exist
//! for every block.

use crate::{
  arena::Arena,
  heap::Heap,
  tag::{self, Tag},
};

impl<A: Arena> Heap<A> {
  /// Merges the free, unlisted block at `bp` with its free neighbors and
  /// puts the result on the free list. Returns the merged block.
  pub(crate) fn coalesce(
    &mut self,
    bp: usize,
  ) -> usize {
    let mem = self.arena.bytes_mut();

    let prev = tag::prev_blkp(mem, bp);
    let next = tag::next_blkp(mem, bp);
    let prev_alloc = tag::header(mem, prev).allocated;
    let next_alloc = tag::header(mem, next).allocated;
    let mut size = tag::header(mem, bp).size;

    let merged = match (prev_alloc, next_alloc) {
      (true, true) => bp,
      (false, true) => {
        self.free.remove(mem, prev);
        size += tag::header(mem, prev).size;
        tag::set_tags(mem, prev, Tag::free(size));
        prev
      }
      (true, false) => {
        self.free.remove(mem, next);
        size += tag::header(mem, next).size;
        tag::set_tags(mem, bp, Tag::free(size));
        bp
      }
      (false, false) => {
        self.free.remove(mem, prev);
        self.free.remove(mem, next);
        size += tag::header(mem, prev).size + tag::header(mem, next).size;
        tag::set_tags(mem, prev, Tag::free(size));
        prev
      }
    };

    self.free.insert(mem, merged);
    merged
  }
}
