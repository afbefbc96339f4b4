//! First-fit search and block placement.

use crate::{
  arena::Arena,
  heap::Heap,
  tag::{self, MIN_BLOCK, Tag},
};

impl<A: Arena> Heap<A> {
  /// First free block, in list order, of at least `asize` bytes.
  pub(crate) fn find_fit(
    &self,
    asize: usize,
  ) -> Option<usize> {
    let mem = self.arena.bytes();
    self
      .free
      .iter(mem)
      .find(|&bp| tag::header(mem, bp).size >= asize)
  }

  /// Marks `asize` bytes of the free block at `bp` allocated. The tail is
  /// split off as a new free block when it can stand on its own; smaller
  /// slivers stay inside the allocation.
  pub(crate) fn place(
    &mut self,
    bp: usize,
    asize: usize,
  ) {
    let mem = self.arena.bytes_mut();
    let csize = tag::header(mem, bp).size;
    debug_assert!(csize >= asize);

    self.free.remove(mem, bp);

    if csize - asize >= MIN_BLOCK {
      tag::set_tags(mem, bp, Tag::used(asize));
      let rest = tag::next_blkp(mem, bp);
      tag::set_tags(mem, rest, Tag::free(csize - asize));
      self.free.insert(mem, rest);
      log::trace!("split {:#x}: {} used, {} free at {:#x}", bp, asize, csize - asize, rest);
    } else {
      tag::set_tags(mem, bp, Tag::used(csize));
    }
  }
}
