//! Pointer validation, heap walks and the consistency checker.

use crate::{
  arena::Arena,
  block::{Block, Ptr},
  error::HeapError,
  free_list::{self, NIL},
  heap::{FIRST_BLOCK, Heap, PROLOGUE},
  tag::{self, DSIZE, MIN_BLOCK, Tag, WSIZE},
};

/// Totals over every block between the sentinels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub arena_bytes: usize,
  pub free_bytes: usize,
  pub allocated_bytes: usize,
  pub free_blocks: usize,
  pub allocated_blocks: usize,
}

/// Physical walk from the first block to the epilogue.
pub struct Blocks<'a> {
  mem: &'a [u8],
  bp: usize,
}

impl Iterator for Blocks<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Self::Item> {
    if self.bp > self.mem.len() {
      return None;
    }
    let hdr = tag::header(self.mem, self.bp);
    if hdr.size == 0 {
      return None;
    }

    let block = Block::new(Ptr::new(self.bp)?, hdr.size, !hdr.allocated);
    // A scribbled header ends the walk instead of wrapping around.
    self.bp = self.bp.checked_add(hdr.size).unwrap_or(usize::MAX);
    Some(block)
  }
}

fn corrupted(
  offset: usize,
  reason: &'static str,
) -> HeapError {
  log::warn!("heap check failed at {:#x}: {}", offset, reason);
  HeapError::Corrupted { offset, reason }
}

impl<A: Arena> Heap<A> {
  /// Confirms `ptr` names a live allocated block and returns it.
  ///
  /// This is a best-effort screen, not a guarantee: an offset landing inside
  /// a payload whose bytes happen to mimic a tag pair slips through.
  pub(crate) fn validate(
    &self,
    ptr: Ptr,
  ) -> Result<Block, HeapError> {
    let mem = self.arena.bytes();
    let bp = ptr.offset();
    let epilogue = mem.len().saturating_sub(WSIZE);

    let invalid = || {
      log::warn!("rejecting {}", ptr);
      HeapError::InvalidPointer(ptr)
    };

    if bp < FIRST_BLOCK || bp % DSIZE != 0 || bp >= epilogue {
      return Err(invalid());
    }

    let hdr = tag::header(mem, bp);
    if hdr.size < MIN_BLOCK || hdr.size % DSIZE != 0 || hdr.size > epilogue + WSIZE - bp {
      return Err(invalid());
    }
    if tag::footer(mem, bp) != hdr {
      return Err(invalid());
    }
    if !hdr.allocated {
      log::warn!("{} released twice", ptr);
      return Err(HeapError::DoubleRelease(ptr));
    }

    Ok(Block::new(ptr, hdr.size, false))
  }

  /// Every block between the prologue and the epilogue, in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    let mem: &[u8] = if self.is_initialized() { self.arena.bytes() } else { &[] };
    Blocks {
      mem,
      bp: FIRST_BLOCK,
    }
  }

  /// Free blocks in free-list order.
  pub fn free_blocks(&self) -> impl Iterator<Item = Block> + '_ {
    let mem = self.arena.bytes();
    self
      .free
      .iter(mem)
      .filter_map(move |bp| Some(Block::new(Ptr::new(bp)?, tag::header(mem, bp).size, true)))
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      arena_bytes: self.arena.used(),
      ..HeapStats::default()
    };

    for block in self.blocks() {
      if block.is_free {
        stats.free_bytes += block.size;
        stats.free_blocks += 1;
      } else {
        stats.allocated_bytes += block.size;
        stats.allocated_blocks += 1;
      }
    }
    stats
  }

  /// Walks the whole heap and the free list, verifying:
  ///
  /// - prologue and epilogue tags;
  /// - block alignment, minimum size and header/footer agreement;
  /// - no two physically adjacent free blocks;
  /// - the free list holds exactly the blocks whose allocated bit is clear,
  ///   with symmetric links and a matching head, tail and length.
  pub fn check(&self) -> Result<(), HeapError> {
    self.ensure_ready()?;

    let mem = self.arena.bytes();
    if mem.len() < FIRST_BLOCK {
      return Err(corrupted(0, "arena smaller than the sentinels"));
    }
    if tag::header(mem, PROLOGUE) != Tag::used(DSIZE) || tag::footer(mem, PROLOGUE) != Tag::used(DSIZE) {
      return Err(corrupted(PROLOGUE, "bad prologue"));
    }

    let epilogue = mem.len() - WSIZE;
    let mut free = Vec::new();
    let mut prev_free = false;
    let mut bp = FIRST_BLOCK;

    while tag::hdrp(bp) < epilogue {
      let hdr = tag::header(mem, bp);
      if hdr.size < MIN_BLOCK || hdr.size % DSIZE != 0 {
        return Err(corrupted(bp, "bad block size"));
      }
      if tag::hdrp(bp).checked_add(hdr.size).is_none_or(|end| end > epilogue) {
        return Err(corrupted(bp, "block runs past the epilogue"));
      }
      if tag::footer(mem, bp) != hdr {
        return Err(corrupted(bp, "header and footer disagree"));
      }
      if !hdr.allocated {
        if prev_free {
          return Err(corrupted(bp, "adjacent free blocks"));
        }
        free.push(bp);
      }
      prev_free = !hdr.allocated;
      bp += hdr.size;
    }

    if tag::hdrp(bp) != epilogue || tag::header(mem, bp) != Tag::used(0) {
      return Err(corrupted(epilogue, "bad epilogue"));
    }

    // `free` is sorted by construction.
    let mut listed = vec![false; free.len()];
    let mut prev = NIL;
    let mut current = self.free.head();
    while current != NIL {
      let Ok(index) = free.binary_search(&current) else {
        return Err(corrupted(current, "free list entry is not a free block"));
      };
      if listed[index] {
        return Err(corrupted(current, "free block listed twice"));
      }
      listed[index] = true;

      if free_list::prev_free(mem, current) != prev {
        return Err(corrupted(current, "broken prev link"));
      }
      prev = current;
      current = free_list::next_free(mem, current);
    }

    if self.free.tail() != prev {
      return Err(corrupted(prev, "free list tail mismatch"));
    }
    if let Some(index) = listed.iter().position(|&seen| !seen) {
      return Err(corrupted(free[index], "free block missing from the free list"));
    }
    if self.free.len() != free.len() {
      return Err(corrupted(self.free.head(), "free list length mismatch"));
    }
    Ok(())
  }
}
