//! Explicit free list threaded through the payloads of free blocks.
//!
//! ```text
//!   head ──► ┌──────────┐    ┌──────────┐    ┌──────────┐ ◄── tail
//!            │ prev: 0  │◄───┤ prev     │◄───┤ prev     │
//!            │ next     ├───►│ next     ├───►│ next: 0  │
//!            └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Links are payload offsets written in the first two words of each free
//! payload. Offset 0 is the arena's pad word and never a payload, so it
//! doubles as the list terminator.

use crate::tag::{self, WSIZE};

pub const NIL: usize = 0;

#[inline]
pub fn prev_free(
  mem: &[u8],
  bp: usize,
) -> usize {
  tag::get(mem, bp)
}

#[inline]
pub fn next_free(
  mem: &[u8],
  bp: usize,
) -> usize {
  tag::get(mem, bp + WSIZE)
}

#[inline]
fn set_prev_free(
  mem: &mut [u8],
  bp: usize,
  prev: usize,
) {
  tag::set(mem, bp, prev);
}

#[inline]
fn set_next_free(
  mem: &mut [u8],
  bp: usize,
  next: usize,
) {
  tag::set(mem, bp + WSIZE, next);
}

#[derive(Debug)]
pub struct FreeList {
  head: usize,
  tail: usize,
  len: usize,
}

impl Default for FreeList {
  fn default() -> Self {
    Self {
      head: NIL,
      tail: NIL,
      len: 0,
    }
  }
}

impl FreeList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }

  pub fn head(&self) -> usize {
    self.head
  }

  pub fn tail(&self) -> usize {
    self.tail
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Appends the free block at `bp` to the tail.
  pub fn insert(
    &mut self,
    mem: &mut [u8],
    bp: usize,
  ) {
    set_next_free(mem, bp, NIL);
    set_prev_free(mem, bp, self.tail);

    if self.tail == NIL {
      self.head = bp;
    } else {
      set_next_free(mem, self.tail, bp);
    }

    self.tail = bp;
    self.len += 1;
  }

  /// Splices the block at `bp` out. It must currently be on the list.
  pub fn remove(
    &mut self,
    mem: &mut [u8],
    bp: usize,
  ) {
    let prev = prev_free(mem, bp);
    let next = next_free(mem, bp);

    match (prev, next) {
      (NIL, NIL) => {
        self.head = NIL;
        self.tail = NIL;
      }
      (NIL, next) => {
        set_prev_free(mem, next, NIL);
        self.head = next;
      }
      (prev, NIL) => {
        set_next_free(mem, prev, NIL);
        self.tail = prev;
      }
      (prev, next) => {
        set_next_free(mem, prev, next);
        set_prev_free(mem, next, prev);
      }
    }

    set_prev_free(mem, bp, NIL);
    set_next_free(mem, bp, NIL);
    self.len -= 1;
  }

  /// Walks the list from head to tail.
  pub fn iter<'a>(
    &self,
    mem: &'a [u8],
  ) -> Iter<'a> {
    Iter {
      mem,
      current: self.head,
    }
  }
}

pub struct Iter<'a> {
  mem: &'a [u8],
  current: usize,
}

impl Iterator for Iter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current == NIL {
      return None;
    }
    let current = self.current;
    self.current = next_free(self.mem, current);
    Some(current)
  }
}
