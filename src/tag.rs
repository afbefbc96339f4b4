//! Boundary tags and block address math.
//!
//! A block pointer `bp` is the offset of a block's payload from the arena
//! base. Every function here trusts the tags it reads; validation of
//! caller-supplied pointers happens in [`crate::heap`].
//!
//! ```text
//!          bp - WSIZE          bp                         bp + size - DSIZE
//!              │               │                                 │
//!   ... ───────┼───────────────┼─────────────────────────────────┼───────────┼── ...
//!              │ hdr(size:a)   │ payload / prev_free, next_free  │ ftr(size:a)│
//!   ... ───────┴───────────────┴─────────────────────────────────┴───────────┴── ...
//!              │<──────────────────────── size ─────────────────────────────>│
//! ```

use std::mem;

/// Metadata word size in bytes.
pub const WSIZE: usize = mem::size_of::<usize>();

/// Alignment unit and per-block overhead (header + footer).
pub const DSIZE: usize = 2 * WSIZE;

/// Smallest block that can hold its tags plus both free-list links.
pub const MIN_BLOCK: usize = 2 * DSIZE;

/// Default number of bytes the heap grows by when no free block fits.
pub const CHUNK_SIZE: usize = 1 << 12;

const ALLOC_BIT: usize = 0x1;
const SIZE_MASK: usize = !(DSIZE - 1);

/// Decoded boundary tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
  pub size: usize,
  pub allocated: bool,
}

impl Tag {
  pub const fn new(
    size: usize,
    allocated: bool,
  ) -> Self {
    Self { size, allocated }
  }

  pub const fn free(size: usize) -> Self {
    Self::new(size, false)
  }

  pub const fn used(size: usize) -> Self {
    Self::new(size, true)
  }

  #[inline]
  pub const fn pack(self) -> usize {
    self.size | (self.allocated as usize)
  }

  #[inline]
  pub const fn unpack(word: usize) -> Self {
    Self {
      size: word & SIZE_MASK,
      allocated: word & ALLOC_BIT != 0,
    }
  }
}

#[inline]
pub fn get(
  mem: &[u8],
  offset: usize,
) -> usize {
  let mut word = [0u8; WSIZE];
  word.copy_from_slice(&mem[offset..offset + WSIZE]);
  usize::from_ne_bytes(word)
}

#[inline]
pub fn set(
  mem: &mut [u8],
  offset: usize,
  value: usize,
) {
  mem[offset..offset + WSIZE].copy_from_slice(&value.to_ne_bytes());
}

#[inline]
pub const fn hdrp(bp: usize) -> usize {
  bp - WSIZE
}

#[inline]
pub fn ftrp(
  mem: &[u8],
  bp: usize,
) -> usize {
  bp + header(mem, bp).size - DSIZE
}

#[inline]
pub fn header(
  mem: &[u8],
  bp: usize,
) -> Tag {
  Tag::unpack(get(mem, hdrp(bp)))
}

#[inline]
pub fn footer(
  mem: &[u8],
  bp: usize,
) -> Tag {
  Tag::unpack(get(mem, ftrp(mem, bp)))
}

/// Writes the same tag at both ends of the block. The footer position is
/// derived from `tag.size`, not from the header currently in memory.
pub fn set_tags(
  mem: &mut [u8],
  bp: usize,
  tag: Tag,
) {
  let word = tag.pack();
  set(mem, hdrp(bp), word);
  set(mem, bp + tag.size - DSIZE, word);
}

#[inline]
pub fn next_blkp(
  mem: &[u8],
  bp: usize,
) -> usize {
  bp + header(mem, bp).size
}

/// The word right before our header is the previous block's footer.
#[inline]
pub fn prev_blkp(
  mem: &[u8],
  bp: usize,
) -> usize {
  bp - Tag::unpack(get(mem, bp - DSIZE)).size
}
