use std::{fmt, num::NonZeroUsize};

/// Handle to an allocated payload: its byte offset from the arena base.
///
/// `Option<Ptr>` plays the role of a nullable pointer and has the same size
/// as `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ptr(NonZeroUsize);

impl Ptr {
  pub(crate) fn new(offset: usize) -> Option<Self> {
    NonZeroUsize::new(offset).map(Self)
  }

  /// Builds a handle from a raw offset, e.g. one recorded by the caller.
  /// Nothing is checked until the handle is passed back to the heap.
  pub fn from_offset(offset: usize) -> Option<Self> {
    Self::new(offset)
  }

  #[inline]
  pub fn offset(self) -> usize {
    self.0.get()
  }
}

impl fmt::Display for Ptr {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "block@{:#x}", self.offset())
  }
}

/// A physical block as seen by a heap walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub ptr: Ptr,
  pub size: usize,
  pub is_free: bool,
}

impl Block {
  pub fn new(
    ptr: Ptr,
    size: usize,
    is_free: bool,
  ) -> Self {
    Self { ptr, size, is_free }
  }

  /// Bytes usable by the caller once allocated.
  pub fn capacity(&self) -> usize {
    self.size - crate::tag::DSIZE
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ptr_niche() {
    assert_eq!(std::mem::size_of::<Option<Ptr>>(), std::mem::size_of::<usize>());
    assert!(Ptr::from_offset(0).is_none());
    assert_eq!(Ptr::from_offset(48).map(Ptr::offset), Some(48));
  }
}
