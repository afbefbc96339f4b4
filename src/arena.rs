//! Backing stores the heap grows into.

use crate::error::ArenaError;

/// A contiguous byte range with a monotonic break, the heap's `sbrk`.
pub trait Arena {
  /// Drops every byte handed out so far.
  fn reset(&mut self) -> Result<(), ArenaError>;

  /// Extends the used region by exactly `bytes` and returns the offset at
  /// which the new region starts.
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<usize, ArenaError>;

  /// Bytes handed out so far.
  fn used(&self) -> usize;

  fn capacity(&self) -> usize;

  /// The used region `[0, used)`.
  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];

  /// Address of the first arena byte.
  fn low(&self) -> *const u8 {
    self.bytes().as_ptr()
  }

  /// Address of the last used arena byte.
  fn high(&self) -> *const u8 {
    self.low().wrapping_add(self.used()).wrapping_sub(1)
  }
}

/// Grows `brk` within `capacity`, the bookkeeping every arena shares.
pub(crate) fn bump(
  brk: &mut usize,
  capacity: usize,
  bytes: usize,
) -> Result<usize, ArenaError> {
  let available = capacity - *brk;
  if bytes > available {
    return Err(ArenaError::Exhausted {
      requested: bytes,
      available,
      capacity,
    });
  }

  let old_brk = *brk;
  *brk += bytes;
  Ok(old_brk)
}

/// Fixed-capacity arena over any byte buffer: an owned `Box<[u8]>` or
/// memory lent by the caller.
pub struct MemArena<B = Box<[u8]>> {
  buf: B,
  brk: usize,
}

impl MemArena {
  pub fn with_capacity(capacity: usize) -> Self {
    Self::new(vec![0u8; capacity].into_boxed_slice())
  }
}

impl<B> MemArena<B>
where
  B: AsRef<[u8]> + AsMut<[u8]>,
{
  pub fn new(buf: B) -> Self {
    Self { buf, brk: 0 }
  }

  pub fn into_inner(self) -> B {
    self.buf
  }
}

impl<B> Arena for MemArena<B>
where
  B: AsRef<[u8]> + AsMut<[u8]>,
{
  fn reset(&mut self) -> Result<(), ArenaError> {
    self.brk = 0;
    Ok(())
  }

  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<usize, ArenaError> {
    let capacity = self.capacity();
    bump(&mut self.brk, capacity, bytes)
  }

  fn used(&self) -> usize {
    self.brk
  }

  fn capacity(&self) -> usize {
    self.buf.as_ref().len()
  }

  fn bytes(&self) -> &[u8] {
    &self.buf.as_ref()[..self.brk]
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.buf.as_mut()[..self.brk]
  }

  fn low(&self) -> *const u8 {
    self.buf.as_ref().as_ptr()
  }
}
