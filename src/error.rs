use thiserror::Error;

use crate::block::Ptr;

#[derive(Debug, Error)]
pub enum ArenaError {
  #[error("arena exhausted: requested {requested} bytes, {available} of {capacity} left")]
  Exhausted {
    requested: usize,
    available: usize,
    capacity: usize,
  },
  #[cfg(unix)]
  #[error("mmap failed with {0}")]
  Map(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum HeapError {
  #[error("out of memory: {0}")]
  OutOfMemory(#[from] ArenaError),
  #[error("allocation of {count} x {size} bytes overflows")]
  SizeOverflow { count: usize, size: usize },
  #[error("{0} is not a block of this heap")]
  InvalidPointer(Ptr),
  #[error("{0} was already released")]
  DoubleRelease(Ptr),
  #[error("heap corrupted at offset {offset:#x}: {reason}")]
  Corrupted { offset: usize, reason: &'static str },
  #[error("heap is not initialized")]
  Uninitialized,
}
