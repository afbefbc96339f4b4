use std::env;

use crate::tag::{CHUNK_SIZE, MIN_BLOCK};

/// Environment variable overriding the growth granule.
pub const CHUNK_SIZE_ENV: &str = "BTALLOC_CHUNK_SIZE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  chunk_size: usize,
}

impl HeapConfig {
  /// `chunk_size` is rounded up to the alignment unit and never drops below
  /// one minimum block.
  pub fn new(chunk_size: usize) -> Self {
    let chunk_size = crate::align::align_up(chunk_size)
      .unwrap_or(usize::MAX & !(crate::tag::DSIZE - 1))
      .max(MIN_BLOCK);
    Self { chunk_size }
  }

  /// Defaults, with `BTALLOC_CHUNK_SIZE` applied when it parses as a
  /// positive integer. Anything else is ignored.
  pub fn from_env() -> Self {
    match env::var(CHUNK_SIZE_ENV) {
      Ok(raw) => Self::parse_chunk_size(&raw).map_or_else(Self::default, Self::new),
      Err(_) => Self::default(),
    }
  }

  fn parse_chunk_size(raw: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
      Ok(0) => None,
      Ok(size) => Some(size),
      Err(_) => {
        log::warn!("ignoring malformed {}={:?}", CHUNK_SIZE_ENV, raw);
        None
      }
    }
  }

  pub fn chunk_size(&self) -> usize {
    self.chunk_size
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      chunk_size: CHUNK_SIZE,
    }
  }
}
