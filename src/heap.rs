use crate::{
  align,
  arena::Arena,
  block::Ptr,
  config::HeapConfig,
  error::HeapError,
  free_list::FreeList,
  tag::{self, DSIZE, MIN_BLOCK, Tag, WSIZE},
};

/// Payload offset of the prologue block.
pub(crate) const PROLOGUE: usize = DSIZE;

/// Payload offset of the first block after the prologue.
pub(crate) const FIRST_BLOCK: usize = 2 * DSIZE;

/// Block size needed to serve a `size` byte request: payload plus
/// header/footer, rounded to the alignment unit, never below `MIN_BLOCK`.
pub(crate) fn adjusted_size(size: usize) -> Option<usize> {
  let total = size.checked_add(DSIZE)?;
  Some(align::align_up(total)?.max(MIN_BLOCK))
}

/// Boundary-tag allocator over an [`Arena`].
///
/// Every operation works on payload offsets ([`Ptr`]) and reaches the
/// arena's bytes only through bounds-checked slices.
pub struct Heap<A: Arena> {
  pub(crate) arena: A,
  pub(crate) free: FreeList,
  config: HeapConfig,
  ready: bool,
}

impl<A: Arena> Heap<A> {
  pub fn new(arena: A) -> Result<Self, HeapError> {
    Self::with_config(arena, HeapConfig::default())
  }

  pub fn with_config(
    arena: A,
    config: HeapConfig,
  ) -> Result<Self, HeapError> {
    let mut heap = Self {
      arena,
      free: FreeList::new(),
      config,
      ready: false,
    };
    heap.initialize()?;
    Ok(heap)
  }

  /// Resets the arena and lays out a fresh heap:
  ///
  /// ```text
  ///   0        WSIZE      2*WSIZE    3*WSIZE                              brk
  ///   ┌────────┬──────────┬──────────┬──────────────────────────┬──────────┐
  ///   │  pad   │ hdr(D:a) │ ftr(D:a) │  one free chunk-sized    │ hdr(0:a) │
  ///   └────────┴──────────┴──────────┴──────────────────────────┴──────────┘
  ///            │<─── prologue ──────>│                          │<epilogue>│
  /// ```
  ///
  /// Every [`Ptr`] handed out before is invalidated. On failure the heap
  /// refuses further work until a later `initialize` succeeds.
  pub fn initialize(&mut self) -> Result<(), HeapError> {
    self.ready = false;
    self.free.clear();
    self.arena.reset()?;

    let start = self.arena.grow(4 * WSIZE)?;
    debug_assert_eq!(start, 0);

    let mem = self.arena.bytes_mut();
    tag::set(mem, start, 0);
    tag::set(mem, start + WSIZE, Tag::used(DSIZE).pack());
    tag::set(mem, start + 2 * WSIZE, Tag::used(DSIZE).pack());
    tag::set(mem, start + 3 * WSIZE, Tag::used(0).pack());

    self.extend(self.config.chunk_size() / WSIZE)?;
    self.ready = true;

    log::debug!(
      "heap initialized: {} byte arena, {} byte chunk",
      self.arena.used(),
      self.config.chunk_size()
    );
    Ok(())
  }

  /// Grows the arena by `words` (rounded up to even) and returns the free
  /// block covering the new space, merged with a free tail block if any.
  pub(crate) fn extend(
    &mut self,
    words: usize,
  ) -> Result<usize, HeapError> {
    let words = words + words % 2;
    let bytes = words
      .checked_mul(WSIZE)
      .ok_or(HeapError::SizeOverflow { count: words, size: WSIZE })?;

    let bp = match self.arena.grow(bytes) {
      Ok(bp) => bp,
      Err(err) => {
        log::warn!("cannot extend heap by {} bytes: {}", bytes, err);
        return Err(err.into());
      }
    };

    // The old epilogue header becomes the new block's header.
    let mem = self.arena.bytes_mut();
    tag::set_tags(mem, bp, Tag::free(bytes));
    tag::set(mem, tag::hdrp(bp + bytes), Tag::used(0).pack());

    log::debug!("extended heap by {} bytes at {:#x}", bytes, bp);
    Ok(self.coalesce(bp))
  }

  /// Returns a block with at least `size` usable bytes, or `None` for a
  /// zero-sized request.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Option<Ptr>, HeapError> {
    self.ensure_ready()?;

    if size == 0 {
      return Ok(None);
    }

    let asize = adjusted_size(size).ok_or(HeapError::SizeOverflow { count: 1, size })?;

    let bp = match self.find_fit(asize) {
      Some(bp) => bp,
      None => self.extend(asize.max(self.config.chunk_size()) / WSIZE)?,
    };
    self.place(bp, asize);

    log::trace!("allocate({}) -> {:#x}", size, bp);
    Ok(Ptr::new(bp))
  }

  /// Frees `ptr` and merges it with free neighbors. `None` is a no-op.
  pub fn release(
    &mut self,
    ptr: Option<Ptr>,
  ) -> Result<(), HeapError> {
    let Some(ptr) = ptr else {
      return Ok(());
    };
    self.ensure_ready()?;

    let block = self.validate(ptr)?;
    let bp = ptr.offset();

    tag::set_tags(self.arena.bytes_mut(), bp, Tag::free(block.size));
    let merged = self.coalesce(bp);

    log::trace!("release({}) -> free block at {:#x}", ptr, merged);
    Ok(())
  }

  /// Grows `ptr` to hold `size` bytes, keeping its contents.
  ///
  /// A block that already fits is returned as is, even when `size` is much
  /// smaller. `None` behaves as [`Heap::allocate`], and a zero `size` as
  /// [`Heap::release`]. If a fresh block cannot be had, `ptr` stays valid
  /// and untouched.
  pub fn resize(
    &mut self,
    ptr: Option<Ptr>,
    size: usize,
  ) -> Result<Option<Ptr>, HeapError> {
    let Some(old) = ptr else {
      return self.allocate(size);
    };

    if size == 0 {
      self.release(Some(old))?;
      return Ok(None);
    }

    self.ensure_ready()?;
    let capacity = self.validate(old)?.capacity();
    if capacity >= size {
      log::trace!("resize({}, {}) fits in place", old, size);
      return Ok(Some(old));
    }

    let new = match self.allocate(size)? {
      Some(new) => new,
      None => return Ok(None),
    };

    let from = old.offset();
    self
      .arena
      .bytes_mut()
      .copy_within(from..from + capacity, new.offset());
    self.release(Some(old))?;

    log::trace!("resize({}, {}) moved to {}", old, size, new);
    Ok(Some(new))
  }

  /// Allocates `count * size` bytes, all zero. Overflowing products are
  /// rejected rather than wrapped.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<Option<Ptr>, HeapError> {
    let bytes = count
      .checked_mul(size)
      .ok_or(HeapError::SizeOverflow { count, size })?;

    let ptr = self.allocate(bytes)?;
    if let Some(ptr) = ptr {
      let from = ptr.offset();
      self.arena.bytes_mut()[from..from + bytes].fill(0);
    }
    Ok(ptr)
  }

  /// The whole usable payload of an allocated block.
  pub fn payload(
    &self,
    ptr: Ptr,
  ) -> Result<&[u8], HeapError> {
    self.ensure_ready()?;
    let capacity = self.validate(ptr)?.capacity();
    let from = ptr.offset();
    Ok(&self.arena.bytes()[from..from + capacity])
  }

  pub fn payload_mut(
    &mut self,
    ptr: Ptr,
  ) -> Result<&mut [u8], HeapError> {
    self.ensure_ready()?;
    let capacity = self.validate(ptr)?.capacity();
    let from = ptr.offset();
    Ok(&mut self.arena.bytes_mut()[from..from + capacity])
  }

  /// Bytes the caller may use behind `ptr`, at least what was requested.
  pub fn usable_size(
    &self,
    ptr: Ptr,
  ) -> Result<usize, HeapError> {
    self.ensure_ready()?;
    Ok(self.validate(ptr)?.capacity())
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn arena(&self) -> &A {
    &self.arena
  }

  pub fn is_initialized(&self) -> bool {
    self.ready
  }

  /// Tears the heap down and hands the backing store back.
  pub fn into_arena(self) -> A {
    self.arena
  }

  pub(crate) fn ensure_ready(&self) -> Result<(), HeapError> {
    if self.ready { Ok(()) } else { Err(HeapError::Uninitialized) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    arena::MemArena,
    error::ArenaError,
    tag::CHUNK_SIZE,
  };

  fn heap() -> Heap<MemArena> {
    Heap::new(MemArena::with_capacity(1 << 16)).unwrap()
  }

  #[test]
  fn test_adjusted_size() {
    assert_eq!(adjusted_size(1), Some(MIN_BLOCK));
    assert_eq!(adjusted_size(DSIZE), Some(MIN_BLOCK));
    assert_eq!(adjusted_size(DSIZE + 1), Some(MIN_BLOCK + DSIZE));
    assert_eq!(adjusted_size(100), align::align_up(100 + DSIZE));
    assert_eq!(adjusted_size(usize::MAX), None);
    assert_eq!(adjusted_size(usize::MAX - DSIZE), None);
  }

  #[test]
  fn test_initialize_layout() {
    let heap = heap();

    assert_eq!(heap.arena.used(), 4 * WSIZE + CHUNK_SIZE);
    assert_eq!(heap.free.len(), 1);
    assert_eq!(heap.free.head(), FIRST_BLOCK);

    let mem = heap.arena.bytes();
    assert_eq!(tag::header(mem, PROLOGUE), Tag::used(DSIZE));
    assert_eq!(tag::footer(mem, PROLOGUE), Tag::used(DSIZE));
    assert_eq!(tag::header(mem, FIRST_BLOCK), Tag::free(CHUNK_SIZE));
    assert_eq!(tag::footer(mem, FIRST_BLOCK), Tag::free(CHUNK_SIZE));
    assert_eq!(tag::header(mem, FIRST_BLOCK + CHUNK_SIZE), Tag::used(0));
    heap.check().unwrap();
  }

  #[test]
  fn test_initialize_too_small_arena() {
    let result = Heap::new(MemArena::with_capacity(CHUNK_SIZE));
    assert!(matches!(
      result,
      Err(HeapError::OutOfMemory(ArenaError::Exhausted { .. }))
    ));
  }

  #[test]
  fn test_failed_reinitialize_poisons_heap() {
    let mut heap = Heap::with_config(
      MemArena::with_capacity(CHUNK_SIZE),
      HeapConfig::new(CHUNK_SIZE / 2),
    )
    .unwrap();
    assert!(heap.is_initialized());

    heap.config = HeapConfig::new(2 * CHUNK_SIZE);
    assert!(heap.initialize().is_err());
    assert!(!heap.is_initialized());
    assert!(matches!(heap.allocate(8), Err(HeapError::Uninitialized)));
    assert!(matches!(heap.check(), Err(HeapError::Uninitialized)));
    assert_eq!(heap.blocks().count(), 0);

    heap.config = HeapConfig::new(CHUNK_SIZE / 4);
    heap.initialize().unwrap();
    assert!(heap.allocate(8).unwrap().is_some());
  }

  #[test]
  fn test_allocate_zero_is_none() {
    let mut heap = heap();
    assert_eq!(heap.allocate(0).unwrap(), None);
    assert_eq!(heap.free.len(), 1);
  }

  #[test]
  fn test_allocate_splits_first_block() {
    let mut heap = heap();

    let p = heap.allocate(100).unwrap().unwrap();
    let asize = adjusted_size(100).unwrap();

    assert_eq!(p.offset(), FIRST_BLOCK);
    assert_eq!(heap.usable_size(p).unwrap(), asize - DSIZE);
    assert_eq!(heap.free.len(), 1);
    assert_eq!(heap.free.head(), FIRST_BLOCK + asize);
    assert_eq!(
      tag::header(heap.arena.bytes(), FIRST_BLOCK + asize),
      Tag::free(CHUNK_SIZE - asize)
    );
    heap.check().unwrap();
  }

  #[test]
  fn test_allocate_extends_when_nothing_fits() {
    let mut heap = heap();
    let before = heap.arena.used();

    let p = heap.allocate(2 * CHUNK_SIZE).unwrap().unwrap();

    // The fresh space merged with the free initial chunk.
    assert_eq!(p.offset(), FIRST_BLOCK);
    assert!(heap.usable_size(p).unwrap() >= 2 * CHUNK_SIZE);
    assert_eq!(heap.arena.used(), before + adjusted_size(2 * CHUNK_SIZE).unwrap());
    heap.check().unwrap();
  }

  #[test]
  fn test_allocate_overflow() {
    let mut heap = heap();
    assert!(matches!(
      heap.allocate(usize::MAX),
      Err(HeapError::SizeOverflow { count: 1, size: usize::MAX })
    ));
    heap.check().unwrap();
  }

  #[test]
  fn test_release_none_is_noop() {
    let mut heap = heap();
    heap.release(None).unwrap();
    heap.check().unwrap();
  }

  #[test]
  fn test_release_restores_single_block() {
    let mut heap = heap();

    let p = heap.allocate(100).unwrap();
    heap.release(p).unwrap();

    assert_eq!(heap.free.len(), 1);
    assert_eq!(
      tag::header(heap.arena.bytes(), FIRST_BLOCK),
      Tag::free(CHUNK_SIZE)
    );
    heap.check().unwrap();
  }

  #[test]
  fn test_resize_paths() {
    let mut heap = heap();

    let p = heap.resize(None, 40).unwrap().unwrap();
    heap.payload_mut(p).unwrap()[..40].copy_from_slice(&[7u8; 40]);

    assert_eq!(heap.resize(Some(p), 8).unwrap(), Some(p));

    let q = heap.resize(Some(p), 400).unwrap().unwrap();
    assert_ne!(p, q);
    assert_eq!(&heap.payload(q).unwrap()[..40], &[7u8; 40]);
    assert!(matches!(heap.usable_size(p), Err(HeapError::DoubleRelease(_)) | Err(HeapError::InvalidPointer(_))));

    assert_eq!(heap.resize(Some(q), 0).unwrap(), None);
    assert_eq!(heap.free.len(), 1);
    heap.check().unwrap();
  }

  #[test]
  fn test_zero_allocate() {
    let mut heap = heap();

    let p = heap.allocate(64).unwrap();
    heap.payload_mut(p.unwrap()).unwrap().fill(0xAA);
    heap.release(p).unwrap();

    let z = heap.zero_allocate(8, 8).unwrap().unwrap();
    assert_eq!(z, p.unwrap());
    assert!(heap.payload(z).unwrap()[..64].iter().all(|&b| b == 0));

    assert_eq!(heap.zero_allocate(0, 8).unwrap(), None);
    assert_eq!(heap.zero_allocate(8, 0).unwrap(), None);
    assert!(matches!(
      heap.zero_allocate(usize::MAX, 2),
      Err(HeapError::SizeOverflow { count: usize::MAX, size: 2 })
    ));
  }
}
