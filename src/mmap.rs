use std::{io, ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void};

use crate::{
  arena::{Arena, bump},
  error::ArenaError,
};

/// Arena backed by one anonymous private mapping reserved up front.
///
/// The whole `capacity` is mapped at construction, so the base never moves
/// and growth is only a break bump inside the reservation. The kernel backs
/// pages lazily as they are touched.
pub struct MmapArena {
  base: NonNull<u8>,
  capacity: usize,
  brk: usize,
}

impl MmapArena {
  pub fn new(capacity: usize) -> Result<Self, ArenaError> {
    // SAFETY: a null hint lets the kernel pick a fresh page-aligned range,
    // so no existing mapping is replaced. See mmap(2).
    let addr = unsafe {
      libc::mmap(
        std::ptr::null_mut(),
        capacity,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if addr == MAP_FAILED {
      return Err(io::Error::last_os_error().into());
    }

    let base = NonNull::new(addr as *mut u8).ok_or_else(|| io::Error::from(io::ErrorKind::Other))?;

    log::debug!("mapped {} byte arena at {:p}", capacity, base);

    Ok(Self {
      base,
      capacity,
      brk: 0,
    })
  }
}

impl Arena for MmapArena {
  fn reset(&mut self) -> Result<(), ArenaError> {
    self.brk = 0;
    Ok(())
  }

  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<usize, ArenaError> {
    bump(&mut self.brk, self.capacity, bytes)
  }

  fn used(&self) -> usize {
    self.brk
  }

  fn capacity(&self) -> usize {
    self.capacity
  }

  fn bytes(&self) -> &[u8] {
    // SAFETY: `[base, base + brk)` lies inside our live, readable mapping
    // and `brk <= capacity`.
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.brk) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    // SAFETY: as in `bytes`, and `&mut self` makes the borrow exclusive.
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.brk) }
  }

  fn low(&self) -> *const u8 {
    self.base.as_ptr()
  }
}

impl Drop for MmapArena {
  fn drop(&mut self) {
    // SAFETY: the mapping was created in `new` with this exact length and is
    // unmapped only here.
    let ret = unsafe { libc::munmap(self.base.as_ptr() as *mut c_void, self.capacity) };
    if ret != 0 {
      log::warn!("munmap of arena at {:p} failed: {}", self.base, io::Error::last_os_error());
    }
  }
}
