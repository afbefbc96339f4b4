use crate::tag::DSIZE;

/// Rounds a byte count up to the heap's alignment unit (two machine words),
/// `None` when rounding would overflow.
///
/// # Examples
///
/// ```rust
/// use btalloc::align::align_up;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align_up(13), Some(16)), // 64 bit machine.
///     4 => assert_eq!(align_up(11), Some(16)), // 32 bit machine.
///     _ => {},
/// };
/// assert_eq!(align_up(usize::MAX), None);
/// ```
pub const fn align_up(value: usize) -> Option<usize> {
  match value.checked_add(DSIZE - 1) {
    Some(padded) => Some(padded & !(DSIZE - 1)),
    None => None,
  }
}
