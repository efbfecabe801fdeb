/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two.
///
/// # Examples
///
/// ```rust
/// use rbuddy::align_to;
///
/// assert_eq!(align_to!(13, 16), 16);
/// assert_eq!(align_to!(0x40_0001, 0x40_0000), 0x80_0000);
/// assert_eq!(align_to!(4096, 4096), 4096);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $alignment:expr) => {
    ($value + ($alignment - 1)) & !($alignment - 1)
  };
}

/// Tells whether `value` is a multiple of the power-of-two `alignment`.
///
/// ```rust
/// use rbuddy::is_aligned;
///
/// assert!(is_aligned!(0x80_0000, 0x40_0000));
/// assert!(!is_aligned!(0x80_0010, 0x40_0000));
/// ```
#[macro_export]
macro_rules! is_aligned {
  ($value:expr, $alignment:expr) => {
    ($value & ($alignment - 1)) == 0
  };
}

#[cfg(test)]
mod tests {
  use crate::config::ARENA_SIZE;

  #[test]
  fn test_align_to() {
    for shift in 0..12 {
      let alignment = 1usize << shift;

      for i in 0..10 {
        let sizes = (alignment * i + 1)..=(alignment * (i + 1));

        for size in sizes {
          assert_eq!(alignment * (i + 1), align_to!(size, alignment));
        }
      }
    }
  }

  #[test]
  fn test_arena_alignment() {
    let brk = 0x5555_5612_3000usize;
    let aligned = align_to!(brk, ARENA_SIZE);

    assert!(aligned >= brk);
    assert!(aligned - brk < ARENA_SIZE);
    assert!(is_aligned!(aligned, ARENA_SIZE));
  }
}
