//! Fixed allocator constants and size-class arithmetic.
//!
//! ```text
//!   order:      0     1     2    ...     9        10
//!   block:    128B  256B  512B   ...   64KiB    128KiB  (= MMAP_THRESHOLD)
//! ```

/// Largest payload a single request may ask for.
pub const MAX_ALLOC: usize = 100_000_000;

/// Size of an order-0 block, header included.
pub const MIN_BLOCK_SIZE: usize = 128;

/// Highest buddy order. An order-`MAX_ORDER` block is `MMAP_THRESHOLD` bytes.
pub const MAX_ORDER: usize = 10;

/// Requests whose total size (payload plus header) reaches this bypass the
/// arena and get their own anonymous mapping.
pub const MMAP_THRESHOLD: usize = 128 * 1024;

/// Number of top-order blocks the arena is carved into.
pub const INITIAL_ARENA_BLOCKS: usize = 32;

/// Total arena size. The arena is aligned to this value.
pub const ARENA_SIZE: usize = INITIAL_ARENA_BLOCKS * MMAP_THRESHOLD;

const _: () = assert!(MIN_BLOCK_SIZE << MAX_ORDER == MMAP_THRESHOLD);
const _: () = assert!(ARENA_SIZE.is_power_of_two());

/// Size in bytes of a block of the given order.
#[inline]
pub const fn block_size(
  order: usize,
) -> usize {
  MIN_BLOCK_SIZE << order
}

/// Smallest order whose block can hold `total` bytes, or `None` when even an
/// order-`MAX_ORDER` block is too small.
pub fn order_for(
  total: usize,
) -> Option<usize> {
  (0..=MAX_ORDER).find(|&order| block_size(order) >= total)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_block_size() {
    assert_eq!(block_size(0), 128);
    assert_eq!(block_size(1), 256);
    assert_eq!(block_size(MAX_ORDER), MMAP_THRESHOLD);
  }

  #[test]
  fn test_order_for() {
    assert_eq!(order_for(1), Some(0));
    assert_eq!(order_for(128), Some(0));
    assert_eq!(order_for(129), Some(1));
    assert_eq!(order_for(148), Some(1));
    assert_eq!(order_for(MMAP_THRESHOLD - 1), Some(MAX_ORDER));
    assert_eq!(order_for(MMAP_THRESHOLD), Some(MAX_ORDER));
    assert_eq!(order_for(MMAP_THRESHOLD + 1), None);
  }
}
