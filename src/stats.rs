//! Read-only bookkeeping over the arena and the mapped-block list.
//!
//! At any quiescent point with no mapped blocks live:
//!
//! ```text
//!   allocated_bytes() + metadata_bytes() == ARENA_SIZE
//! ```

use log::debug;

use crate::{
  block::HEADER_SIZE,
  buddy::BuddyAllocator,
  config::{ARENA_SIZE, MAX_ORDER},
};

/// Point-in-time view of every counter.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Stats {
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub allocated_blocks: usize,
  pub allocated_bytes: usize,
  pub metadata_bytes: usize,
  pub mapped_blocks: usize,
  pub free_blocks_by_order: [usize; MAX_ORDER + 1],
}

impl Stats {
  pub fn log(
    &self,
  ) {
    debug!(
      "blocks: {} allocated, {} free, {} mapped",
      self.allocated_blocks, self.free_blocks, self.mapped_blocks
    );
    debug!(
      "bytes: {} allocated, {} free, {} metadata",
      self.allocated_bytes, self.free_bytes, self.metadata_bytes
    );

    for (order, &count) in self.free_blocks_by_order.iter().enumerate() {
      if count > 0 {
        debug!("  order {order}: {count} free");
      }
    }
  }
}

impl BuddyAllocator {
  fn free_block_sizes(
    &self,
  ) -> impl Iterator<Item = usize> + '_ {
    self.arena.iter().flat_map(move |arena| {
      (0..=MAX_ORDER).flat_map(move |order| {
        self
          .free_lists
          .iter(arena, order)
          .map(move |offset| unsafe { arena.block(offset).as_ref() }.size)
      })
    })
  }

  /// Number of free arena blocks.
  pub fn free_blocks(
    &self,
  ) -> usize {
    self.free_block_sizes().count()
  }

  /// Payload bytes available across all free arena blocks.
  pub fn free_bytes(
    &self,
  ) -> usize {
    self.free_block_sizes().map(|size| size - HEADER_SIZE).sum()
  }

  fn buddy_blocks(
    &self,
  ) -> usize {
    self.free_blocks() + self.used_blocks
  }

  /// Free and in-use arena blocks plus live mapped blocks.
  pub fn allocated_blocks(
    &self,
  ) -> usize {
    if !self.is_initialized() {
      return 0;
    }

    self.buddy_blocks() + self.mapped.iter().count()
  }

  /// Payload bytes of every block, free or in use, arena and mapped.
  pub fn allocated_bytes(
    &self,
  ) -> usize {
    if !self.is_initialized() {
      return 0;
    }

    let arena_bytes = ARENA_SIZE - self.buddy_blocks() * HEADER_SIZE;
    let mapped_bytes: usize = self.mapped.iter().map(|block| block.size - HEADER_SIZE).sum();

    arena_bytes + mapped_bytes
  }

  pub fn metadata_bytes(
    &self,
  ) -> usize {
    self.allocated_blocks() * HEADER_SIZE
  }

  pub fn header_size(
    &self,
  ) -> usize {
    HEADER_SIZE
  }

  pub fn stats(
    &self,
  ) -> Stats {
    let mut free_blocks_by_order = [0; MAX_ORDER + 1];

    if let Some(arena) = self.arena.as_ref() {
      for (order, count) in free_blocks_by_order.iter_mut().enumerate() {
        *count = self.free_lists.iter(arena, order).count();
      }
    }

    Stats {
      free_blocks: self.free_blocks(),
      free_bytes: self.free_bytes(),
      allocated_blocks: self.allocated_blocks(),
      allocated_bytes: self.allocated_bytes(),
      metadata_bytes: self.metadata_bytes(),
      mapped_blocks: self.mapped.iter().count(),
      free_blocks_by_order,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::ptr::NonNull;

  use crate::{
    block::Block,
    buddy::tests::{allocator, check_invariants},
    config::{INITIAL_ARENA_BLOCKS, MMAP_THRESHOLD, block_size, order_for},
  };

  use super::*;

  fn used_capacity(
    live: &[NonNull<u8>],
  ) -> usize {
    live
      .iter()
      .map(|&payload| unsafe { Block::from_payload(payload).as_ref() })
      .filter(|block| !block.is_mapped)
      .map(Block::capacity)
      .sum()
  }

  #[test]
  fn test_empty_before_first_allocation() {
    let allocator = allocator();

    assert_eq!(allocator.stats(), Stats::default());
    assert_eq!(allocator.header_size(), HEADER_SIZE);
  }

  #[test]
  fn test_fresh_arena() {
    let mut allocator = allocator();
    let payload = allocator.allocate(MMAP_THRESHOLD - HEADER_SIZE - 1).unwrap();
    unsafe { allocator.release(payload.as_ptr()) };

    let stats = allocator.stats();
    assert_eq!(stats.free_blocks, INITIAL_ARENA_BLOCKS);
    assert_eq!(stats.allocated_blocks, INITIAL_ARENA_BLOCKS);
    assert_eq!(stats.free_bytes, ARENA_SIZE - INITIAL_ARENA_BLOCKS * HEADER_SIZE);
    assert_eq!(stats.allocated_bytes, stats.free_bytes);
    assert_eq!(stats.metadata_bytes, INITIAL_ARENA_BLOCKS * HEADER_SIZE);
    assert_eq!(stats.free_blocks_by_order[MAX_ORDER], INITIAL_ARENA_BLOCKS);
  }

  #[test]
  fn test_split_counts() {
    let mut allocator = allocator();
    allocator.allocate(100).unwrap();

    let order = order_for(100 + HEADER_SIZE).unwrap();
    let splits = MAX_ORDER - order;

    assert_eq!(allocator.free_blocks(), INITIAL_ARENA_BLOCKS - 1 + splits);
    assert_eq!(allocator.allocated_blocks(), INITIAL_ARENA_BLOCKS + splits);
    assert_eq!(
      allocator.free_bytes() + block_size(order) - HEADER_SIZE,
      allocator.allocated_bytes()
    );
  }

  #[test]
  fn test_conservation_over_mixed_workload() {
    let mut allocator = allocator();
    let mut live = Vec::new();

    for round in 0..6 {
      for size in [24, 100, 700, 3000, 12_000, 40_000] {
        if let Ok(payload) = allocator.allocate(size * (round + 1)) {
          live.push(payload);
        }
      }

      for i in (0..live.len()).step_by(3).rev() {
        let payload = live.remove(i);
        unsafe { allocator.release(payload.as_ptr()) };
      }

      let stats = allocator.stats();
      let mapped_bytes: usize = allocator.mapped.iter().map(|b| b.size - HEADER_SIZE).sum();

      let arena_bytes = stats.allocated_bytes - mapped_bytes;
      let arena_metadata = stats.metadata_bytes - stats.mapped_blocks * HEADER_SIZE;
      assert_eq!(arena_bytes + arena_metadata, ARENA_SIZE);
      assert_eq!(stats.free_bytes + used_capacity(&live), arena_bytes);
      assert_eq!(stats.free_blocks_by_order.iter().sum::<usize>(), stats.free_blocks);
      check_invariants(&allocator);
    }

    for payload in live.drain(..) {
      unsafe { allocator.release(payload.as_ptr()) };
    }

    let stats = allocator.stats();
    assert_eq!(stats.allocated_bytes + stats.metadata_bytes, ARENA_SIZE);
    assert_eq!(stats.free_blocks, INITIAL_ARENA_BLOCKS);
  }

  #[test]
  fn test_mapped_block_counts_once() {
    let mut allocator = allocator();
    allocator.allocate(1).unwrap();
    let before = allocator.stats();

    let large = allocator.allocate(MMAP_THRESHOLD).unwrap();
    let after = allocator.stats();

    assert_eq!(after.allocated_blocks, before.allocated_blocks + 1);
    assert_eq!(after.allocated_bytes, before.allocated_bytes + MMAP_THRESHOLD);
    assert_eq!(after.metadata_bytes, before.metadata_bytes + HEADER_SIZE);
    assert_eq!(after.mapped_blocks, 1);
    assert_eq!(after.free_blocks, before.free_blocks);
    assert_eq!(after.free_bytes, before.free_bytes);

    unsafe { allocator.release(large.as_ptr()) };
    assert_eq!(allocator.stats(), before);
  }
}
