use std::ptr::{self, NonNull};

use log::{Level, debug, log_enabled, trace};

use crate::{
  arena::{Arena, Backing},
  block::{Block, HEADER_SIZE},
  config::{
    ARENA_SIZE, INITIAL_ARENA_BLOCKS, MAX_ALLOC, MAX_ORDER, MMAP_THRESHOLD, block_size, order_for,
  },
  error::{AllocError, Result},
  free_list::FreeLists,
  mapped::MappedList,
};

/// A buddy-system allocator over one self-aligned arena, with a separate
/// `mmap` path for large requests.
///
/// The allocator is a plain context object: it is not synchronized, and every
/// pointer it returns belongs to it. Dropping it unmaps its large blocks and,
/// for [`Backing::Mapped`], the arena itself.
pub struct BuddyAllocator {
  pub(crate) backing: Backing,
  pub(crate) arena: Option<Arena>,
  pub(crate) free_lists: FreeLists,
  pub(crate) mapped: MappedList,
  pub(crate) used_blocks: usize,
}

// SAFETY: the allocator exclusively owns the arena and every mapped block;
// nothing is tied to the creating thread.
unsafe impl Send for BuddyAllocator {}

impl BuddyAllocator {
  /// An allocator whose arena will be carved out of the program break.
  pub const fn new() -> Self {
    Self::with_backing(Backing::Break)
  }

  pub const fn with_backing(
    backing: Backing,
  ) -> Self {
    Self {
      backing,
      arena: None,
      free_lists: FreeLists::new(),
      mapped: MappedList::new(),
      used_blocks: 0,
    }
  }

  pub fn is_initialized(
    &self,
  ) -> bool {
    self.arena.is_some()
  }

  /// Address range covered by the arena, once it exists.
  pub fn arena_range(
    &self,
  ) -> Option<std::ops::Range<usize>> {
    self.arena.as_ref().map(|arena| {
      let base = arena.base().as_ptr() as usize;
      base..base + ARENA_SIZE
    })
  }

  /// Reserves the arena and seeds the top free list on first use.
  fn ensure_arena(
    &mut self,
  ) -> Result<()> {
    if self.arena.is_some() {
      return Ok(());
    }

    let arena = Arena::reserve(self.backing)?;

    for chunk in 0..INITIAL_ARENA_BLOCKS {
      let offset = chunk * MMAP_THRESHOLD;
      unsafe {
        arena.init_block(offset, MAX_ORDER);
        self.free_lists.insert(&arena, offset);
      }
    }

    self.arena = Some(arena);
    Ok(())
  }

  /// Allocates at least `size` bytes.
  ///
  /// Requests whose total size reaches `MMAP_THRESHOLD` get their own
  /// mapping; everything else is served from the smallest non-empty order
  /// that fits, splitting on the way down.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if size == 0 || size > MAX_ALLOC {
      return Err(AllocError::InvalidSize { requested: size });
    }

    self.ensure_arena()?;

    let total = size + HEADER_SIZE;
    if total >= MMAP_THRESHOLD {
      return self.mapped.allocate(size);
    }

    let order = order_for(total).ok_or(AllocError::OutOfMemory { order: MAX_ORDER + 1 })?;

    let Some(arena) = self.arena.as_ref() else {
      return Err(AllocError::ArenaUnavailable);
    };

    let Some(offset) = (unsafe { self.free_lists.take_first_fit(arena, order) }) else {
      if log_enabled!(Level::Debug) {
        debug!("no free block of order {order} or above");
        self.stats().log();
      }
      return Err(AllocError::OutOfMemory { order });
    };

    unsafe {
      let block = arena.block(offset).as_ptr();

      while (*block).order as usize > order {
        (*block).order -= 1;
        (*block).size /= 2;

        let buddy = offset ^ (*block).size;
        arena.init_block(buddy, (*block).order as usize);
        self.free_lists.insert(arena, buddy);

        trace!("split block {offset:#x}: buddy {buddy:#x} at order {}", (*block).order);
      }

      (*block).is_free = false;
      (*block).next = None;
      (*block).prev = None;
    }

    self.used_blocks += 1;

    Ok(Block::payload(arena.block(offset)))
  }

  /// Allocates `count * size` zero-filled bytes.
  pub fn allocate_zeroed(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if count == 0 || size == 0 {
      return Err(AllocError::InvalidSize { requested: 0 });
    }

    let total = match count.checked_mul(size) {
      Some(total) if total <= MAX_ALLOC => total,
      _ => return Err(AllocError::Overflow { count, size }),
    };

    let payload = self.allocate(total)?;
    unsafe { ptr::write_bytes(payload.as_ptr(), 0, total) };

    Ok(payload)
  }

  /// Returns a block to the allocator. Null is ignored.
  ///
  /// Arena blocks are merged with their buddy for as long as the buddy is
  /// free and of the same order, then put back on the matching free list.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this allocator.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    let Some(payload) = NonNull::new(address) else {
      return;
    };

    unsafe {
      let block = Block::from_payload(payload);

      if block.as_ref().is_mapped {
        self.mapped.release(block);
        return;
      }

      let Some(arena) = self.arena.as_ref() else {
        return;
      };

      let mut offset = arena.offset_of(block);
      self.used_blocks -= 1;

      loop {
        let current = arena.block(offset).as_ptr();
        let order = (*current).order as usize;

        if order >= MAX_ORDER {
          break;
        }

        let buddy_offset = offset ^ (*current).size;
        let buddy = arena.block(buddy_offset).as_ptr();

        if !(*buddy).is_free || (*buddy).order != (*current).order {
          break;
        }

        self.free_lists.remove(arena, buddy_offset);

        offset = offset.min(buddy_offset);
        let merged = arena.block(offset).as_ptr();
        (*merged).order = (order + 1) as u8;
        (*merged).size = block_size(order + 1);

        trace!("coalesced {buddy_offset:#x} into {offset:#x} at order {}", order + 1);
      }

      self.free_lists.insert(arena, offset);
    }
  }

  /// Grows a block to hold at least `size` bytes.
  ///
  /// A block that already has room is returned as is, and blocks never
  /// shrink. Otherwise the contents move to a new block and the old one is
  /// released. On failure the old block is left untouched.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this allocator.
  pub unsafe fn reallocate(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let Some(old) = NonNull::new(address) else {
      return self.allocate(size);
    };

    if size == 0 || size > MAX_ALLOC {
      return Err(AllocError::InvalidSize { requested: size });
    }

    let capacity = unsafe { Block::from_payload(old).as_ref() }.capacity();
    if size <= capacity {
      return Ok(old);
    }

    let new = self.allocate(size)?;

    unsafe {
      ptr::copy(old.as_ptr(), new.as_ptr(), capacity.min(size));
      self.release(old.as_ptr());
    }

    Ok(new)
  }
}

impl Default for BuddyAllocator {
  fn default() -> Self {
    Self::new()
  }
}
