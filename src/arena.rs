//! The self-aligned region managed by the buddy engine.
//!
//! ```text
//!   base (multiple of ARENA_SIZE)
//!   │
//!   ▼
//!   ┌──────────┬──────────┬──────────┬─────┬──────────┐
//!   │ order 10 │ order 10 │ order 10 │ ... │ order 10 │   32 × 128 KiB
//!   └──────────┴──────────┴──────────┴─────┴──────────┘
//!   0          128K       256K                      4 MiB
//! ```
//!
//! Because `base` is aligned to the arena size, a block's buddy sits at
//! `offset ^ size`, which is the same bit flip on the absolute address.

use std::ptr::NonNull;

use log::{debug, trace, warn};

use crate::{
  align_to,
  block::Block,
  config::{ARENA_SIZE, MIN_BLOCK_SIZE},
  error::{AllocError, Result},
  is_aligned, os,
};

/// Where the arena memory comes from.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Backing {
  /// Grow the program break with `sbrk`. The memory is never handed back.
  #[default]
  Break,
  /// One anonymous mapping, trimmed to a self-aligned window. Unmapped when
  /// the arena is dropped.
  Mapped,
}

pub struct Arena {
  base: NonNull<u8>,
  backing: Backing,
}

impl Arena {
  /// Reserves `ARENA_SIZE` bytes aligned to `ARENA_SIZE`.
  ///
  /// On failure nothing usable is returned; for the break backing the
  /// alignment padding may already have been consumed.
  pub fn reserve(
    backing: Backing,
  ) -> Result<Self> {
    let base = match backing {
      Backing::Break => Self::reserve_break(),
      Backing::Mapped => Self::reserve_mapped(),
    };

    let Some(base) = base else {
      warn!("failed to reserve a {ARENA_SIZE} byte arena ({backing:?})");
      return Err(AllocError::ArenaUnavailable);
    };

    debug!("reserved {ARENA_SIZE} byte arena at {:p} ({backing:?})", base);

    Ok(Self { base, backing })
  }

  fn reserve_break() -> Option<NonNull<u8>> {
    let current = os::program_break()?;
    let aligned = align_to!(current, ARENA_SIZE);
    let padding = aligned - current;

    unsafe {
      let padded_from = os::grow_break(padding)?;
      let start = os::grow_break(ARENA_SIZE)?;

      if start != aligned {
        warn!("program break moved during arena setup: expected {aligned:#x}, got {start:#x}");

        // Only hand memory back while the break still ends where we left it.
        let taken = if padded_from + padding == start {
          padding + ARENA_SIZE
        } else {
          ARENA_SIZE
        };
        if os::program_break() == Some(start + ARENA_SIZE) && !os::shrink_break(taken) {
          warn!("failed to return {taken} bytes to the program break");
        }

        return None;
      }
    }

    NonNull::new(aligned as *mut u8)
  }

  fn reserve_mapped() -> Option<NonNull<u8>> {
    let span = 2 * ARENA_SIZE;
    let raw = os::map_anonymous(span)?;
    let start = raw.as_ptr() as usize;
    let aligned = align_to!(start, ARENA_SIZE);
    let head = aligned - start;
    let tail = ARENA_SIZE - head;

    unsafe {
      if head > 0 {
        release_span(raw, head);
      }
      if tail > 0 {
        release_span(raw.add(head + ARENA_SIZE), tail);
      }

      trace!("trimmed arena mapping: {head} bytes before, {tail} bytes after");

      Some(raw.add(head))
    }
  }

  pub fn base(
    &self,
  ) -> NonNull<u8> {
    self.base
  }

  pub fn contains(
    &self,
    address: usize,
  ) -> bool {
    let base = self.base.as_ptr() as usize;
    address >= base && address < base + ARENA_SIZE
  }

  /// Offset of a block header inside the arena.
  pub fn offset_of(
    &self,
    block: NonNull<Block>,
  ) -> usize {
    let address = block.as_ptr() as usize;
    debug_assert!(self.contains(address));

    address - self.base.as_ptr() as usize
  }

  /// Header at `offset`. The offset must be below `ARENA_SIZE`.
  pub fn block(
    &self,
    offset: usize,
  ) -> NonNull<Block> {
    debug_assert!(offset < ARENA_SIZE);
    debug_assert!(is_aligned!(offset, MIN_BLOCK_SIZE));

    // SAFETY: offset lies inside the arena reservation.
    unsafe { self.base.add(offset).cast() }
  }

  /// Writes a fresh, unlinked header of `order` at `offset`.
  ///
  /// # Safety
  ///
  /// No live block may overlap the header's bytes.
  pub unsafe fn init_block(
    &self,
    offset: usize,
    order: usize,
  ) -> NonNull<Block> {
    let block = self.block(offset);
    unsafe { block.write(Block::buddy(order)) };
    block
  }
}

impl Drop for Arena {
  fn drop(
    &mut self,
  ) {
    if self.backing == Backing::Mapped {
      debug!("releasing arena at {:p}", self.base);

      unsafe { release_span(self.base, ARENA_SIZE) };
    }
  }
}

/// Unmaps part of an arena mapping, logging when the kernel refuses.
///
/// # Safety
///
/// The span must not be used afterwards.
unsafe fn release_span(
  address: NonNull<u8>,
  len: usize,
) -> bool {
  let released = unsafe { os::unmap(address, len) };

  if !released {
    warn!("munmap of {len} bytes at {:p} failed", address);
  }

  released
}
