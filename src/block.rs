use std::{mem, ptr::NonNull};

use crate::config::block_size;

/// Bytes occupied by the header in front of every block.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Alignment every payload pointer is guaranteed to have.
///
/// Arena blocks start on multiples of `MIN_BLOCK_SIZE` and mapped blocks on
/// page boundaries, so a payload is aligned to the largest power of two that
/// divides the header size.
pub const PAYLOAD_ALIGN: usize = 1 << HEADER_SIZE.trailing_zeros();

/// Order recorded for blocks that live in their own mapping.
pub const MAPPED_ORDER: u8 = u8::MAX;

/// Metadata stored in front of every block.
///
/// `next`/`prev` link the block into exactly one list: a free list, where
/// they hold arena offsets, or the mapped-block list, where they hold
/// addresses.
#[repr(C)]
pub struct Block {
  pub size: usize,
  pub next: Option<usize>,
  pub prev: Option<usize>,
  pub order: u8,
  pub is_free: bool,
  pub is_mapped: bool,
}

impl Block {
  /// Header of a buddy block, not linked into any list yet.
  pub fn buddy(
    order: usize,
  ) -> Self {
    Self {
      size: block_size(order),
      next: None,
      prev: None,
      order: order as u8,
      is_free: false,
      is_mapped: false,
    }
  }

  /// Header of a mapped block spanning `size` bytes.
  pub fn mapped(
    size: usize,
  ) -> Self {
    Self {
      size,
      next: None,
      prev: None,
      order: MAPPED_ORDER,
      is_free: false,
      is_mapped: true,
    }
  }

  /// Bytes usable by the caller.
  pub fn capacity(
    &self,
  ) -> usize {
    if self.is_mapped {
      self.size - HEADER_SIZE
    } else {
      block_size(self.order as usize) - HEADER_SIZE
    }
  }

  /// Recovers the header from a payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by this allocator.
  pub unsafe fn from_payload(
    payload: NonNull<u8>,
  ) -> NonNull<Block> {
    unsafe { payload.sub(HEADER_SIZE).cast() }
  }

  /// Payload pointer of the block whose header is at `block`.
  pub fn payload(
    block: NonNull<Block>,
  ) -> NonNull<u8> {
    // SAFETY: every block is at least MIN_BLOCK_SIZE > HEADER_SIZE bytes long.
    unsafe { block.cast::<u8>().add(HEADER_SIZE) }
  }
}
