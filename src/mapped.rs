//! Large blocks served straight from `mmap`.
//!
//! ```text
//!   head ──► ┌────────┬──────────────┐     ┌────────┬────────────┐
//!            │ header │   payload    │ ◄─► │ header │  payload   │ ◄─► ...
//!            └────────┴──────────────┘     └────────┴────────────┘
//!             own mapping                    own mapping
//! ```
//!
//! Links hold addresses, and the list is unordered: new blocks go to the front.

use std::ptr::NonNull;

use log::{trace, warn};

use crate::{
  block::{Block, HEADER_SIZE},
  error::{AllocError, Result},
  os,
};

pub struct MappedList {
  head: Option<NonNull<Block>>,
}

impl MappedList {
  pub const fn new() -> Self {
    Self { head: None }
  }

  /// Maps a block big enough for `size` payload bytes and links it in.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    let total = size + HEADER_SIZE;

    let Some(memory) = os::map_anonymous(total) else {
      return Err(AllocError::MapFailed { bytes: total });
    };

    let block = memory.cast::<Block>();

    unsafe {
      block.write(Block::mapped(total));
      self.push_front(block);
    }

    trace!("mapped {total} bytes at {:p}", block);

    Ok(Block::payload(block))
  }

  /// Unlinks `block` and returns its memory to the OS.
  ///
  /// # Safety
  ///
  /// `block` must be a live block on this list.
  pub unsafe fn release(
    &mut self,
    block: NonNull<Block>,
  ) {
    unsafe {
      self.unlink(block);

      let size = block.as_ref().size;
      trace!("unmapping {size} bytes at {:p}", block);

      if !os::unmap(block.cast(), size) {
        warn!("munmap of {size} bytes at {:p} failed", block);
      }
    }
  }

  unsafe fn push_front(
    &mut self,
    block: NonNull<Block>,
  ) {
    unsafe {
      let header = block.as_ptr();
      (*header).prev = None;
      (*header).next = self.head.map(|head| head.as_ptr() as usize);

      if let Some(head) = self.head {
        (*head.as_ptr()).prev = Some(block.as_ptr() as usize);
      }
    }

    self.head = Some(block);
  }

  unsafe fn unlink(
    &mut self,
    block: NonNull<Block>,
  ) {
    unsafe {
      let header = block.as_ptr();
      debug_assert!((*header).is_mapped);

      match (*header).prev {
        Some(prev) => (*(prev as *mut Block)).next = (*header).next,
        None => self.head = (*header).next.and_then(|next| NonNull::new(next as *mut Block)),
      }

      if let Some(next) = (*header).next {
        (*(next as *mut Block)).prev = (*header).prev;
      }

      (*header).next = None;
      (*header).prev = None;
    }
  }

  pub fn iter(
    &self,
  ) -> Iter<'_> {
    Iter {
      cursor: self.head,
      _list: self,
    }
  }
}

impl Drop for MappedList {
  fn drop(
    &mut self,
  ) {
    while let Some(block) = self.head {
      unsafe { self.release(block) };
    }
  }
}

pub struct Iter<'a> {
  cursor: Option<NonNull<Block>>,
  _list: &'a MappedList,
}

impl<'a> Iterator for Iter<'a> {
  type Item = &'a Block;

  fn next(
    &mut self,
  ) -> Option<&'a Block> {
    let current = self.cursor?;
    // SAFETY: blocks stay mapped while they are on the list, and the list is
    // borrowed for 'a.
    let block = unsafe { current.as_ref() };
    self.cursor = block.next.and_then(|next| NonNull::new(next as *mut Block));
    Some(block)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sizes(
    list: &MappedList,
  ) -> Vec<usize> {
    list.iter().map(|block| block.size - HEADER_SIZE).collect()
  }

  #[test]
  fn test_allocate_pushes_front() {
    let mut list = MappedList::new();

    let a = list.allocate(200_000).unwrap();
    let b = list.allocate(300_000).unwrap();
    let c = list.allocate(400_000).unwrap();
    assert_eq!(sizes(&list), [400_000, 300_000, 200_000]);

    unsafe {
      let header = Block::from_payload(b).as_ref();
      assert!(header.is_mapped);
      assert!(!header.is_free);
      assert_eq!(header.capacity(), 300_000);

      for payload in [b, a, c] {
        list.release(Block::from_payload(payload));
      }
    }

    assert!(list.iter().next().is_none());
  }

  #[test]
  fn test_release_middle_and_ends() {
    let mut list = MappedList::new();
    let payloads: Vec<_> = (1..=4).map(|i| list.allocate(i * 150_000).unwrap()).collect();

    unsafe {
      list.release(Block::from_payload(payloads[1]));
      assert_eq!(sizes(&list), [600_000, 450_000, 150_000]);

      list.release(Block::from_payload(payloads[3]));
      assert_eq!(sizes(&list), [450_000, 150_000]);

      list.release(Block::from_payload(payloads[0]));
      assert_eq!(sizes(&list), [450_000]);

      list.release(Block::from_payload(payloads[2]));
    }

    assert!(sizes(&list).is_empty());
  }

  #[test]
  fn test_drop_unmaps_remaining_blocks() {
    let mut list = MappedList::new();
    list.allocate(500_000).unwrap();
    list.allocate(700_000).unwrap();

    drop(list);
  }

  #[test]
  fn test_payload_is_zeroed_and_writable() {
    let mut list = MappedList::new();
    let size = 256 * 1024;
    let payload = list.allocate(size).unwrap();

    unsafe {
      let bytes = std::slice::from_raw_parts_mut(payload.as_ptr(), size);
      assert!(bytes.iter().all(|&b| b == 0));
      bytes.fill(0xC3);

      list.release(Block::from_payload(payload));
    }
  }
}
