//! One address-ordered free list per buddy order.
//!
//! ```text
//!   heads[0]  ──► 0x0080 ◄──► 0x1880
//!   heads[1]  ──► 0x0100
//!   heads[2]  ──► (empty)
//!   ...
//!   heads[10] ──► 0x20000 ◄──► 0x40000 ◄──► ...
//! ```
//!
//! Entries are arena offsets; the links live in the block headers.

use crate::{arena::Arena, config::MAX_ORDER};

pub struct FreeLists {
  heads: [Option<usize>; MAX_ORDER + 1],
}

impl FreeLists {
  pub const fn new() -> Self {
    Self {
      heads: [None; MAX_ORDER + 1],
    }
  }

  pub fn head(
    &self,
    order: usize,
  ) -> Option<usize> {
    self.heads[order]
  }

  /// Marks the block at `offset` free and links it into the list for its
  /// order, keeping the list sorted by ascending offset.
  ///
  /// # Safety
  ///
  /// `offset` must hold a valid header that is not on any list.
  pub unsafe fn insert(
    &mut self,
    arena: &Arena,
    offset: usize,
  ) {
    unsafe {
      let block = arena.block(offset).as_ptr();
      let order = (*block).order as usize;
      (*block).is_free = true;

      let mut previous = None;
      let mut cursor = self.heads[order];

      while let Some(current) = cursor {
        if current > offset {
          break;
        }
        previous = Some(current);
        cursor = (*arena.block(current).as_ptr()).next;
      }

      (*block).prev = previous;
      (*block).next = cursor;

      if let Some(next) = cursor {
        (*arena.block(next).as_ptr()).prev = Some(offset);
      }

      match previous {
        Some(prev) => (*arena.block(prev).as_ptr()).next = Some(offset),
        None => self.heads[order] = Some(offset),
      }
    }
  }

  /// Unlinks the free block at `offset` and marks it in use.
  ///
  /// # Safety
  ///
  /// `offset` must be on the list for its recorded order.
  pub unsafe fn remove(
    &mut self,
    arena: &Arena,
    offset: usize,
  ) {
    unsafe {
      let block = arena.block(offset).as_ptr();
      debug_assert!((*block).is_free);

      match (*block).prev {
        Some(prev) => (*arena.block(prev).as_ptr()).next = (*block).next,
        None => self.heads[(*block).order as usize] = (*block).next,
      }

      if let Some(next) = (*block).next {
        (*arena.block(next).as_ptr()).prev = (*block).prev;
      }

      (*block).next = None;
      (*block).prev = None;
      (*block).is_free = false;
    }
  }

  /// Takes the lowest-addressed block from the smallest non-empty list at or
  /// above `order`.
  ///
  /// # Safety
  ///
  /// The lists must be consistent with the headers in `arena`.
  pub unsafe fn take_first_fit(
    &mut self,
    arena: &Arena,
    order: usize,
  ) -> Option<usize> {
    let found = (order..=MAX_ORDER).find_map(|candidate| self.head(candidate))?;
    unsafe { self.remove(arena, found) };
    Some(found)
  }

  /// Walks the list of `order` from the lowest offset up.
  pub fn iter<'a>(
    &self,
    arena: &'a Arena,
    order: usize,
  ) -> Iter<'a> {
    Iter {
      arena,
      cursor: self.heads[order],
    }
  }
}

pub struct Iter<'a> {
  arena: &'a Arena,
  cursor: Option<usize>,
}

impl Iterator for Iter<'_> {
  type Item = usize;

  fn next(
    &mut self,
  ) -> Option<usize> {
    let current = self.cursor?;
    // SAFETY: every offset reachable from a head holds a free block's header.
    self.cursor = unsafe { self.arena.block(current).as_ref() }.next;
    Some(current)
  }
}
