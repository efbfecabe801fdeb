//! `GlobalAlloc` adapter: one allocator behind one spin lock.
//!
//! ```rust,ignore
//! use rbuddy::LockedBuddy;
//!
//! #[global_allocator]
//! static ALLOCATOR: LockedBuddy = LockedBuddy::new();
//! ```
//!
//! Loggers installed in such a process must not allocate, or the first
//! `trace!` from inside the lock deadlocks.

use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use spin::{Mutex, MutexGuard};

use crate::{arena::Backing, block::PAYLOAD_ALIGN, buddy::BuddyAllocator};

pub struct LockedBuddy {
  inner: Mutex<BuddyAllocator>,
}

impl LockedBuddy {
  /// Uses a mapped arena so the program break stays free for anyone else.
  pub const fn new() -> Self {
    Self::with_backing(Backing::Mapped)
  }

  pub const fn with_backing(
    backing: Backing,
  ) -> Self {
    Self {
      inner: Mutex::new(BuddyAllocator::with_backing(backing)),
    }
  }

  pub fn lock(
    &self,
  ) -> MutexGuard<'_, BuddyAllocator> {
    self.inner.lock()
  }
}

impl Default for LockedBuddy {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl GlobalAlloc for LockedBuddy {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > PAYLOAD_ALIGN {
      return ptr::null_mut();
    }

    self.lock().allocate(layout.size()).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > PAYLOAD_ALIGN {
      return ptr::null_mut();
    }

    self.lock().allocate_zeroed(1, layout.size()).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    address: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.lock().release(address) };
  }

  unsafe fn realloc(
    &self,
    address: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > PAYLOAD_ALIGN {
      return ptr::null_mut();
    }

    unsafe { self.lock().reallocate(address, new_size) }.map_or(ptr::null_mut(), NonNull::as_ptr)
  }
}
