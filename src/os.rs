//! Thin wrappers over the process break and anonymous mappings.

use std::ptr::{self, NonNull};

use libc::{c_void, intptr_t, sbrk};

/// Current program break, `sbrk(0)`.
pub fn program_break() -> Option<usize> {
  let current = unsafe { sbrk(0) };

  if current == usize::MAX as *mut c_void {
    return None;
  }

  Some(current as usize)
}

/// Moves the program break up by `increment` bytes and returns the old break,
/// which is the start of the newly available memory.
///
/// # Safety
///
/// Nothing else in the process may rely on the break staying put.
pub unsafe fn grow_break(
  increment: usize,
) -> Option<usize> {
  let increment = intptr_t::try_from(increment).ok()?;
  let previous = unsafe { sbrk(increment) };

  if previous == usize::MAX as *mut c_void {
    return None;
  }

  Some(previous as usize)
}

/// Moves the program break down by `decrement` bytes. Returns `false` if the
/// kernel refused.
///
/// # Safety
///
/// The released bytes must be the topmost ones below the break, and nothing
/// may use them afterwards.
pub unsafe fn shrink_break(
  decrement: usize,
) -> bool {
  let Ok(decrement) = intptr_t::try_from(decrement) else {
    return false;
  };

  unsafe { sbrk(-decrement) != usize::MAX as *mut c_void }
}

/// Maps `len` bytes of fresh, zero-filled, private anonymous memory.
pub fn map_anonymous(
  len: usize,
) -> Option<NonNull<u8>> {
  let address = unsafe {
    libc::mmap(
      ptr::null_mut(),
      len,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
      -1,
      0,
    )
  };

  if address == libc::MAP_FAILED {
    return None;
  }

  NonNull::new(address.cast())
}

/// Unmaps `len` bytes at `address`. Returns `false` if the kernel refused.
///
/// # Safety
///
/// The range must have come from [`map_anonymous`] and must not be used
/// afterwards.
pub unsafe fn unmap(
  address: NonNull<u8>,
  len: usize,
) -> bool {
  unsafe { libc::munmap(address.as_ptr().cast(), len) == 0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_map_is_zeroed_and_writable() {
    let len = 3 * 4096;
    let address = map_anonymous(len).expect("mmap failed");

    unsafe {
      let bytes = std::slice::from_raw_parts_mut(address.as_ptr(), len);
      assert!(bytes.iter().all(|&b| b == 0));

      bytes.fill(0x5A);
      assert_eq!(bytes[len - 1], 0x5A);

      assert!(unmap(address, len));
    }
  }

  #[test]
  fn test_program_break_is_readable() {
    assert!(program_break().is_some());
  }
}
