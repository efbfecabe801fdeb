//! # rbuddy - A Buddy-System Memory Allocator
//!
//! This crate provides a **buddy allocator** that manages a single, fixed-size
//! arena carved out of the program break (`sbrk`), and hands large requests
//! straight to `mmap`.
//!
//! ## Overview
//!
//! Every arena block is a power of two in size, between 128 bytes (order 0)
//! and 128 KiB (order 10). A request is rounded up to the smallest order that
//! fits, and a bigger free block is halved until it reaches that order:
//!
//! ```text
//!   Splitting a 128 KiB block for a 100 byte request (order 1):
//!
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                          order 10 (free)                         │
//!   └──────────────────────────────────────────────────────────────────┘
//!                                   │ split ×9
//!                                   ▼
//!   ┌────┬────┬───────┬─────────────┬─────┬──────────────────────────────┐
//!   │ A  │ o1 │  o2   │     o3      │ ... │          order 9             │
//!   └────┴────┴───────┴─────────────┴─────┴──────────────────────────────┘
//!     ▲
//!     └── order 1, handed out; every other piece goes on a free list
//! ```
//!
//! The arena is aligned to its own size, so a block's buddy is found by
//! flipping one bit of its offset:
//!
//! ```text
//!   buddy(offset) = offset ^ block_size(order)
//!
//!   0x0000 ^ 0x0100 = 0x0100      (A's buddy)
//!   0x0100 ^ 0x0100 = 0x0000      (and back)
//! ```
//!
//! Freeing a block merges it with its buddy for as long as the buddy is free
//! and of the same order, undoing the splits.
//!
//! ## Crate Structure
//!
//! ```text
//!   rbuddy
//!   ├── align      - Alignment macros (align_to!, is_aligned!)
//!   ├── config     - Size classes and fixed limits
//!   ├── block      - Block header (internal)
//!   ├── os         - sbrk/mmap wrappers
//!   ├── arena      - Self-aligned arena reservation
//!   ├── free_list  - Per-order free lists (internal)
//!   ├── mapped     - Large-block mmap path (internal)
//!   ├── buddy      - BuddyAllocator
//!   ├── stats      - Introspection accessors
//!   └── global     - LockedBuddy, a GlobalAlloc adapter
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rbuddy::{Backing, BuddyAllocator};
//!
//! fn main() {
//!     let mut allocator = BuddyAllocator::with_backing(Backing::Mapped);
//!
//!     let ptr = allocator.allocate(100).unwrap();
//!     unsafe {
//!         ptr.as_ptr().write_bytes(0xAB, 100);
//!         allocator.release(ptr.as_ptr());
//!     }
//!
//!     assert_eq!(allocator.free_blocks(), 32);
//! }
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size            │  │                                │
//!   │  │ next / prev     │  │     block_size(order)          │
//!   │  │ order           │  │       - header size            │
//!   │  │ is_free         │  │                                │
//!   │  │ is_mapped       │  │                                │
//!   │  └─────────────────┘  │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! Free-list links are arena offsets; mapped-list links are addresses.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: wrap it in [`LockedBuddy`] to share it
//! - **Fixed arena**: 32 × 128 KiB, never grown or shrunk
//! - **No shrinking realloc**: a block that already fits is returned as is
//! - **Unix-only**: requires `libc`, `sbrk` and `mmap`

pub mod align;
mod arena;
mod block;
mod buddy;
pub mod config;
mod error;
mod free_list;
mod global;
mod mapped;
pub mod os;
mod stats;

pub use arena::Backing;
pub use block::{HEADER_SIZE, PAYLOAD_ALIGN};
pub use buddy::BuddyAllocator;
pub use error::{AllocError, Result};
pub use global::LockedBuddy;
pub use os::program_break;
pub use stats::Stats;
