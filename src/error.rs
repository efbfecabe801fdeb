use crate::config::{MAX_ALLOC, MAX_ORDER};

/// Why an allocator call could not be satisfied.
///
/// Every failure leaves the allocator exactly as it was before the call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  #[error("requested {requested} bytes, valid sizes are 1..={}", MAX_ALLOC)]
  InvalidSize { requested: usize },
  #[error("{count} elements of {size} bytes overflow the {} byte limit", MAX_ALLOC)]
  Overflow { count: usize, size: usize },
  #[error("no free block of order {order} or above (max order {})", MAX_ORDER)]
  OutOfMemory { order: usize },
  #[error("the buddy arena could not be reserved")]
  ArenaUnavailable,
  #[error("failed to map {bytes} bytes of anonymous memory")]
  MapFailed { bytes: usize },
}

pub type Result<T> = core::result::Result<T, AllocError>;
