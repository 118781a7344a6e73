//! # twinlock
//!
//! An unbounded FIFO queue for concurrent producers and consumers, built on the
//! classic two-lock linked list: one lock guards the tail, another guards the
//! head, so enqueuers and dequeuers do not contend with each other.
//!
//! ## Features
//!
//! - **Two-lock queue**: [`TwoLockQueue`] with non-blocking `enqueue`/`dequeue`
//! - **Batching**: link or unlink many values under a single lock acquisition
//! - **Bounded waiting**: optional backoff-based `dequeue_timeout`/`dequeue_wait`
//!
//! ## Quick Start
//!
//! ```rust
//! use twinlock::TwoLockQueue;
//!
//! let queue = TwoLockQueue::new();
//! queue.enqueue(42);
//! assert_eq!(queue.dequeue(), Some(42));
//! assert_eq!(queue.dequeue(), None);
//! ```
//!
//! ## Thread Safety
//!
//! [`TwoLockQueue<T>`] is `Send + Sync` whenever `T: Send`. Share it between
//! threads with an [`Arc`](std::sync::Arc).
//!
//! ## Cargo features
//!
//! - `tracing`: emit lifecycle and timeout events through the `tracing` crate.
//!
//! Building with `RUSTFLAGS="--cfg loom"` swaps the synchronization primitives
//! for the `loom` model checker's.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod queue;

mod sync;
mod trace;

pub use crate::queue::{BackoffConfig, TwoLockQueue};

/// Common utilities and helper types
pub mod util {
    /// Cache line size for alignment purposes
    pub const CACHE_LINE_SIZE: usize = 64;

    /// Pads and aligns a value to a cache line so neighbouring hot fields
    /// do not share one.
    #[repr(align(64))]
    pub struct CachePadded<T> {
        value: T,
    }

    impl<T> CachePadded<T> {
        /// Create a new cache-padded value
        #[inline]
        pub const fn new(value: T) -> Self {
            Self { value }
        }

        /// Get a reference to the inner value
        #[inline]
        pub const fn get(&self) -> &T {
            &self.value
        }

        /// Get a mutable reference to the inner value
        #[inline]
        pub fn get_mut(&mut self) -> &mut T {
            &mut self.value
        }

        /// Get the inner value
        #[inline]
        pub fn into_inner(self) -> T {
            self.value
        }
    }

    impl<T: Default> Default for CachePadded<T> {
        fn default() -> Self {
            Self::new(T::default())
        }
    }

    impl<T: core::fmt::Debug> core::fmt::Debug for CachePadded<T> {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            core::fmt::Debug::fmt(&self.value, f)
        }
    }
}

/// Error types for twinlock operations
///
/// An empty queue is not an error: [`TwoLockQueue::dequeue`] reports it as
/// `None`. Errors only come from the bounded-waiting helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No value arrived before the deadline
    #[error("Timed out waiting for a value")]
    Timeout,
}

/// Result type for twinlock operations
pub type Result<T> = core::result::Result<T, Error>;
