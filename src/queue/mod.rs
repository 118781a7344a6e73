//! Queue implementations
//!
//! ## Available Queues
//!
//! - [`TwoLockQueue`]: unbounded multi-producer, multi-consumer FIFO queue
//!   with independent head and tail locks
//!
//! ## Design
//!
//! - **Fine-grained locking**: producers take only the tail lock, consumers
//!   only the head lock
//! - **Memory ordering**: node links are published with `Release` and read
//!   with `Acquire`, so visibility does not depend on either lock
//! - **Cache optimization**: the two locks sit on separate cache lines
//! - **Comprehensive testing**: unit tests, stress tests, property tests, and
//!   loom model checking
//!
//! ## Performance Characteristics
//!
//! | Operation | Cost | Locks taken |
//! |-----------|------|-------------|
//! | `enqueue` | O(1) + one allocation | tail |
//! | `dequeue` | O(1) + one deallocation | head |
//! | `enqueue_batch(n)` | O(n) allocation, O(1) under lock | tail |
//! | `dequeue_batch(n)` | O(n) | head |
//!
//! ## Examples
//!
//! ```rust
//! use std::time::Duration;
//! use twinlock::queue::TwoLockQueue;
//!
//! let queue = TwoLockQueue::new();
//! queue.enqueue("hello");
//! assert_eq!(queue.dequeue(), Some("hello"));
//!
//! // Empty is a normal outcome, not an error
//! assert_eq!(queue.dequeue(), None);
//!
//! // Callers that want to wait can layer a timeout on top
//! assert!(queue.dequeue_timeout(Duration::from_millis(1)).is_err());
//! ```
mod backoff;
pub mod two_lock;

pub use backoff::BackoffConfig;
pub use two_lock::{IntoIter, TwoLockQueue};


#[cfg(all(test, not(loom)))]
mod proptests;
