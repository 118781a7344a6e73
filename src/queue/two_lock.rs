//! Two-Lock Concurrent Queue
//!
//! An unbounded FIFO queue built from a singly linked list with a permanent
//! sentinel node. The tail end and the head end each have their own mutex:
//!
//! - `enqueue` takes only the tail lock
//! - `dequeue` takes only the head lock
//!
//! so producers and consumers run concurrently and only contend with their
//! own kind.
//!
//! ## Layout
//!
//! ```text
//!   head                                   tail
//!    |                                      |
//!    v                                      v
//! [sentinel] -> [ a ] -> [ b ] -> ... -> [ z ] -> null
//! ```
//!
//! The sentinel's payload slot is always empty. A dequeue moves the value out
//! of the node after the sentinel, makes that node the new sentinel, and frees
//! the old one. The queue is empty exactly when the sentinel has no successor.
//!
//! ## Memory Ordering Model
//!
//! The two critical sections never share a lock, so the mutexes alone do not
//! order an enqueue before the dequeue that consumes its node. The `next`
//! link carries that edge instead:
//!
//! ```text
//! Producer (enqueue, tail lock)      Consumer (dequeue, head lock)
//! -----------------------------      -----------------------------
//! Write payload into new node
//! Store tail.next = node  ---->      Load sentinel.next
//!   (Release)                          (Acquire)
//!                                    Read payload out of node
//! ```
//!
//! ## Reclamation
//!
//! A node stops being the sentinel only after it has a successor. By then
//! the enqueuer that linked the successor has finished with it and no other
//! enqueuer can reach it, so the dequeuer that retires it frees it at once.

#[cfg(not(loom))]
use super::backoff::BackoffConfig;
use crate::sync::{AtomicPtr, Lock, Ordering, UnsafeCell};
#[cfg(not(loom))]
use crate::trace::debug;
use crate::trace::trace;
use crate::util::CachePadded;
#[cfg(not(loom))]
use crate::{Error, Result};
use core::fmt;
use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ptr;
#[cfg(not(loom))]
use std::time::{Duration, Instant};

/// A link in the queue's chain.
struct Node<T> {
    /// Uninitialised while the node is the sentinel
    value: UnsafeCell<MaybeUninit<T>>,
    /// Null until the following node is linked
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn sentinel() -> *mut Self {
        Box::into_raw(Box::new(Node {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    fn alloc(value: T) -> *mut Self {
        Box::into_raw(Box::new(Node {
            value: UnsafeCell::new(MaybeUninit::new(value)),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    /// Move the payload out, leaving the slot uninitialised.
    ///
    /// # Safety
    ///
    /// The slot must be initialised and must not be read again.
    unsafe fn take_value(&self) -> T {
        self.value
            .with_mut(|slot| unsafe { (*slot).assume_init_read() })
    }
}

/// Owns a chain of initialised nodes that has not been linked into a queue.
///
/// Dropping it drops every payload and frees every node up to the null link.
struct ChainGuard<T> {
    first: *mut Node<T>,
}

impl<T> Drop for ChainGuard<T> {
    fn drop(&mut self) {
        let mut node = self.first;
        while !node.is_null() {
            // SAFETY: the chain is private to this guard and every node in it
            // holds an initialised payload.
            unsafe {
                let next = (*node).next.load(Ordering::Relaxed);
                drop((*node).take_value());
                drop(Box::from_raw(node));
                node = next;
            }
        }
    }
}

/// An unbounded multi-producer, multi-consumer FIFO queue with separate head
/// and tail locks.
///
/// # Memory Ordering
///
/// - `enqueue`: links the new node with a `Release` store under the tail lock
/// - `dequeue`: reads the sentinel's successor with an `Acquire` load under
///   the head lock
///
/// # Performance Characteristics
///
/// - **Enqueue**: O(1), one allocation outside the lock
/// - **Dequeue**: O(1), returns `None` immediately when empty
/// - **Memory**: one heap node per element plus the sentinel
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
/// use twinlock::TwoLockQueue;
///
/// let queue = Arc::new(TwoLockQueue::new());
///
/// let producer = thread::spawn({
///     let queue = Arc::clone(&queue);
///     move || {
///         for i in 0..100 {
///             queue.enqueue(i);
///         }
///     }
/// });
///
/// let consumer = thread::spawn({
///     let queue = Arc::clone(&queue);
///     move || {
///         let mut sum = 0;
///         for _ in 0..100 {
///             sum += queue.dequeue_wait();
///         }
///         sum
///     }
/// });
///
/// producer.join().unwrap();
/// assert_eq!(consumer.join().unwrap(), 4950);
/// ```
///
/// # Thread Safety
///
/// `TwoLockQueue<T>` is `Send + Sync` for `T: Send`. Enqueues are serialized
/// by the tail lock, dequeues by the head lock; the two ends never wait on
/// each other.
pub struct TwoLockQueue<T> {
    /// Current sentinel. Cache-padded away from `tail`.
    head: CachePadded<Lock<*mut Node<T>>>,

    /// Last node in the chain.
    tail: CachePadded<Lock<*mut Node<T>>>,

    _marker: PhantomData<Box<Node<T>>>,
}

// SAFETY: the raw node pointers are only dereferenced under the lock that
// owns them, and payloads cross threads by value.
unsafe impl<T: Send> Send for TwoLockQueue<T> {}
unsafe impl<T: Send> Sync for TwoLockQueue<T> {}

impl<T> TwoLockQueue<T> {
    /// Create an empty queue
    ///
    /// The queue starts with a single sentinel node that both `head` and
    /// `tail` reference.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use twinlock::TwoLockQueue;
    ///
    /// let queue: TwoLockQueue<i32> = TwoLockQueue::new();
    /// assert!(queue.is_empty());
    /// ```
    pub fn new() -> Self {
        let sentinel = Node::sentinel();
        trace!("created two-lock queue");

        Self {
            head: CachePadded::new(Lock::new(sentinel)),
            tail: CachePadded::new(Lock::new(sentinel)),
            _marker: PhantomData,
        }
    }

    /// Append a value at the tail
    ///
    /// Allocates the node before taking the tail lock, then links it and
    /// advances `tail`. Never touches the head lock and never fails.
    ///
    /// # Arguments
    ///
    /// * `value` - The element to enqueue
    ///
    /// # Memory Ordering
    ///
    /// The link to the new node is stored with `Release`, publishing the
    /// payload to whichever dequeuer later loads it with `Acquire`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use twinlock::TwoLockQueue;
    ///
    /// let queue = TwoLockQueue::new();
    /// queue.enqueue("hello");
    /// assert!(!queue.is_empty());
    /// ```
    #[inline]
    pub fn enqueue(&self, value: T) {
        let node = Node::alloc(value);
        // SAFETY: `node` is a fresh, unshared allocation with a null `next`.
        unsafe { self.link(node, node) };
    }

    /// Append every value from `values` as one contiguous run
    ///
    /// The chain is built before the tail lock is taken and linked with a
    /// single store, so values from other producers never interleave with
    /// the batch.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use twinlock::TwoLockQueue;
    ///
    /// let queue = TwoLockQueue::new();
    /// queue.enqueue_batch(1..=3);
    /// assert_eq!(queue.dequeue_batch(10), vec![1, 2, 3]);
    /// ```
    pub fn enqueue_batch<I>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut values = values.into_iter();
        let first = match values.next() {
            Some(value) => Node::alloc(value),
            None => return,
        };

        // Frees the partial chain if `values` panics.
        let chain = ChainGuard { first };
        let mut last = first;
        for value in values {
            let node = Node::alloc(value);
            // SAFETY: `last` is ours until `link` publishes the chain; its
            // release store also publishes these relaxed links.
            unsafe { (*last).next.store(node, Ordering::Relaxed) };
            last = node;
        }
        mem::forget(chain);

        // SAFETY: `first..=last` is a private chain ending in a null link.
        unsafe { self.link(first, last) };
    }

    /// Link the private chain `first..=last` after the current tail.
    ///
    /// # Safety
    ///
    /// `first..=last` must be freshly allocated nodes with initialised
    /// payloads, linked through `next`, with `last.next` null, and not yet
    /// reachable by any other thread.
    unsafe fn link(&self, first: *mut Node<T>, last: *mut Node<T>) {
        let mut tail = self.tail.get().lock();
        // SAFETY: the tail node stays allocated until its `next` is set, and
        // only the tail-lock holder sets it. After this store the node may be
        // retired by a dequeuer, so it is not dereferenced again.
        unsafe { (**tail).next.store(first, Ordering::Release) };
        *tail = last;
    }

    /// Remove the value at the head
    ///
    /// Never blocks on the tail lock and never waits for a value to arrive.
    ///
    /// # Returns
    ///
    /// * `Some(value)` - the oldest value in the queue
    /// * `None` - the queue is empty; this is a normal state, not an error
    ///
    /// # Memory Ordering
    ///
    /// The sentinel's successor is loaded with `Acquire`, pairing with the
    /// `Release` store of the enqueue that linked it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use twinlock::TwoLockQueue;
    ///
    /// let queue = TwoLockQueue::new();
    /// queue.enqueue(42);
    /// assert_eq!(queue.dequeue(), Some(42));
    /// assert_eq!(queue.dequeue(), None);
    /// ```
    #[inline]
    pub fn dequeue(&self) -> Option<T> {
        let mut head = self.head.get().lock();
        let sentinel = *head;
        // SAFETY: `head` always points at the live sentinel, which only the
        // head-lock holder may retire.
        let next = unsafe { (*sentinel).next.load(Ordering::Acquire) };
        if next.is_null() {
            return None;
        }

        // SAFETY: a non-null link was published by an enqueue and carries an
        // initialised payload. The node becomes the sentinel, so its slot is
        // never read again.
        let value = unsafe { (*next).take_value() };
        *head = next;
        drop(head);

        // SAFETY: the old sentinel has a successor, so no enqueuer will touch
        // it and `head` no longer reaches it.
        unsafe { drop(Box::from_raw(sentinel)) };
        Some(value)
    }

    /// Remove up to `max` values under one head-lock acquisition
    ///
    /// Stops early when the queue runs empty. Retired nodes are freed after
    /// the lock is released.
    ///
    /// The head lock is held while the whole batch is unlinked, so other
    /// consumers wait for the length of the batch rather than a single step.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use twinlock::TwoLockQueue;
    ///
    /// let queue = TwoLockQueue::new();
    /// queue.enqueue(1);
    /// queue.enqueue(2);
    /// queue.enqueue(3);
    ///
    /// assert_eq!(queue.dequeue_batch(2), vec![1, 2]);
    /// assert_eq!(queue.dequeue_batch(2), vec![3]);
    /// assert!(queue.dequeue_batch(2).is_empty());
    /// ```
    pub fn dequeue_batch(&self, max: usize) -> Vec<T> {
        let mut values = Vec::new();
        if max == 0 {
            return values;
        }

        let retired = {
            let mut head = self.head.get().lock();
            let retired = *head;
            let mut sentinel = retired;
            while values.len() < max {
                // SAFETY: same as `dequeue`, repeated along the chain.
                let next = unsafe { (*sentinel).next.load(Ordering::Acquire) };
                if next.is_null() {
                    break;
                }
                values.push(unsafe { (*next).take_value() });
                sentinel = next;
            }
            *head = sentinel;
            retired
        };

        let mut node = retired;
        for _ in 0..values.len() {
            // SAFETY: the first `values.len()` nodes from `retired` are now
            // unreachable from the queue, and each has a set `next`.
            unsafe {
                let next = (*node).next.load(Ordering::Relaxed);
                drop(Box::from_raw(node));
                node = next;
            }
        }

        trace!(count = values.len(), "dequeued batch");
        values
    }

    /// Check whether the queue is empty
    ///
    /// Takes the head lock. The answer is a snapshot and may be stale by the
    /// time it is used under concurrent access.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use twinlock::TwoLockQueue;
    ///
    /// let queue = TwoLockQueue::new();
    /// assert!(queue.is_empty());
    /// queue.enqueue(1);
    /// assert!(!queue.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        let head = self.head.get().lock();
        // SAFETY: `head` points at the live sentinel while we hold its lock.
        unsafe { (**head).next.load(Ordering::Acquire).is_null() }
    }
}

#[cfg(not(loom))]
impl<T> TwoLockQueue<T> {
    /// Dequeue, retrying with the default backoff until `timeout` expires
    ///
    /// The head lock is never held while sleeping. A zero timeout makes
    /// exactly one attempt.
    ///
    /// # Returns
    ///
    /// * `Ok(value)` if a value arrived in time
    /// * `Err(Error::Timeout)` otherwise
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use twinlock::{Error, TwoLockQueue};
    ///
    /// let queue: TwoLockQueue<i32> = TwoLockQueue::new();
    /// assert_eq!(queue.dequeue_timeout(Duration::from_millis(10)), Err(Error::Timeout));
    /// ```
    pub fn dequeue_timeout(&self, timeout: Duration) -> Result<T> {
        self.dequeue_timeout_with(timeout, &BackoffConfig::default())
    }

    /// Like [`dequeue_timeout`](Self::dequeue_timeout) with a custom backoff
    pub fn dequeue_timeout_with(&self, timeout: Duration, backoff: &BackoffConfig) -> Result<T> {
        let start = Instant::now();
        let mut backoff = backoff.start();

        loop {
            if let Some(value) = self.dequeue() {
                return Ok(value);
            }

            let remaining = match timeout.checked_sub(start.elapsed()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => break,
            };
            std::thread::sleep(backoff.next_delay().min(remaining));
        }

        debug!(?timeout, "dequeue timed out");
        Err(Error::Timeout)
    }

    /// Dequeue, sleeping with the default backoff until a value arrives
    ///
    /// Waits forever if nothing is ever enqueued.
    pub fn dequeue_wait(&self) -> T {
        self.dequeue_wait_with(&BackoffConfig::default())
    }

    /// Like [`dequeue_wait`](Self::dequeue_wait) with a custom backoff
    pub fn dequeue_wait_with(&self, backoff: &BackoffConfig) -> T {
        let mut backoff = backoff.start();
        loop {
            if let Some(value) = self.dequeue() {
                return value;
            }
            std::thread::sleep(backoff.next_delay());
        }
    }
}

impl<T> Default for TwoLockQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TwoLockQueue<T> {
    fn drop(&mut self) {
        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        let remaining = core::iter::from_fn(|| self.dequeue()).count();

        let sentinel = *self.head.get().lock();
        // SAFETY: the queue is drained, so the sentinel is the only node left
        // and nothing else can reach it.
        unsafe { drop(Box::from_raw(sentinel)) };
        trace!(remaining, "dropped two-lock queue");
    }
}

impl<T> fmt::Debug for TwoLockQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoLockQueue")
            .field("is_empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

impl<T> Extend<T> for TwoLockQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.enqueue_batch(iter);
    }
}

impl<T> FromIterator<T> for TwoLockQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let queue = Self::new();
        queue.enqueue_batch(iter);
        queue
    }
}

/// Consuming iterator over a [`TwoLockQueue`] in FIFO order
pub struct IntoIter<T> {
    queue: TwoLockQueue<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.dequeue()
    }
}

impl<T> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoIter").field("queue", &self.queue).finish()
    }
}

impl<T> IntoIterator for TwoLockQueue<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { queue: self }
    }
}
