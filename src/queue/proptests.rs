//! Property-based tests for the two-lock queue using proptest
//!
//! These check the queue against a `VecDeque` model for arbitrary operation
//! sequences, and check conservation for arbitrary thread counts.

use super::TwoLockQueue;
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    Enqueue(i32),
    EnqueueBatch(Vec<i32>),
    Dequeue,
    DequeueBatch(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i32>().prop_map(Op::Enqueue),
        1 => prop::collection::vec(any::<i32>(), 0..8).prop_map(Op::EnqueueBatch),
        3 => Just(Op::Dequeue),
        1 => (0usize..8).prop_map(Op::DequeueBatch),
    ]
}

/// Property: a single-threaded run matches a sequential FIFO model
mod sequential_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_fifo_ordering_single_thread(
            batches in prop::collection::vec(
                prop::collection::vec(any::<i32>(), 1..10),
                1..5
            )
        ) {
            let queue = TwoLockQueue::new();
            let mut expected = Vec::new();

            for batch in &batches {
                for &value in batch {
                    queue.enqueue(value);
                    expected.push(value);
                }
            }

            for expected_value in expected {
                prop_assert_eq!(queue.dequeue(), Some(expected_value));
            }

            prop_assert!(queue.is_empty());
            prop_assert_eq!(queue.dequeue(), None);
        }

        #[test]
        fn test_matches_vecdeque_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let queue = TwoLockQueue::new();
            let mut model = VecDeque::new();

            for op in ops {
                match op {
                    Op::Enqueue(value) => {
                        queue.enqueue(value);
                        model.push_back(value);
                    }
                    Op::EnqueueBatch(values) => {
                        queue.enqueue_batch(values.iter().copied());
                        model.extend(values);
                    }
                    Op::Dequeue => {
                        prop_assert_eq!(queue.dequeue(), model.pop_front());
                    }
                    Op::DequeueBatch(max) => {
                        let take = max.min(model.len());
                        let expected: Vec<i32> = model.drain(..take).collect();
                        prop_assert_eq!(queue.dequeue_batch(max), expected);
                    }
                }
                prop_assert_eq!(queue.is_empty(), model.is_empty());
            }

            let rest: Vec<i32> = queue.into_iter().collect();
            prop_assert_eq!(rest, Vec::from(model));
        }

        #[test]
        fn test_empty_dequeues_are_idempotent(
            empty_polls in 1usize..50,
            values in prop::collection::vec(any::<u8>(), 0..20)
        ) {
            let queue = TwoLockQueue::new();
            for _ in 0..empty_polls {
                prop_assert_eq!(queue.dequeue(), None);
            }

            queue.enqueue_batch(values.iter().copied());
            let drained = queue.dequeue_batch(usize::MAX);
            prop_assert_eq!(drained, values);

            for _ in 0..empty_polls {
                prop_assert_eq!(queue.dequeue(), None);
            }
        }
    }
}

/// Property: concurrent producers and consumers neither lose nor duplicate
mod concurrent_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_conservation(
            producers in 1usize..5,
            consumers in 1usize..5,
            per_producer in 1usize..300
        ) {
            let queue = Arc::new(TwoLockQueue::new());
            let total = producers * per_producer;

            let producer_handles: Vec<_> = (0..producers)
                .map(|producer_id| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        for i in 0..per_producer {
                            queue.enqueue(producer_id * per_producer + i);
                        }
                    })
                })
                .collect();

            // Split the total across consumers; the first takes the remainder
            let consumer_handles: Vec<_> = (0..consumers)
                .map(|consumer_id| {
                    let queue = Arc::clone(&queue);
                    let quota = total / consumers
                        + if consumer_id == 0 { total % consumers } else { 0 };
                    thread::spawn(move || {
                        (0..quota).map(|_| queue.dequeue_wait()).collect::<Vec<_>>()
                    })
                })
                .collect();

            for handle in producer_handles {
                handle.join().unwrap();
            }

            let mut collected = Vec::with_capacity(total);
            for handle in consumer_handles {
                collected.extend(handle.join().unwrap());
            }

            collected.sort_unstable();
            prop_assert_eq!(collected, (0..total).collect::<Vec<_>>());
            prop_assert_eq!(queue.dequeue(), None);
        }
    }
}
