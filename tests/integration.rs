//! Integration tests for twinlock
//!
//! These drive the public API the way the producer/consumer harness does:
//! several producer threads, several consumer threads polling with a short
//! sleep on empty, and checks on what came out.

#![cfg(not(loom))]

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use twinlock::{BackoffConfig, Error, TwoLockQueue};

fn harness_backoff() -> BackoffConfig {
    let delay = Duration::from_micros(100);
    BackoffConfig::new(delay, delay)
}

/// Run `producers` threads each enqueueing `per_producer` tagged values and
/// `consumers` threads that together drain all of them.
fn run_harness(producers: usize, consumers: usize, per_producer: usize) -> Vec<(usize, usize)> {
    let queue = Arc::new(TwoLockQueue::new());
    let total = producers * per_producer;
    let barrier = Arc::new(Barrier::new(producers + consumers));

    let producer_handles: Vec<_> = (0..producers)
        .map(|producer_id| {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..per_producer {
                    queue.enqueue((producer_id, seq));
                }
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|consumer_id| {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let quota = total / consumers + if consumer_id == 0 { total % consumers } else { 0 };
            thread::spawn(move || {
                barrier.wait();
                let backoff = harness_backoff();
                (0..quota)
                    .map(|_| queue.dequeue_wait_with(&backoff))
                    .collect::<Vec<_>>()
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

    assert_eq!(queue.dequeue(), None, "queue should be drained");
    collected
}

fn assert_conserved(collected: &[(usize, usize)], producers: usize, per_producer: usize) {
    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    for &item in collected {
        *counts.entry(item).or_default() += 1;
    }

    assert_eq!(collected.len(), producers * per_producer);
    for producer_id in 0..producers {
        for seq in 0..per_producer {
            assert_eq!(
                counts.get(&(producer_id, seq)),
                Some(&1),
                "item ({producer_id}, {seq}) lost or duplicated"
            );
        }
    }
}

#[test]
fn test_fresh_queue_then_single_round_trip() {
    let queue = TwoLockQueue::new();
    assert_eq!(queue.dequeue(), None);

    queue.enqueue(5);
    assert_eq!(queue.dequeue(), Some(5));
    assert_eq!(queue.dequeue(), None);
}

#[test]
fn test_conservation_across_thread_counts() {
    for (producers, consumers, per_producer) in [(1, 1, 1), (1, 4, 1000), (4, 1, 1000), (3, 5, 777)] {
        let collected = run_harness(producers, consumers, per_producer);
        assert_conserved(&collected, producers, per_producer);
    }
}

#[test]
fn test_reference_harness_two_by_two() {
    let collected = run_harness(2, 2, 5_000);
    assert_conserved(&collected, 2, 5_000);
}

#[test]
fn test_eight_by_eight_finishes_in_bounded_time() {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let start = Instant::now();
        let collected = run_harness(8, 8, 5_000);
        let _ = tx.send((collected, start.elapsed()));
    });

    let (collected, elapsed) = rx
        .recv_timeout(Duration::from_secs(120))
        .expect("8x8 run did not finish; possible deadlock");
    assert_eq!(collected.len(), 40_000);
    assert_conserved(&collected, 8, 5_000);
    println!("8x8 x 5000 finished in {:?}", elapsed);
}

#[test]
fn test_consumers_time_out_once_producers_stop() {
    let queue = Arc::new(TwoLockQueue::new());
    queue.enqueue_batch(0..100);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut taken = 0;
                loop {
                    match queue.dequeue_timeout(Duration::from_millis(20)) {
                        Ok(_) => taken += 1,
                        Err(Error::Timeout) => return taken,
                    }
                }
            })
        })
        .collect();

    let taken: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(taken, 100);
    assert!(queue.is_empty());
}

#[test]
fn test_queue_collects_from_iterator() {
    let queue: TwoLockQueue<_> = "the quick brown fox".split(' ').collect();
    assert_eq!(queue.dequeue(), Some("the"));
    assert_eq!(queue.into_iter().collect::<Vec<_>>(), vec!["quick", "brown", "fox"]);
}
