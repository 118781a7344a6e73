//! Basic usage example for twinlock
//!
//! Walks through single-threaded use, batching, and a multi-producer /
//! multi-consumer run with bounded waiting.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use twinlock::{Error, TwoLockQueue};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("twinlock Usage Example");
    println!("======================");

    let queue: Arc<TwoLockQueue<i32>> = Arc::new(TwoLockQueue::new());

    // Basic enqueue/dequeue operations
    println!("\n1. Basic Operations:");
    queue.enqueue(42);
    queue.enqueue(24);
    let value1 = queue.dequeue();
    let value2 = queue.dequeue();
    let value3 = queue.dequeue();
    println!("   Enqueued: 42, 24");
    println!("   Dequeued: {:?}, {:?}, {:?} (None means empty)", value1, value2, value3);

    // Batches
    println!("\n2. Batches:");
    queue.enqueue_batch(1..=5);
    println!("   Dequeued batch of 3: {:?}", queue.dequeue_batch(3));
    println!("   Dequeued the rest:   {:?}", queue.dequeue_batch(usize::MAX));

    // Multi-producer, multi-consumer
    println!("\n3. Multi-Producer / Multi-Consumer:");
    let producer_handles: Vec<_> = (0..4)
        .map(|i| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for j in 0..25 {
                    queue.enqueue(i * 25 + j);
                }
                println!("   Producer {} finished", i);
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..3)
        .map(|i| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut consumed = 0;
                let mut sum = 0;
                loop {
                    match queue.dequeue_timeout(Duration::from_millis(50)) {
                        Ok(value) => {
                            consumed += 1;
                            sum += value;
                        }
                        Err(Error::Timeout) => break,
                    }
                }
                println!("   Consumer {} took {} items (sum {})", i, consumed, sum);
                sum
            })
        })
        .collect();

    for handle in producer_handles {
        handle.join().map_err(|_| "producer panicked")?;
    }

    let mut total = 0;
    for handle in consumer_handles {
        total += handle.join().map_err(|_| "consumer panicked")?;
    }

    println!("\n   Total sum: {} (expected {})", total, (0..100).sum::<i32>());
    println!("   Queue empty: {}", queue.is_empty());
    Ok(())
}
