//! Single-producer/single-consumer frame queue.
//!
//! Each streaming client owns one bounded [`FrameQueue`]: the frame
//! scheduler pushes into it, the client's listener task pops from it.
//! A full queue backpressures the producer; an empty queue parks the
//! consumer. The producer signals end-of-stream with
//! [`FrameQueue::producer_finished`], after which the consumer drains
//! the remaining items and then receives `None`.
//!
//! Shutdown from the consumer side (an aborted stream, a dropped
//! connection) goes through [`FrameQueue::close`]: the queue reports
//! `done`, parked parties wake, and late pushes are silently dropped.
//! Pushing after the producer itself declared the stream finished is a
//! programming error and panics.
//!
//! ```no_run
//! use framecast_server::queue::FrameQueue;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let queue: Arc<FrameQueue<u32>> = Arc::new(FrameQueue::bounded(10));
//!
//! let producer = Arc::clone(&queue);
//! tokio::spawn(async move {
//!     for i in 0..20 {
//!         producer.push(i).await;
//!     }
//!     producer.producer_finished();
//! });
//!
//! while let Some(value) = queue.pop().await {
//!     println!("got {value}");
//! }
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    /// Producer declared the stream complete.
    finished: bool,
    /// Consumer side tore the queue down.
    closed: bool,
}

/// A thread-safe, optionally bounded queue with async push and pop.
///
/// Exactly one producer and one consumer are expected per instance;
/// both access the queue through a shared reference (typically an
/// `Arc`).
#[derive(Debug)]
pub struct FrameQueue<T> {
    state: Mutex<QueueState<T>>,
    producer_notify: Notify,
    consumer_notify: Notify,
    /// Maximum number of buffered items; 0 means unbounded.
    capacity: usize,
}

impl<T> FrameQueue<T> {
    /// Create a queue holding at most `capacity` items. A capacity of
    /// zero means unbounded.
    pub fn bounded(capacity: usize) -> Self {
        FrameQueue {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                finished: false,
                closed: false,
            }),
            producer_notify: Notify::new(),
            consumer_notify: Notify::new(),
            capacity,
        }
    }

    /// Create an unbounded queue.
    pub fn unbounded() -> Self {
        Self::bounded(0)
    }

    /// Push an item, waiting while the queue is full.
    ///
    /// If the queue was [`close`](Self::close)d the item is dropped
    /// silently: the consumer is gone and has no use for it.
    ///
    /// # Panics
    /// Panics when called after [`producer_finished`](Self::producer_finished);
    /// that is a violation of the single-producer protocol.
    pub async fn push(&self, item: T) {
        let mut item = Some(item);
        loop {
            let notified = self.producer_notify.notified();
            {
                let mut state = self.state.lock().unwrap();
                assert!(
                    !state.finished,
                    "FrameQueue::push() called after producer_finished()"
                );
                if state.closed {
                    return;
                }
                if self.capacity == 0 || state.items.len() < self.capacity {
                    state.items.push_back(item.take().expect("item still present"));
                    self.consumer_notify.notify_one();
                    return;
                }
            }
            notified.await;
        }
    }

    /// Pop an item, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is empty and either the producer
    /// finished or the queue was closed.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.consumer_notify.notified();
            {
                let mut state = self.state.lock().unwrap();
                if let Some(item) = state.items.pop_front() {
                    self.producer_notify.notify_one();
                    return Some(item);
                }
                if state.finished || state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Signal that the producer will push no more items. Parked
    /// consumers wake and drain what is buffered.
    ///
    /// # Panics
    /// Panics when called twice.
    pub fn producer_finished(&self) {
        let mut state = self.state.lock().unwrap();
        assert!(
            !state.finished,
            "FrameQueue::producer_finished() called twice"
        );
        state.finished = true;
        self.consumer_notify.notify_waiters();
        self.consumer_notify.notify_one();
        self.producer_notify.notify_waiters();
        self.producer_notify.notify_one();
    }

    /// Tear the queue down from the consumer side. Idempotent; wakes
    /// both parties, late pushes are dropped.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        self.consumer_notify.notify_waiters();
        self.consumer_notify.notify_one();
        self.producer_notify.notify_waiters();
        self.producer_notify.notify_one();
    }

    /// Number of buffered items.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns `true` if a bounded queue is at capacity. Unbounded
    /// queues are never full.
    pub fn is_full(&self) -> bool {
        self.capacity != 0 && self.size() >= self.capacity
    }

    /// Returns `true` once the producer finished or the queue was
    /// closed. Stays `true` forever after.
    pub fn done(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.finished || state.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order_preserved() {
        let queue = FrameQueue::bounded(4);
        for i in 0..4 {
            queue.push(i).await;
        }
        queue.producer_finished();
        for i in 0..4 {
            assert_eq!(queue.pop().await, Some(i));
        }
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn test_bounded_push_blocks_until_pop() {
        let queue = Arc::new(FrameQueue::bounded(1));
        queue.push(1u32).await;
        assert!(queue.is_full());

        let producer = Arc::clone(&queue);
        let pushed = tokio::spawn(async move {
            producer.push(2).await;
        });
        // The push cannot complete while the queue is full.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pushed.is_finished());

        assert_eq!(queue.pop().await, Some(1));
        pushed.await.unwrap();
        assert_eq!(queue.pop().await, Some(2));
    }

    #[tokio::test]
    async fn test_pop_blocks_until_push() {
        let queue = Arc::new(FrameQueue::bounded(4));
        let consumer = Arc::clone(&queue);
        let popped = tokio::spawn(async move { consumer.pop().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!popped.is_finished());

        queue.push(7u32).await;
        assert_eq!(popped.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_unbounded() {
        let queue = FrameQueue::unbounded();
        for i in 0..1000 {
            queue.push(i).await;
        }
        assert!(!queue.is_full());
        assert_eq!(queue.size(), 1000);
    }

    #[tokio::test]
    async fn test_done_wakes_parked_consumer() {
        let queue = Arc::new(FrameQueue::<u32>::bounded(4));
        let consumer = Arc::clone(&queue);
        let popped = tokio::spawn(async move { consumer.pop().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.producer_finished();
        assert_eq!(popped.await.unwrap(), None);
        assert!(queue.done());
    }

    #[tokio::test]
    async fn test_done_stays_done() {
        let queue = FrameQueue::<u32>::bounded(2);
        queue.producer_finished();
        assert!(queue.done());
        assert_eq!(queue.pop().await, None);
        assert_eq!(queue.pop().await, None);
        assert!(queue.done());
    }

    #[tokio::test]
    async fn test_drain_after_finish() {
        let queue = FrameQueue::bounded(4);
        queue.push("a").await;
        queue.push("b").await;
        queue.producer_finished();
        assert_eq!(queue.pop().await, Some("a"));
        assert_eq!(queue.pop().await, Some("b"));
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    #[should_panic(expected = "push() called after producer_finished()")]
    async fn test_push_after_finish_panics() {
        let queue = FrameQueue::bounded(4);
        queue.producer_finished();
        queue.push(1u32).await;
    }

    #[tokio::test]
    async fn test_close_drops_late_pushes() {
        let queue = FrameQueue::bounded(4);
        queue.push(1u32).await;
        queue.close();
        // Dropped, not panicking: the consumer went away.
        queue.push(2).await;
        assert!(queue.done());
        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn test_close_unblocks_full_producer() {
        let queue = Arc::new(FrameQueue::bounded(1));
        queue.push(1u32).await;
        let producer = Arc::clone(&queue);
        let pushed = tokio::spawn(async move {
            producer.push(2).await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();
        // The parked push resolves by dropping its item.
        pushed.await.unwrap();
        assert_eq!(queue.size(), 1);
    }
}
