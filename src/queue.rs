//! Bounded work queue connecting the candidate selector to the worker pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// Default number of buffered descriptors between selector and workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Errors that can emerge while queueing work.
#[derive(Debug)]
pub enum QueueError<T> {
    /// Every consumer is gone; the caller gets the item back.
    Disconnected(T),
}

/// Creates a queue holding at most `capacity` items.
///
/// The producer half is the only handle that can close the queue, and closing
/// consumes it. Consumers keep receiving buffered items after closure and only
/// see `None` once the buffer is empty.
pub fn bounded<T>(capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    let pending = Arc::new(AtomicUsize::new(0));
    (
        QueueProducer {
            sender,
            pending: Arc::clone(&pending),
        },
        QueueConsumer {
            receiver: Arc::new(Mutex::new(receiver)),
            pending,
            capacity,
        },
    )
}

/// Producer half. Not cloneable: a single selector feeds the queue.
pub struct QueueProducer<T> {
    sender: mpsc::Sender<T>,
    pending: Arc<AtomicUsize>,
}

impl<T> QueueProducer<T> {
    /// Enqueues an item, waiting while the queue is full.
    pub async fn push(&self, item: T) -> Result<(), QueueError<T>> {
        let permit = match self.sender.reserve().await {
            Ok(permit) => permit,
            Err(_) => return Err(QueueError::Disconnected(item)),
        };
        self.pending.fetch_add(1, Ordering::Release);
        permit.send(item);
        Ok(())
    }

    /// Number of items buffered and not yet taken by a worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Maximum number of buffered items.
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Signals that no more items will arrive.
    pub fn close(self) {
        tracing::debug!(pending = self.pending(), "work queue closed");
        drop(self.sender);
    }
}

/// Consumer half, shared by every worker.
pub struct QueueConsumer<T> {
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

impl<T> Clone for QueueConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: Arc::clone(&self.receiver),
            pending: Arc::clone(&self.pending),
            capacity: self.capacity,
        }
    }
}

impl<T> QueueConsumer<T> {
    /// Waits for the next item; `None` once the queue is closed and drained.
    pub async fn next_task(&self) -> Option<T> {
        let mut receiver = self.receiver.lock().await;
        let next = receiver.recv().await;
        if next.is_some() {
            self.pending.fetch_sub(1, Ordering::Release);
        }
        next
    }

    /// Number of items buffered and not yet taken by a worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Maximum number of buffered items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test(flavor = "current_thread")]
    async fn producer_blocks_once_full() {
        let (producer, consumer) = bounded::<u32>(2);
        producer.push(1).await.expect("first slot");
        producer.push(2).await.expect("second slot");
        assert_eq!(producer.pending(), 2);

        let blocked = timeout(Duration::from_millis(50), producer.push(3)).await;
        assert!(blocked.is_err(), "third push should wait for a free slot");
        assert_eq!(producer.pending(), 2);

        assert_eq!(consumer.next_task().await, Some(1));
        timeout(Duration::from_millis(50), producer.push(3))
            .await
            .expect("slot freed")
            .expect("queue open");
        assert_eq!(consumer.pending(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn consumers_drain_buffer_after_close() {
        let (producer, consumer) = bounded::<u32>(4);
        for item in 0..3 {
            producer.push(item).await.expect("queue open");
        }
        producer.close();

        let other = consumer.clone();
        assert_eq!(consumer.next_task().await, Some(0));
        assert_eq!(other.next_task().await, Some(1));
        assert_eq!(consumer.next_task().await, Some(2));
        assert_eq!(other.next_task().await, None);
        assert_eq!(consumer.next_task().await, None);
        assert_eq!(consumer.pending(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn push_hands_item_back_without_consumers() {
        let (producer, consumer) = bounded::<&str>(1);
        drop(consumer);
        match producer.push("orphan").await {
            Err(QueueError::Disconnected(item)) => assert_eq!(item, "orphan"),
            Ok(()) => panic!("push should fail without consumers"),
        }
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (producer, consumer) = bounded::<u8>(0);
        assert_eq!(producer.capacity(), 1);
        assert_eq!(consumer.capacity(), 1);
    }
}
