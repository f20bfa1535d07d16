//! Bounded multi-producer request queue.
//!
//! Producers never block: a full queue refuses the item at once. Consumers
//! suspend until an item arrives, their own token fires, or the queue is
//! closed. Items are handed out in strict arrival order, each to exactly one
//! consumer.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;

/// Outcome of [`RequestQueue::dequeue`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<T> {
    Item(T),
    /// The caller's token fired first.
    Canceled,
    Closed,
}

/// Cloneable handle to one queue.
#[derive(Debug)]
pub struct RequestQueue<T> {
    tx: mpsc::Sender<T>,
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
    closed: CancellationToken,
}

impl<T> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
            closed: self.closed.clone(),
        }
    }
}

impl<T: Send> RequestQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            closed: CancellationToken::new(),
        }
    }

    /// Append an item without waiting.
    pub fn enqueue(&self, item: T) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        self.tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Take the oldest item.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Dequeued<T> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Dequeued::Closed,
            _ = cancel.cancelled() => Dequeued::Canceled,
            item = async {
                let mut rx = self.rx.lock().await;
                rx.recv().await
            } => match item {
                Some(item) => Dequeued::Item(item),
                None => Dequeued::Closed,
            },
        }
    }

    /// Close the queue, wake every waiting consumer and drop buffered items.
    pub async fn close(&self) {
        self.closed.cancel();
        let mut rx = self.rx.lock().await;
        rx.close();
        while rx.try_recv().is_ok() {}
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token firing when the queue closes.
    pub fn closed_token(&self) -> &CancellationToken {
        &self.closed
    }

    /// Items currently buffered.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = RequestQueue::new(8);
        for i in 0..5 {
            queue.enqueue(i).unwrap();
        }
        assert_eq!(queue.len(), 5);

        let token = CancellationToken::new();
        for i in 0..5 {
            assert_eq!(queue.dequeue(&token).await, Dequeued::Item(i));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_refuses() {
        let queue = RequestQueue::new(2);
        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        assert_eq!(queue.enqueue(3), Err(QueueError::Full));
        assert_eq!(queue.capacity(), 2);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_item() {
        let queue = RequestQueue::new(4);
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.enqueue("late").unwrap();
        });

        let token = CancellationToken::new();
        assert_eq!(queue.dequeue(&token).await, Dequeued::Item("late"));
    }

    #[tokio::test]
    async fn test_dequeue_observes_caller_token() {
        let queue: RequestQueue<u32> = RequestQueue::new(4);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(queue.dequeue(&token).await, Dequeued::Canceled);
    }

    #[tokio::test]
    async fn test_close_wakes_consumers() {
        let queue: RequestQueue<u32> = RequestQueue::new(4);
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.dequeue(&CancellationToken::new()).await })
            })
            .collect();
        tokio::task::yield_now().await;

        queue.close().await;
        for consumer in consumers {
            assert_eq!(consumer.await.unwrap(), Dequeued::Closed);
        }
        assert_eq!(queue.enqueue(1), Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn test_close_drops_buffered_items() {
        let queue = RequestQueue::new(4);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        queue.enqueue(tx).unwrap();

        queue.close().await;
        assert!(rx.await.is_err(), "buffered reply channel should be dropped");
    }

    #[tokio::test]
    async fn test_competing_consumers_each_item_once() {
        let queue = RequestQueue::new(64);
        for i in 0..50u32 {
            queue.enqueue(i).unwrap();
        }

        let token = CancellationToken::new();
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    let mut taken = Vec::new();
                    while let Dequeued::Item(i) = queue.dequeue(&token).await {
                        taken.push(i);
                        if queue.is_empty() {
                            break;
                        }
                    }
                    taken
                })
            })
            .collect();

        let mut all = Vec::new();
        for worker in workers {
            all.extend(worker.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }
}
