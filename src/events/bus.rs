use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use super::{RequestFailure, RequestSuccess};

/// Subscriber list for a single event kind.
///
/// Senders are cloned out of the guard before publishing, so the lock is
/// never held across an await.
struct Topic<T> {
    subscribers: RwLock<Vec<mpsc::Sender<T>>>,
}

impl<T> Topic<T>
where
    T: Clone + Send,
{
    const fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn subscribe(&self, capacity: usize) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| !subscriber.is_closed());
        subscribers.push(tx);
        rx
    }

    fn current(&self) -> Vec<mpsc::Sender<T>> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Delivers `event` to every live subscriber, waiting for queue space.
    async fn publish(&self, event: T) {
        let subscribers = self.current();
        let Some((last, rest)) = subscribers.split_last() else {
            return;
        };
        for subscriber in rest {
            if subscriber.send(event.clone()).await.is_err() {
                // Subscriber dropped its receiver.
            }
        }
        if last.send(event).await.is_err() {
            // Subscriber dropped its receiver.
        }
    }
}

struct Topics {
    success: Topic<RequestSuccess>,
    failure: Topic<RequestFailure>,
    quit: Topic<()>,
}

/// Process-wide event bus, cloned into every component that publishes or
/// listens. Each event kind has its own typed channel set.
#[derive(Clone)]
pub struct EventBus {
    topics: Arc<Topics>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: Arc::new(Topics {
                success: Topic::new(),
                failure: Topic::new(),
                quit: Topic::new(),
            }),
        }
    }

    /// Subscribe to `request_success` events with a bounded queue.
    #[must_use]
    pub fn subscribe_success(&self, capacity: usize) -> mpsc::Receiver<RequestSuccess> {
        self.topics.success.subscribe(capacity)
    }

    /// Subscribe to `request_failure` events with a bounded queue.
    #[must_use]
    pub fn subscribe_failure(&self, capacity: usize) -> mpsc::Receiver<RequestFailure> {
        self.topics.failure.subscribe(capacity)
    }

    /// Subscribe to the local quit notification.
    #[must_use]
    pub fn subscribe_quit(&self) -> mpsc::Receiver<()> {
        self.topics.quit.subscribe(1)
    }

    pub async fn publish_success(&self, event: RequestSuccess) {
        self.topics.success.publish(event).await;
    }

    pub async fn publish_failure(&self, event: RequestFailure) {
        self.topics.failure.publish(event).await;
    }

    pub async fn publish_quit(&self) {
        self.topics.quit.publish(()).await;
    }
}
