// src/cache/pubsub.rs
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

use super::Result;

#[async_trait]
pub trait PubSub: Send + Sync {
    /// Returns the number of subscribers that received the message.
    async fn publish(&self, topic: &str, message: String) -> Result<usize>;
}

/// In-process topic fan-out over tokio broadcast channels.
pub struct BroadcastPubSub {
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl BroadcastPubSub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

impl Default for BroadcastPubSub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl PubSub for BroadcastPubSub {
    async fn publish(&self, topic: &str, message: String) -> Result<usize> {
        let sender = self.topics.lock().get(topic).cloned();
        // No subscribers is not an error; the message is simply dropped.
        Ok(sender.and_then(|s| s.send(message).ok()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_topic_subscribers_only() {
        let pubsub = BroadcastPubSub::default();
        let mut alerts = pubsub.subscribe("security_alerts");
        let mut other = pubsub.subscribe("other");

        let delivered = pubsub
            .publish("security_alerts", "hello".to_string())
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(alerts.recv().await.unwrap(), "hello");
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let pubsub = BroadcastPubSub::default();
        assert_eq!(pubsub.publish("nobody", "x".into()).await.unwrap(), 0);
    }
}
