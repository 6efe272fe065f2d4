// Dry-run transport: logs every message and reports success

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use dispatch_core::domain::Metadata;
use dispatch_core::port::{Delivery, Transport, TransportError};

/// Used when no gateway is configured
#[derive(Debug, Default)]
pub struct LogTransport {
    sent: AtomicU64,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn send(
        &self,
        destination: &str,
        payload: &str,
        metadata: &Metadata,
    ) -> Result<Delivery, TransportError> {
        let message_id = format!("dry-run-{}", uuid::Uuid::new_v4());
        self.sent.fetch_add(1, Ordering::Relaxed);

        info!(
            destination = %destination,
            payload_len = payload.len(),
            metadata = %serde_json::Value::Object(metadata.clone()),
            message_id = %message_id,
            "Dry-run delivery"
        );

        Ok(Delivery {
            message_id: Some(message_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_delivers_with_unique_ids() {
        let transport = LogTransport::new();
        let first = transport.send("a", "hello", &Metadata::new()).await.unwrap();
        let second = transport.send("b", "hello", &Metadata::new()).await.unwrap();

        assert_ne!(first.message_id, second.message_id);
        assert!(first.message_id.unwrap().starts_with("dry-run-"));
        assert_eq!(transport.sent_count(), 2);
    }
}
