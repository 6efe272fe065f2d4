// Transport Port
// Abstraction over the external service that performs the actual send

use crate::domain::Metadata;
use async_trait::async_trait;
use thiserror::Error;

/// Successful send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-side message id, when the transport returns one
    pub message_id: Option<String>,
}

/// Delivery errors
///
/// The variant decides retry behavior: `Permanent` is never retried,
/// `Transient` is retried while the job has attempts left.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),

    #[error("Transient delivery failure: {0}")]
    Transient(String),
}

impl TransportError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, TransportError::Permanent(_))
    }

    pub fn message(&self) -> &str {
        match self {
            TransportError::Permanent(msg) | TransportError::Transient(msg) => msg,
        }
    }
}

/// Transport trait
///
/// Implementations:
/// - WebhookTransport: HTTP POST to a delivery gateway
/// - LogTransport: dry-run, logs and succeeds
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message
    ///
    /// # Errors
    /// - TransportError::Permanent if the destination can never receive it
    /// - TransportError::Transient for anything worth retrying
    async fn send(
        &self,
        destination: &str,
        payload: &str,
        metadata: &Metadata,
    ) -> Result<Delivery, TransportError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;
    use tokio::time::Instant;

    /// Mock transport behavior for one send
    #[derive(Debug, Clone)]
    pub enum MockOutcome {
        /// Succeed with a generated message id
        Deliver,
        /// Fail with a permanent error
        Permanent(String),
        /// Fail with a transient error
        Transient(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Never complete (for send timeout testing)
        Hang,
    }

    /// One recorded send
    #[derive(Debug, Clone)]
    pub struct SentMessage {
        pub destination: String,
        pub payload: String,
        pub metadata: Metadata,
        pub at: Instant,
    }

    /// Transport that plays back a script, then repeats a fallback outcome
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<MockOutcome>>,
        fallback: MockOutcome,
        calls: Arc<Mutex<Vec<SentMessage>>>,
    }

    impl ScriptedTransport {
        pub fn new(script: Vec<MockOutcome>, fallback: MockOutcome) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn new_success() -> Self {
            Self::new(vec![], MockOutcome::Deliver)
        }
        pub fn new_permanent(message: impl Into<String>) -> Self {
            Self::new(vec![], MockOutcome::Permanent(message.into()))
        }
        pub fn new_transient(message: impl Into<String>) -> Self {
            Self::new(vec![], MockOutcome::Transient(message.into()))
        }
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
        pub fn calls(&self) -> Vec<SentMessage> {
            self.calls.lock().unwrap().clone()
        }
        pub fn destinations(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.destination.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            destination: &str,
            payload: &str,
            metadata: &Metadata,
        ) -> Result<Delivery, TransportError> {
            let call_number = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(SentMessage {
                    destination: destination.to_string(),
                    payload: payload.to_string(),
                    metadata: metadata.clone(),
                    at: Instant::now(),
                });
                calls.len()
            };

            let outcome = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());

            match outcome {
                MockOutcome::Deliver => Ok(Delivery {
                    message_id: Some(format!("mock-{}", call_number)),
                }),
                MockOutcome::Permanent(msg) => Err(TransportError::Permanent(msg)),
                MockOutcome::Transient(msg) => Err(TransportError::Transient(msg)),
                MockOutcome::Panic(msg) => {
                    panic!("{}", msg);
                }
                MockOutcome::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!("pending future never resolves")
                }
            }
        }
    }

    /// Transport that parks every send until the test releases it
    pub struct GatedTransport {
        inner: ScriptedTransport,
        entered: Notify,
        release: Notify,
    }

    impl GatedTransport {
        pub fn new(inner: ScriptedTransport) -> Self {
            Self {
                inner,
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
        /// Resolves once a send is parked at the gate
        pub async fn wait_entered(&self) {
            self.entered.notified().await;
        }
        /// Let one parked send continue
        pub fn release(&self) {
            self.release.notify_one();
        }
        pub fn call_count(&self) -> usize {
            self.inner.call_count()
        }
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn send(
            &self,
            destination: &str,
            payload: &str,
            metadata: &Metadata,
        ) -> Result<Delivery, TransportError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.send(destination, payload, metadata).await
        }
    }
}
