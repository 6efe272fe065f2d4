// Dispatch Infrastructure - Transport Adapters
// Implements: Transport (webhook, dry-run log), DeliveryLog (JSON lines)

pub mod delivery_log;
pub mod log_transport;
pub mod webhook;

pub use delivery_log::FileDeliveryLog;
pub use log_transport::LogTransport;
pub use webhook::{WebhookConfig, WebhookTransport};
