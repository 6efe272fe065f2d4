// Port Layer - Interfaces for external dependencies

pub mod delivery_log;
pub mod id_provider; // For deterministic testing
pub mod time_provider;
pub mod transport;

// Re-exports
pub use delivery_log::{DeliveryLog, DeliveryRecord, NullDeliveryLog};
pub use id_provider::{IdProvider, UuidProvider};
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use transport::{Delivery, Transport, TransportError};
