//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server exposing admission and operator controls of one
//! `DispatchQueue`. Method names carry a `.v1` suffix so the contract can
//! evolve without breaking old clients.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
