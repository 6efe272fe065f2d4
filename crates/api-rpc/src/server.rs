//! JSON-RPC Server
//!
//! Implements the JSON-RPC 2.0 server over TCP, bound to localhost by default.

use crate::handler::RpcHandler;
use crate::types::{EnqueueBulkRequest, EnqueueRequest, JobRequest};
use dispatch_core::error::{AppError, Result};
use dispatch_core::DispatchQueue;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9611;

/// Every registered method name
pub const METHODS: &[&str] = &[
    "dispatch.enqueue.v1",
    "dispatch.enqueue_bulk.v1",
    "dispatch.job.v1",
    "admin.pause.v1",
    "admin.resume.v1",
    "admin.clear.v1",
    "admin.stats.v1",
    "admin.queue_status.v1",
];

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, queue: DispatchQueue) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(queue)),
        }
    }

    /// Bind and start serving; returns the bound address and the stop handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to build server on {}: {}", addr, e)))?;
        let local_addr = server.local_addr()?;

        let module = build_module(self.handler)?;

        info!(addr = %local_addr, methods = METHODS.len(), "JSON-RPC server started successfully");

        Ok((local_addr, server.start(module)))
    }
}

/// Register every method against one handler
pub fn build_module(handler: Arc<RpcHandler>) -> Result<RpcModule<()>> {
    let mut module = RpcModule::new(());

    let h = handler.clone();
    module
        .register_async_method("dispatch.enqueue.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: EnqueueRequest = params.parse()?;
                handler.enqueue(req).await
            }
        })
        .map_err(registration_error)?;

    let h = handler.clone();
    module
        .register_async_method("dispatch.enqueue_bulk.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: EnqueueBulkRequest = params.parse()?;
                handler.enqueue_bulk(req).await
            }
        })
        .map_err(registration_error)?;

    let h = handler.clone();
    module
        .register_async_method("dispatch.job.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: JobRequest = params.parse()?;
                handler.job(req).await
            }
        })
        .map_err(registration_error)?;

    // Admin APIs take no params
    let h = handler.clone();
    module
        .register_async_method("admin.pause.v1", move |_, _, _| {
            let handler = h.clone();
            async move { handler.pause().await }
        })
        .map_err(registration_error)?;

    let h = handler.clone();
    module
        .register_async_method("admin.resume.v1", move |_, _, _| {
            let handler = h.clone();
            async move { handler.resume().await }
        })
        .map_err(registration_error)?;

    let h = handler.clone();
    module
        .register_async_method("admin.clear.v1", move |_, _, _| {
            let handler = h.clone();
            async move { handler.clear().await }
        })
        .map_err(registration_error)?;

    let h = handler.clone();
    module
        .register_async_method("admin.stats.v1", move |_, _, _| {
            let handler = h.clone();
            async move { handler.stats().await }
        })
        .map_err(registration_error)?;

    let h = handler;
    module
        .register_async_method("admin.queue_status.v1", move |_, _, _| {
            let handler = h.clone();
            async move { handler.queue_status().await }
        })
        .map_err(registration_error)?;

    Ok(module)
}

fn registration_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("Failed to register RPC method: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::domain::QueueConfig;
    use dispatch_core::port::transport::mocks::ScriptedTransport;

    #[test]
    fn test_default_config() {
        let config = RpcServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9611);
    }

    #[tokio::test]
    async fn test_module_registers_every_method() {
        let queue = DispatchQueue::with_defaults(
            QueueConfig::default(),
            Arc::new(ScriptedTransport::new_success()),
        )
        .unwrap();
        let module = build_module(Arc::new(RpcHandler::new(queue))).unwrap();

        let mut registered: Vec<&str> = module.method_names().collect();
        registered.sort();
        let mut expected = METHODS.to_vec();
        expected.sort();
        assert_eq!(registered, expected);
    }
}
