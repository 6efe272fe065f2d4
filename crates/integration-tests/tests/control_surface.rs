//! Control Surface - JSON-RPC server end to end over TCP
//!
//! Starts the real server on a free localhost port and drives it with a
//! jsonrpsee HTTP client.

use dispatch_api_rpc::error::code;
use dispatch_api_rpc::{RpcServer, RpcServerConfig};
use dispatch_core::domain::QueueConfig;
use dispatch_core::DispatchQueue;
use dispatch_infra_transport::LogTransport;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use jsonrpsee::server::ServerHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct TestServer {
    client: HttpClient,
    transport: Arc<LogTransport>,
    handle: ServerHandle,
}

/// 60000 msg/min keeps pacing at 2ms so real-time tests stay fast
async fn start_server(start_paused: bool) -> TestServer {
    let transport = Arc::new(LogTransport::new());
    let queue = DispatchQueue::with_defaults(
        QueueConfig {
            messages_per_minute: 60_000,
            start_paused,
            ..Default::default()
        },
        transport.clone(),
    )
    .unwrap();

    let config = RpcServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let (addr, handle) = RpcServer::new(config, queue).start().await.unwrap();
    let client = HttpClientBuilder::default()
        .build(format!("http://{}", addr))
        .unwrap();

    TestServer {
        client,
        transport,
        handle,
    }
}

fn enqueue_params(destination: &str, priority: i32) -> ObjectParams {
    let mut params = ObjectParams::new();
    params.insert("destination", destination).unwrap();
    params.insert("payload", "Parent-teacher meeting on Friday").unwrap();
    params.insert("priority", priority).unwrap();
    params
        .insert("metadata", json!({ "template": "meeting" }))
        .unwrap();
    params
}

async fn call(client: &HttpClient, method: &str) -> Value {
    client.request(method, rpc_params![]).await.unwrap()
}

fn error_code(err: ClientError) -> i32 {
    match err {
        ClientError::Call(obj) => obj.code(),
        other => panic!("expected call error, got {:?}", other),
    }
}

/// Surface 1: admission while paused, then ordered inspection
#[tokio::test]
async fn test_enqueue_and_inspect_over_rpc() {
    let server = start_server(true).await;

    let low: Value = server
        .client
        .request("dispatch.enqueue.v1", enqueue_params("guardian-1", 3))
        .await
        .unwrap();
    let high: Value = server
        .client
        .request("dispatch.enqueue.v1", enqueue_params("staff-1", 1))
        .await
        .unwrap();
    assert_eq!(high["status"], "QUEUED");
    assert_eq!(high["queue_length"], 2);

    let status = call(&server.client, "admin.queue_status.v1").await;
    assert_eq!(status["paused"], true);
    assert_eq!(status["items"][0]["id"], high["job_id"]);
    assert_eq!(status["items"][1]["id"], low["job_id"]);
    assert_eq!(status["items"][1]["metadata"]["template"], "meeting");

    let mut params = ObjectParams::new();
    params.insert("job_id", low["job_id"].clone()).unwrap();
    let job: Value = server.client.request("dispatch.job.v1", params).await.unwrap();
    assert_eq!(job["priority"], 3);
    assert_eq!(job["attempts"], 0);

    server.handle.stop().unwrap();
    println!("✅ Surface 1: enqueue + queue_status over RPC");
}

/// Surface 2: error codes for bad input and unknown jobs
#[tokio::test]
async fn test_rpc_error_codes() {
    let server = start_server(true).await;

    let err = server
        .client
        .request::<Value, _>("dispatch.enqueue.v1", enqueue_params("", 2))
        .await
        .unwrap_err();
    assert_eq!(error_code(err), code::VALIDATION_ERROR);

    let mut params = ObjectParams::new();
    params.insert("job_id", "does-not-exist").unwrap();
    let err = server
        .client
        .request::<Value, _>("dispatch.job.v1", params)
        .await
        .unwrap_err();
    assert_eq!(error_code(err), code::NOT_FOUND);

    let stats = call(&server.client, "admin.stats.v1").await;
    assert_eq!(stats["total_queued"], 0);

    server.handle.stop().unwrap();
    println!("✅ Surface 2: validation and not-found codes");
}

/// Surface 3: bulk, clear, resume and drain through the control methods
#[tokio::test]
async fn test_bulk_clear_resume_cycle() {
    let server = start_server(true).await;

    let jobs: Vec<Value> = (0..6)
        .map(|i| json!({ "destination": format!("student-{}", i), "payload": "Results are out" }))
        .collect();
    let mut params = ObjectParams::new();
    params.insert("jobs", jobs).unwrap();
    let bulk: Value = server
        .client
        .request("dispatch.enqueue_bulk.v1", params)
        .await
        .unwrap();
    assert_eq!(bulk["job_ids"].as_array().unwrap().len(), 6);
    assert_eq!(bulk["queue_length"], 6);

    let cleared = call(&server.client, "admin.clear.v1").await;
    assert_eq!(cleared["removed"], 6);

    let mut params = ObjectParams::new();
    params.insert("jobs", vec![json!({ "destination": "staff-9", "payload": "Staff meeting" })])
        .unwrap();
    let _: Value = server
        .client
        .request("dispatch.enqueue_bulk.v1", params)
        .await
        .unwrap();

    let resumed = call(&server.client, "admin.resume.v1").await;
    assert_eq!(resumed["paused"], false);

    let mut sent = 0;
    for _ in 0..100 {
        let stats = call(&server.client, "admin.stats.v1").await;
        sent = stats["total_sent"].as_u64().unwrap();
        if sent == 1 && stats["processing"] == false {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sent, 1);
    assert_eq!(server.transport.sent_count(), 1);

    let paused = call(&server.client, "admin.pause.v1").await;
    assert_eq!(paused["paused"], true);
    assert_eq!(paused["queue_length"], 0);

    server.handle.stop().unwrap();
    println!("✅ Surface 3: bulk/clear/resume cycle");
}
