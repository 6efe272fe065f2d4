//! Unit tests for enqueue validation

use super::enqueue::*;
use crate::domain::{JobStatus, PRIORITY_HIGH, PRIORITY_NORMAL};
use serde_json::json;

#[test]
fn test_validate_destination_empty() {
    let req = EnqueueRequest::new("   ", "Your fee is due");

    let result = validate_request(&req);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("destination"));
}

#[test]
fn test_validate_payload_empty() {
    let req = EnqueueRequest::new("student:17", "");

    let result = validate_request(&req);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("payload"));
}

#[test]
fn test_validate_zero_attempts() {
    let req = EnqueueRequest::new("student:17", "Receipt #88").with_max_attempts(0);

    let result = validate_request(&req);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("max_attempts"));
}

#[test]
fn test_validate_valid_request() {
    let req = EnqueueRequest::new("student:17", "Receipt #88")
        .with_priority(PRIORITY_HIGH)
        .with_metadata("kind", json!("receipt"));

    assert!(validate_request(&req).is_ok());
}

#[test]
fn test_build_job_applies_defaults() {
    let req = EnqueueRequest::new("staff:3", "Notice: campus closed");
    let job = build_job(req, "job-9".to_string(), 42_000, 5);

    assert_eq!(job.id, "job-9");
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.priority, PRIORITY_NORMAL);
    assert_eq!(job.max_attempts, 5);
    assert_eq!(job.attempts, 0);
    assert_eq!(job.enqueued_at, 42_000);
}

#[test]
fn test_build_job_keeps_overrides() {
    let req = EnqueueRequest::new("guardian:8", "Attendance: 92%")
        .with_priority(3)
        .with_max_attempts(1)
        .with_metadata("student_id", json!(8));
    let job = build_job(req, "job-1".to_string(), 0, 3);

    assert_eq!(job.priority, 3);
    assert_eq!(job.max_attempts, 1);
    assert_eq!(job.metadata.get("student_id"), Some(&json!(8)));
}

#[test]
fn test_request_deserializes_with_defaults() {
    let req: EnqueueRequest = serde_json::from_value(json!({
        "destination": "student:1",
        "payload": "hello"
    }))
    .unwrap();

    assert!(req.metadata.is_empty());
    assert!(req.priority.is_none());
    assert!(req.max_attempts.is_none());
}
