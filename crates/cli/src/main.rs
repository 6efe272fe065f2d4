//! dispatchctl - operator CLI for the dispatch daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9611";

#[derive(Parser)]
#[command(name = "dispatchctl")]
#[command(about = "Control the outbound message dispatch queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "DISPATCH_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue one message
    Enqueue {
        /// Transport address (phone number, chat id, ...)
        destination: String,

        /// Message text
        #[arg(short, long)]
        message: String,

        /// 1 = high, 2 = normal, 3 = low
        #[arg(short, long)]
        priority: Option<i32>,

        /// Override the default attempt budget
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Metadata entry as key=value (value parsed as JSON when possible)
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<(String, Value)>,
    },

    /// Enqueue every job in a JSON array file
    Bulk {
        /// File with `[{"destination": ..., "payload": ...}, ...]`
        file: PathBuf,
    },

    /// Show one job
    Job {
        /// Job ID
        job_id: String,
    },

    /// Stop dispatching after the current send
    Pause,

    /// Resume dispatching
    Resume,

    /// Drop every pending job
    Clear,

    /// Show queue counters
    Stats,

    /// List pending jobs in dispatch order
    Status,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Attempts")]
    attempts: String,
}

impl JobRow {
    fn from_value(job: &Value) -> Self {
        Self {
            id: text(&job["id"]),
            status: text(&job["status"]),
            priority: text(&job["priority"]),
            attempts: format!("{}/{}", text(&job["attempts"]), text(&job["max_attempts"])),
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn parse_meta(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.trim().is_empty() {
        return Err("metadata key cannot be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn print_control(label: &str, result: &Value) {
    println!("{}", format!("✓ {}", label).green().bold());
    println!("  {} {}", "Paused:".bold(), result["paused"]);
    println!("  {} {}", "Processing:".bold(), result["processing"]);
    println!("  {} {}", "Pending:".bold(), result["queue_length"]);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Enqueue {
            destination,
            message,
            priority,
            max_attempts,
            meta,
        } => {
            let metadata: serde_json::Map<String, Value> = meta.into_iter().collect();
            let params = json!({
                "destination": destination,
                "payload": message,
                "metadata": metadata,
                "priority": priority,
                "max_attempts": max_attempts,
            });

            let result = call_rpc(&cli.rpc_url, "dispatch.enqueue.v1", params).await?;

            println!("{}", "✓ Message enqueued".green().bold());
            println!("  {} {}", "Job ID:".bold(), text(&result["job_id"]));
            println!("  {} {}", "Pending:".bold(), result["queue_length"]);
        }

        Commands::Bulk { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let jobs: Vec<Value> =
                serde_json::from_str(&raw).context("Bulk file must be a JSON array of jobs")?;
            let count = jobs.len();

            let result =
                call_rpc(&cli.rpc_url, "dispatch.enqueue_bulk.v1", json!({ "jobs": jobs })).await?;

            println!("{}", format!("✓ {} messages enqueued", count).green().bold());
            println!("  {} {}", "Pending:".bold(), result["queue_length"]);
        }

        Commands::Job { job_id } => {
            let job = call_rpc(&cli.rpc_url, "dispatch.job.v1", json!({ "job_id": job_id })).await?;

            println!("{}", Table::new(vec![JobRow::from_value(&job)]));
            if let Some(result) = job.get("last_result").filter(|v| !v.is_null()) {
                println!("  {} {}", "Last result:".bold(), result);
            }
        }

        Commands::Pause => {
            let result = call_rpc(&cli.rpc_url, "admin.pause.v1", json!({})).await?;
            print_control("Queue paused", &result);
        }

        Commands::Resume => {
            let result = call_rpc(&cli.rpc_url, "admin.resume.v1", json!({})).await?;
            print_control("Queue resumed", &result);
        }

        Commands::Clear => {
            let result = call_rpc(&cli.rpc_url, "admin.clear.v1", json!({})).await?;
            println!(
                "{}",
                format!("✓ {} pending jobs removed", result["removed"])
                    .yellow()
                    .bold()
            );
        }

        Commands::Stats => {
            println!("{}", "Dispatch Queue".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    let state = if stats["paused"].as_bool().unwrap_or(false) {
                        "PAUSED".yellow()
                    } else if stats["processing"].as_bool().unwrap_or(false) {
                        "DISPATCHING".green()
                    } else {
                        "IDLE".normal()
                    };
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "State:".bold(), state);
                    println!();
                    println!("  {} {}", "Queued (total):".bold(), stats["total_queued"]);
                    println!("  {} {}", "Sent:".bold(), stats["total_sent"]);
                    println!("  {} {}", "Failed:".bold(), stats["total_failed"]);
                    println!("  {} {}", "Retried:".bold(), stats["total_retried"]);
                    println!("  {} {}", "Pending:".bold(), stats["current_queue_length"]);
                    println!();
                    println!(
                        "  {} {} msg/min ({} ms apart)",
                        "Rate:".bold(),
                        stats["messages_per_minute"],
                        stats["delay_ms"]
                    );
                    println!(
                        "  {} {:.1} ms",
                        "Avg processing:".bold(),
                        stats["average_processing_ms"].as_f64().unwrap_or(0.0)
                    );
                    let remaining_secs =
                        stats["estimated_time_remaining_ms"].as_u64().unwrap_or(0) as f64 / 1000.0;
                    println!("  {} {:.1} s", "Est. drain time:".bold(), remaining_secs);
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Status => {
            let status = call_rpc(&cli.rpc_url, "admin.queue_status.v1", json!({})).await?;

            if let Some(job) = status.get("in_flight").filter(|v| !v.is_null()) {
                println!("{} {}", "In flight:".cyan().bold(), text(&job["id"]));
            }

            let rows: Vec<JobRow> = status["items"]
                .as_array()
                .map(|items| items.iter().map(JobRow::from_value).collect())
                .unwrap_or_default();

            if rows.is_empty() {
                println!("{}", "No pending jobs".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("student_id=42").unwrap(),
            ("student_id".to_string(), json!(42))
        );
        assert_eq!(
            parse_meta("kind=receipt").unwrap(),
            ("kind".to_string(), json!("receipt"))
        );
        assert!(parse_meta("novalue").is_err());
        assert!(parse_meta("=x").is_err());
    }

    #[test]
    fn test_enqueue_args() {
        let cli = Cli::try_parse_from([
            "dispatchctl",
            "enqueue",
            "+15550001",
            "--message",
            "hello",
            "--priority",
            "1",
            "--meta",
            "kind=reminder",
        ])
        .unwrap();

        match cli.command {
            Commands::Enqueue {
                destination,
                priority,
                meta,
                ..
            } => {
                assert_eq!(destination, "+15550001");
                assert_eq!(priority, Some(1));
                assert_eq!(meta.len(), 1);
            }
            _ => panic!("expected enqueue"),
        }
    }

    #[test]
    fn test_job_row_formatting() {
        let row = JobRow::from_value(&json!({
            "id": "job-1",
            "status": "RETRYING",
            "priority": 2,
            "attempts": 1,
            "max_attempts": 3
        }));
        assert_eq!(row.status, "RETRYING");
        assert_eq!(row.attempts, "1/3");
    }
}
