// JSON-lines delivery log
// One object per terminal job, appended in completion order

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use dispatch_core::port::{DeliveryLog, DeliveryRecord};
use dispatch_core::Result;

pub struct FileDeliveryLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileDeliveryLog {
    /// Open (or create) the log for appending, creating parent directories
    ///
    /// # Errors
    /// AppError::Io if the directory or file cannot be created
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), "Delivery log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DeliveryLog for FileDeliveryLog {
    async fn record(&self, record: &DeliveryRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::domain::{JobStatus, MessageJob};

    fn temp_log_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("dispatch-test-{}", uuid::Uuid::new_v4()))
            .join("deliveries.jsonl")
    }

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let path = temp_log_path();
        let log = FileDeliveryLog::open(&path).await.unwrap();

        let mut sent = MessageJob::new("job-1", 1_000, "+15550001", "hello");
        sent.begin_attempt().unwrap();
        sent.mark_sent(Some("m-1".to_string()), 2_000).unwrap();

        let mut failed = MessageJob::new("job-2", 1_000, "+15550002", "hello");
        failed.begin_attempt().unwrap();
        failed.fail("number not registered", true, 2_500);

        log.record(&DeliveryRecord::from(&sent)).await.unwrap();
        log.record(&DeliveryRecord::from(&failed)).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<DeliveryRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].job_id, "job-1");
        assert_eq!(lines[0].status, JobStatus::Sent);
        assert_eq!(lines[1].status, JobStatus::Failed);
        assert_eq!(lines[1].finished_at, Some(2_500));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_reopen_keeps_existing_lines() {
        let path = temp_log_path();
        let job = MessageJob::new("job-1", 1_000, "+15550001", "hello");

        {
            let log = FileDeliveryLog::open(&path).await.unwrap();
            log.record(&DeliveryRecord::from(&job)).await.unwrap();
        }
        let log = FileDeliveryLog::open(&path).await.unwrap();
        log.record(&DeliveryRecord::from(&job)).await.unwrap();

        let contents = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert_eq!(contents.lines().count(), 2);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
