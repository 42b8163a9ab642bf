use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pollqt_core::{OutputSink, PollError, Snapshot};
use tokio::io::AsyncWriteExt;

const NAME: &str = "json-lines";

/// Appends one JSON object per snapshot to `<dir>/<yyyyMMdd>.jsonl`, the date taken
/// from the snapshot timestamp (UTC).
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    dir: PathBuf,
}

impl JsonLinesSink {
    /// Sink writing into `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a snapshot lands in.
    #[must_use]
    pub fn file_for(&self, snapshot: &Snapshot) -> PathBuf {
        self.dir
            .join(format!("{}.jsonl", snapshot.timestamp.format("%Y%m%d")))
    }
}

#[async_trait]
impl OutputSink for JsonLinesSink {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn on_event(&self, snapshots: &[Snapshot]) -> Result<(), PollError> {
        let io_err = |e: std::io::Error| PollError::sink(NAME, e.to_string());
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        for snapshot in snapshots {
            let path = self.file_for(snapshot);
            #[cfg(feature = "tracing")]
            tracing::info!(
                account = %snapshot.account.number,
                timestamp = %snapshot.timestamp,
                file = %path.display(),
                "writing snapshot"
            );
            let mut line =
                serde_json::to_string(snapshot).map_err(|e| PollError::sink(NAME, e.to_string()))?;
            line.push('\n');

            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(io_err)?;
            file.write_all(line.as_bytes()).await.map_err(io_err)?;
            file.flush().await.map_err(io_err)?;
        }
        Ok(())
    }
}
