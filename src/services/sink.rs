//! JSON Lines output
//!
//! One finished record per line, appended to the output file. The file is
//! opened in append mode and never truncated, so successive runs accumulate.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::MovieRecord;

/// Append-only JSON Lines writer
pub struct JsonLinesSink {
    file: File,
    path: PathBuf,
    written: usize,
}

impl JsonLinesSink {
    /// Open (creating if needed) `path` for appending
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open output file {}", path.display()))?;

        Ok(Self {
            file,
            path,
            written: 0,
        })
    }

    /// Serialize `record` and append it as a single line
    pub async fn write_record(&mut self, record: &MovieRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record).context("Failed to serialize record")?;
        line.push(b'\n');

        self.file
            .write_all(&line)
            .await
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.file.flush().await?;

        self.written += 1;
        debug!(title = %record.title, path = %self.path.display(), "Record written");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written through this sink
    pub fn written(&self) -> usize {
        self.written
    }
}
