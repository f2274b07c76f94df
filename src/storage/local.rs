//! Local filesystem diagnostic sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::storage::{DiagnosticSink, DiagnosticStage};

/// Writes diagnostic payloads as pretty JSON under one folder.
#[derive(Debug, Clone)]
pub struct LocalDiagnostics {
    root_dir: PathBuf,
}

impl LocalDiagnostics {
    /// Create a sink rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a file name.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }
}

#[async_trait]
impl DiagnosticSink for LocalDiagnostics {
    async fn record(
        &self,
        crate_id: &str,
        stage: DiagnosticStage,
        payload: &Value,
    ) -> Result<String> {
        let path = self.write_json(&stage.file_name(crate_id), payload).await?;
        let shown = path.display().to_string();
        log::error!("Verify data in: {}", shown);
        Ok(shown)
    }
}
