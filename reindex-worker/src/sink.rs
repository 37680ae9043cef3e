use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::SinkError;

/// Somewhere generated spreadsheets are handed over to the caller.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Store `bytes` as `file_name`, returning a URL the caller can fetch it from.
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, SinkError>;
}

/// Writes every file into a local directory, creating it if needed.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, SinkError> {
        let write_error = |error| SinkError::WriteError {
            file: file_name.to_owned(),
            error,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_error)?;
        let dir = tokio::fs::canonicalize(&self.dir)
            .await
            .map_err(write_error)?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await.map_err(write_error)?;
        debug!(path = %path.display(), "wrote output file");

        let url = Url::from_file_path(&path)
            .map_err(|_| SinkError::UrlError(path.display().to_string()))?;
        Ok(url.to_string())
    }
}

/// Keeps every file in memory, for callers embedding the pipeline.
#[derive(Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every file stored so far, in the order they were stored.
    pub fn take(&self) -> Vec<(String, Vec<u8>)> {
        match self.files.lock() {
            Ok(mut files) => std::mem::take(&mut *files),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, SinkError> {
        match self.files.lock() {
            Ok(mut files) => files.push((file_name.to_owned(), bytes)),
            Err(poisoned) => poisoned.into_inner().push((file_name.to_owned(), bytes)),
        }
        Ok(format!("memory:///{file_name}"))
    }
}
