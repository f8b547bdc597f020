//! Where converted files end up once a download is triggered

use crate::error::{ClientError, ClientResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Receiver of downloaded files
pub trait DownloadSink: Send + Sync {
    /// Hand `bytes` to the user under `file_name`
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> ClientResult<()>;
}

impl<T: DownloadSink + ?Sized> DownloadSink for Arc<T> {
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> ClientResult<()> {
        (**self).deliver(file_name, bytes)
    }
}

/// Writes downloads into a directory, creating it on first use
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a download named `file_name` would be written to.
    ///
    /// Only the final path component is kept, so a name can never escape the
    /// target directory.
    pub fn target_path(&self, file_name: &str) -> ClientResult<PathBuf> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| ClientError::Download(format!("invalid file name: {file_name:?}")))?;
        Ok(self.root.join(name))
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> ClientResult<()> {
        let path = self.target_path(file_name)?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved converted file");
        Ok(())
    }
}

/// Keeps deliveries in memory, in delivery order
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all deliveries so far
    pub fn names(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn deliveries(&self) -> Vec<(String, Vec<u8>)> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DownloadSink for RecordingSink {
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> ClientResult<()> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((file_name.to_string(), bytes.to_vec()));
        Ok(())
    }
}
