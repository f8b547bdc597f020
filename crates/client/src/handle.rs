//! Download handles: ownership tokens over transient converted bytes.
//!
//! A [`DownloadHandle`] is created by a [`HandleStore`] and must be given back
//! to the same store through [`HandleStore::release`]. Release takes the
//! handle by value and handles are not `Clone`, so a handle cannot be released
//! twice.

use crate::error::{ClientError, ClientResult};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

/// Token over one stored binary resource
#[derive(Debug, PartialEq, Eq)]
pub struct DownloadHandle {
    id: Uuid,
    len: usize,
    content_type: String,
}

impl DownloadHandle {
    fn new(len: usize, content_type: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            len,
            content_type: content_type.to_string(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Size of the stored bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Storage for converted bytes between conversion and download
pub trait HandleStore: Send + Sync {
    /// Store `bytes` and return the handle that owns them
    fn create(&self, bytes: Vec<u8>, content_type: &str) -> ClientResult<DownloadHandle>;

    /// Read the bytes behind a live handle
    fn read(&self, handle: &DownloadHandle) -> ClientResult<Vec<u8>>;

    /// Free the resource behind `handle`
    fn release(&self, handle: DownloadHandle);

    /// Number of handles created and not yet released
    fn live(&self) -> usize;
}

impl<T: HandleStore + ?Sized> HandleStore for Arc<T> {
    fn create(&self, bytes: Vec<u8>, content_type: &str) -> ClientResult<DownloadHandle> {
        (**self).create(bytes, content_type)
    }

    fn read(&self, handle: &DownloadHandle) -> ClientResult<Vec<u8>> {
        (**self).read(handle)
    }

    fn release(&self, handle: DownloadHandle) {
        (**self).release(handle);
    }

    fn live(&self) -> usize {
        (**self).live()
    }
}

/// In-process buffers, freed on release
#[derive(Debug, Default)]
pub struct MemoryStore {
    buffers: Mutex<HashMap<Uuid, Vec<u8>>>,
    created: AtomicUsize,
    released: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total handles ever created
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Total handles ever released
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl HandleStore for MemoryStore {
    fn create(&self, bytes: Vec<u8>, content_type: &str) -> ClientResult<DownloadHandle> {
        let handle = DownloadHandle::new(bytes.len(), content_type);
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id, bytes);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn read(&self, handle: &DownloadHandle) -> ClientResult<Vec<u8>> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| ClientError::Handle(format!("unknown handle {}", handle.id)))
    }

    fn release(&self, handle: DownloadHandle) {
        let removed = self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id);
        if removed.is_some() {
            self.released.fetch_add(1, Ordering::SeqCst);
        } else {
            warn!(handle = %handle.id, "Released a handle this store does not own");
        }
    }

    fn live(&self) -> usize {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// One temporary file per handle, deleted on release
#[derive(Debug, Default)]
pub struct TempFileStore {
    files: Mutex<HashMap<Uuid, NamedTempFile>>,
}

impl TempFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandleStore for TempFileStore {
    fn create(&self, bytes: Vec<u8>, content_type: &str) -> ClientResult<DownloadHandle> {
        let mut file = tempfile::Builder::new().prefix("imgconv-").suffix(".part").tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;

        let handle = DownloadHandle::new(bytes.len(), content_type);
        debug!(handle = %handle.id, path = %file.path().display(), "Created temp file handle");
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.id, file);
        Ok(handle)
    }

    fn read(&self, handle: &DownloadHandle) -> ClientResult<Vec<u8>> {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        let file = files
            .get(&handle.id)
            .ok_or_else(|| ClientError::Handle(format!("unknown handle {}", handle.id)))?;
        Ok(std::fs::read(file.path())?)
    }

    fn release(&self, handle: DownloadHandle) {
        let removed = self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id);
        match removed {
            Some(file) => {
                if let Err(e) = file.close() {
                    warn!(handle = %handle.id, error = %e, "Failed to delete temp file");
                }
            }
            None => warn!(handle = %handle.id, "Released a handle this store does not own"),
        }
    }

    fn live(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
