//! Batch conversion orchestrator
//!
//! Drives one conversion call per selected file, strictly in input order, and
//! owns every download handle a batch produces. In automatic mode a handle is
//! created, delivered and released before the next file is touched. In manual
//! mode it is parked in the pending list until [`BatchOrchestrator::download_pending`]
//! consumes it or the orchestrator is dropped.

use crate::download::DownloadSink;
use crate::endpoint::{ConversionEndpoint, ConversionRequest};
use crate::error::{ClientError, ClientResult};
use crate::handle::{DownloadHandle, HandleStore};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// One file chosen for conversion
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: Option<String>,
    source: FileSource,
}

#[derive(Debug, Clone)]
enum FileSource {
    Memory(Vec<u8>),
    /// Read when the file's request is built, not at selection time
    Path(PathBuf),
}

impl SelectedFile {
    /// Select a file on disk; its name is the path's final component
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    /// Select bytes already in memory
    pub fn from_bytes(name: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn load(&self) -> ClientResult<Vec<u8>> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => Ok(tokio::fs::read(path).await?),
        }
    }
}

/// File name used when a converted file is downloaded.
///
/// `converted_<name>.<format>`, or `converted_<index>.<format>` when the
/// input had no name.
pub fn download_name(original_name: Option<&str>, index: usize, format: &str) -> String {
    match original_name.filter(|n| !n.is_empty()) {
        Some(name) => format!("converted_{name}.{format}"),
        None => format!("converted_{index}.{format}"),
    }
}

/// Identifies one pending artifact within an orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(u64);

/// A conversion result held for manual download
#[derive(Debug)]
pub struct ConvertedArtifact {
    id: ArtifactId,
    original_name: Option<String>,
    index: usize,
    target_format: String,
    handle: DownloadHandle,
}

impl ConvertedArtifact {
    fn info(&self) -> PendingArtifact {
        PendingArtifact {
            id: self.id,
            original_name: self.original_name.clone(),
            index: self.index,
            target_format: self.target_format.clone(),
            download_name: download_name(self.original_name.as_deref(), self.index, &self.target_format),
            size: self.handle.len(),
        }
    }
}

/// Read-only view of a pending artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingArtifact {
    pub id: ArtifactId,
    pub original_name: Option<String>,
    /// Position of the source file in its batch
    pub index: usize,
    pub target_format: String,
    pub download_name: String,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPhase {
    #[default]
    Idle,
    InFlight,
}

/// Snapshot of the orchestrator's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchState {
    pub selected: usize,
    pub target_format: String,
    pub manual_download: bool,
    pub phase: BatchPhase,
    pub last_error: Option<String>,
    pub pending: usize,
}

impl BatchState {
    pub fn in_flight(&self) -> bool {
        self.phase == BatchPhase::InFlight
    }
}

/// Progress notifications emitted while a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        name: Option<String>,
    },
    Converted {
        index: usize,
        bytes: usize,
        /// Kept for manual download rather than delivered
        pending: bool,
    },
    Failed {
        index: usize,
        message: String,
    },
}

/// The file that stopped a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub index: usize,
    pub name: Option<String>,
    pub message: String,
}

/// Summary of one `convert_batch` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Files submitted to the endpoint, including a failed one
    pub attempted: usize,
    pub completed: usize,
    pub failure: Option<FileFailure>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

type Observer = Box<dyn Fn(&BatchEvent) + Send + Sync>;

#[derive(Debug, Default)]
struct Inner {
    selection: Vec<SelectedFile>,
    target_format: String,
    manual_download: bool,
    phase: BatchPhase,
    last_error: Option<String>,
    pending: Vec<ConvertedArtifact>,
    next_id: u64,
}

/// Returns the orchestrator to `Idle` however the batch ends, including when
/// the batch future is dropped mid-flight.
struct InFlightGuard<'a>(&'a Mutex<Inner>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).phase = BatchPhase::Idle;
    }
}

/// Sequential batch converter with optional deferred downloads
pub struct BatchOrchestrator<E, S, D>
where
    E: ConversionEndpoint,
    S: HandleStore,
    D: DownloadSink,
{
    endpoint: E,
    store: S,
    sink: D,
    inner: Mutex<Inner>,
    observer: Option<Observer>,
}

impl<E, S, D> BatchOrchestrator<E, S, D>
where
    E: ConversionEndpoint,
    S: HandleStore,
    D: DownloadSink,
{
    pub fn new(endpoint: E, store: S, sink: D) -> Self {
        Self {
            endpoint,
            store,
            sink,
            inner: Mutex::new(Inner {
                target_format: "png".to_string(),
                ..Inner::default()
            }),
            observer: None,
        }
    }

    /// Register a callback for per-file progress events
    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(&BatchEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }

    /// Replace the selection and clear the last error
    pub fn select_files(&self, files: Vec<SelectedFile>) -> ClientResult<()> {
        let mut inner = self.lock();
        if inner.phase == BatchPhase::InFlight {
            return Err(ClientError::BatchInFlight);
        }
        inner.selection = files;
        inner.last_error = None;
        Ok(())
    }

    pub fn set_target_format(&self, format: impl Into<String>) {
        self.lock().target_format = format.into();
    }

    pub fn set_manual_download(&self, enabled: bool) {
        self.lock().manual_download = enabled;
    }

    pub fn state(&self) -> BatchState {
        let inner = self.lock();
        BatchState {
            selected: inner.selection.len(),
            target_format: inner.target_format.clone(),
            manual_download: inner.manual_download,
            phase: inner.phase,
            last_error: inner.last_error.clone(),
            pending: inner.pending.len(),
        }
    }

    /// Pending artifacts in the order they were produced
    pub fn pending(&self) -> Vec<PendingArtifact> {
        self.lock().pending.iter().map(ConvertedArtifact::info).collect()
    }

    /// Convert the current selection with the current format and mode
    pub async fn convert_selected(&self) -> ClientResult<BatchOutcome> {
        let (files, format, manual) = {
            let inner = self.lock();
            (inner.selection.clone(), inner.target_format.clone(), inner.manual_download)
        };
        self.convert_batch(&files, &format, manual).await
    }

    /// Convert `files` one at a time, in order, stopping at the first failure.
    ///
    /// Returns `Err` only when the batch cannot start. A failing file ends the
    /// batch with `Ok` and its message in both the outcome and `last_error`;
    /// files before it keep their download or pending entry.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn convert_batch(&self, files: &[SelectedFile], format: &str, manual: bool) -> ClientResult<BatchOutcome> {
        let format = format.trim().to_ascii_lowercase();
        let _guard = {
            let mut inner = self.lock();
            if inner.phase == BatchPhase::InFlight {
                return Err(ClientError::BatchInFlight);
            }
            if files.is_empty() {
                inner.last_error = Some(ClientError::NoFilesSelected.user_message());
                return Err(ClientError::NoFilesSelected);
            }
            inner.phase = BatchPhase::InFlight;
            inner.last_error = None;
            inner.target_format = format.clone();
            inner.manual_download = manual;
            InFlightGuard(&self.inner)
        };

        let total = files.len();
        let mut outcome = BatchOutcome {
            attempted: 0,
            completed: 0,
            failure: None,
        };

        for (index, file) in files.iter().enumerate() {
            self.emit(BatchEvent::Started {
                index,
                total,
                name: file.name.clone(),
            });
            outcome.attempted += 1;

            match self.convert_one(index, file, &format, manual).await {
                Ok(bytes) => {
                    outcome.completed += 1;
                    self.emit(BatchEvent::Converted {
                        index,
                        bytes,
                        pending: manual,
                    });
                }
                Err(e) => {
                    let message = e.user_message();
                    warn!(index, file = ?file.name, error = %e, "Conversion failed, stopping batch");
                    self.lock().last_error = Some(message.clone());
                    self.emit(BatchEvent::Failed {
                        index,
                        message: message.clone(),
                    });
                    outcome.failure = Some(FileFailure {
                        index,
                        name: file.name.clone(),
                        message,
                    });
                    break;
                }
            }
        }

        info!(
            attempted = outcome.attempted,
            completed = outcome.completed,
            failed = outcome.failure.is_some(),
            "Batch finished"
        );
        Ok(outcome)
    }

    /// Convert one file and settle its handle. Returns the converted size.
    async fn convert_one(&self, index: usize, file: &SelectedFile, format: &str, manual: bool) -> ClientResult<usize> {
        let request = ConversionRequest {
            bytes: file.load().await?,
            file_name: file.name.clone(),
            format: format.to_string(),
        };
        let converted = self.endpoint.convert(request).await?;
        let size = converted.bytes.len();
        let handle = self.store.create(converted.bytes, &converted.content_type)?;

        if manual {
            let mut inner = self.lock();
            let id = ArtifactId(inner.next_id);
            inner.next_id += 1;
            debug!(index, ?id, "Holding converted file for manual download");
            inner.pending.push(ConvertedArtifact {
                id,
                original_name: file.name.clone(),
                index,
                target_format: format.to_string(),
                handle,
            });
            return Ok(size);
        }

        let name = download_name(file.name.as_deref(), index, format);
        let delivered = self
            .store
            .read(&handle)
            .and_then(|bytes| self.sink.deliver(&name, &bytes));
        self.store.release(handle);
        delivered?;
        Ok(size)
    }

    /// Deliver a pending artifact, then drop it from the list and release its
    /// handle.
    ///
    /// Returns `Ok(false)` when `id` is no longer pending. If delivery fails the
    /// artifact stays pending.
    pub fn download_pending(&self, id: ArtifactId) -> ClientResult<bool> {
        let mut inner = self.lock();
        let Some(position) = inner.pending.iter().position(|a| a.id == id) else {
            debug!(?id, "Artifact already downloaded");
            return Ok(false);
        };

        let artifact = &inner.pending[position];
        let name = download_name(artifact.original_name.as_deref(), artifact.index, &artifact.target_format);
        let bytes = self.store.read(&artifact.handle)?;
        self.sink.deliver(&name, &bytes)?;

        let artifact = inner.pending.remove(position);
        self.store.release(artifact.handle);
        Ok(true)
    }

    /// Release every pending handle without downloading. Returns how many were
    /// released.
    pub fn release_all(&self) -> usize {
        let drained: Vec<ConvertedArtifact> = self.lock().pending.drain(..).collect();
        let count = drained.len();
        for artifact in drained {
            self.store.release(artifact.handle);
        }
        count
    }
}

impl<E, S, D> Drop for BatchOrchestrator<E, S, D>
where
    E: ConversionEndpoint,
    S: HandleStore,
    D: DownloadSink,
{
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            debug!(released, "Released pending artifacts on teardown");
        }
    }
}
