//! Client side of imgconv
//!
//! - [`ConvertClient`]: one multipart request per file against the conversion server
//! - [`BatchOrchestrator`]: sequential batches with automatic or manual downloads
//! - [`HandleStore`]: ownership tokens over converted bytes, released exactly once
//! - [`DownloadSink`]: where downloaded files are written
//!
//! # Example
//!
//! ```rust,no_run
//! use imgconv_client::{BatchOrchestrator, ConvertClient, DirectorySink, MemoryStore, SelectedFile};
//!
//! # async fn run() -> imgconv_client::ClientResult<()> {
//! let orchestrator = BatchOrchestrator::new(ConvertClient::new()?, MemoryStore::new(), DirectorySink::new("out"));
//! let files = vec![SelectedFile::from_path("photo.png")];
//! let outcome = orchestrator.convert_batch(&files, "webp", false).await?;
//! println!("{} converted", outcome.completed);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod download;
pub mod endpoint;
pub mod error;
pub mod handle;
pub mod orchestrator;

pub use client::{ConvertClient, HealthStatus};
pub use config::ClientConfig;
pub use download::{DirectorySink, DownloadSink, RecordingSink};
pub use endpoint::{ConversionEndpoint, ConversionRequest, ConversionResult, ConvertedImage};
pub use error::{ClientError, ClientResult};
pub use handle::{DownloadHandle, HandleStore, MemoryStore, TempFileStore};
pub use orchestrator::{
    ArtifactId, BatchEvent, BatchOrchestrator, BatchOutcome, BatchPhase, BatchState, FileFailure, PendingArtifact,
    SelectedFile, download_name,
};
