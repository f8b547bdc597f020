//! Error types for the client

use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Message shown when the server's error body carries no message
pub const GENERIC_FAILURE: &str = "Conversion failed";

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// The batch was started without any files
    #[error("No files selected")]
    NoFilesSelected,

    /// A batch is already running on this orchestrator
    #[error("A conversion batch is already in flight")]
    BatchInFlight,

    /// The endpoint answered with a structured error
    #[error("Conversion rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// `error` field of the response body
        message: String,
    },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading an input file or writing a download failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A download handle could not be created or read
    #[error("Handle error: {0}")]
    Handle(String),

    /// Delivering a converted file failed
    #[error("Download failed: {0}")]
    Download(String),
}

impl ClientError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a rejection from a response
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// The single human-readable line shown for this error.
    ///
    /// Server rejections are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoFilesSelected => "Please select at least one file to convert.".to_string(),
            Self::BatchInFlight => "A conversion is already running.".to_string(),
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport(e) if e.is_timeout() => "The conversion request timed out.".to_string(),
            Self::Transport(_) => "An error occurred during conversion. Please try again.".to_string(),
            Self::Io(e) => format!("Could not read or write a file: {e}"),
            Self::Config(msg) => format!("Invalid configuration: {msg}"),
            Self::Handle(msg) | Self::Download(msg) => format!("Could not save the converted file: {msg}"),
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status >= 500)
    }
}
