//! Endpoint errors and their wire representation.
//!
//! Every failure path of the endpoint ends in one of these variants, and every
//! variant renders as `{"error": "<message>"}` with a fixed status code. Clients
//! match on the message text, so the strings here are part of the contract.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message for a request lacking the `file` or `format` field
pub const MISSING_INPUT: &str = "Missing file or format";
/// Message for a format outside the whitelist
pub const UNSUPPORTED_FORMAT: &str = "Unsupported format";
/// Message for a codec failure
pub const CONVERSION_FAILED: &str = "Failed to convert image";
/// Message for any other failure caught at the outer boundary
pub const INTERNAL_FAILURE: &str = "Conversion failed";
/// Message for a body above the configured ceiling
pub const PAYLOAD_TOO_LARGE: &str = "Payload too large";

#[derive(Error, Debug)]
pub enum ConvertError {
    /// `file` or `format` absent or empty
    #[error("Missing file or format")]
    MissingInput,

    /// Requested format is not in the whitelist
    #[error("Unsupported format: {requested}")]
    UnsupportedFormat { requested: String },

    /// The image capability rejected the input
    #[error("Conversion failed: {cause}")]
    ConversionFailed { cause: String },

    /// Body exceeded the transport limit
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Unexpected failure outside the codec call
    #[error("Unexpected conversion error: {detail}")]
    Internal { detail: String },
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ConvertError {
    pub fn conversion(cause: impl Into<String>) -> Self {
        Self::ConversionFailed { cause: cause.into() }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal { detail: detail.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::MissingInput | ConvertError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            ConvertError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ConvertError::ConversionFailed { .. } | ConvertError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the client-facing message, without the underlying cause
    pub fn user_message(&self) -> &'static str {
        match self {
            ConvertError::MissingInput => MISSING_INPUT,
            ConvertError::UnsupportedFormat { .. } => UNSUPPORTED_FORMAT,
            ConvertError::ConversionFailed { .. } => CONVERSION_FAILED,
            ConvertError::PayloadTooLarge { .. } => PAYLOAD_TOO_LARGE,
            ConvertError::Internal { .. } => INTERNAL_FAILURE,
        }
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        match &self {
            ConvertError::ConversionFailed { .. } => {
                tracing::error!("Error during image conversion: {}", self);
            }
            ConvertError::Internal { .. } => {
                tracing::error!("{}", self);
            }
            ConvertError::PayloadTooLarge { .. } => {
                tracing::warn!("Rejected oversized request: {}", self);
            }
            ConvertError::MissingInput | ConvertError::UnsupportedFormat { .. } => {
                tracing::info!("Rejected conversion request: {}", self);
            }
        }

        let body = ErrorBody {
            error: self.user_message().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
