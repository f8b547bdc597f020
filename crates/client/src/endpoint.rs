//! The conversion call as seen from the client side.

use crate::error::ClientResult;
use async_trait::async_trait;
use std::sync::Arc;

/// One file submitted for conversion. Built per call and consumed by it.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Raw input bytes
    pub bytes: Vec<u8>,
    /// Original file name, when the source has one
    pub file_name: Option<String>,
    /// Requested target format name
    pub format: String,
}

/// Bytes returned by a successful conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Outcome of one conversion call
pub type ConversionResult = ClientResult<ConvertedImage>;

/// Something that converts one file per call.
///
/// [`crate::ConvertClient`] implements this over HTTP; tests substitute
/// in-process fakes.
#[async_trait]
pub trait ConversionEndpoint: Send + Sync {
    /// Convert a single file
    async fn convert(&self, request: ConversionRequest) -> ConversionResult;
}

#[async_trait]
impl<T: ConversionEndpoint + ?Sized> ConversionEndpoint for Arc<T> {
    async fn convert(&self, request: ConversionRequest) -> ConversionResult {
        (**self).convert(request).await
    }
}
