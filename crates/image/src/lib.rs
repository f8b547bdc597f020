//! Image conversion primitives for imgconv.
//!
//! This crate provides:
//! - The output format model and the supported-format whitelist
//! - Input format detection from magic bytes
//! - The conversion capability the HTTP endpoint delegates to
//! - Alpha flattening for formats without transparency

#![warn(missing_docs)]

mod detect;
mod error;
mod format;

#[cfg(feature = "processing")]
mod alpha;

#[cfg(feature = "processing")]
mod convert;

pub use detect::{ImageFormat, detect_format};
pub use error::{ImageError, Result};
pub use format::{FormatWhitelist, TargetFormat};

#[cfg(feature = "processing")]
pub use alpha::{flatten_alpha, has_alpha_channel};

#[cfg(feature = "processing")]
pub use convert::{ImageConverter, LOSSY_QUALITY, StandardConverter, convert_image};
