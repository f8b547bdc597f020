//! Terminal helpers for the imgconv command line
//!
//! Provides shared CLI functionality:
//! - Terminal output formatting
//! - Batch progress display
//! - Manual download prompts

#![warn(missing_docs)]

pub mod output;
pub mod progress;
pub mod prompt;
