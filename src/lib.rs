//! Codeplug manager: one channel library, many radios.
//!
//! This crate provides the core functionality for the `cpm` CLI tool.
//!
//! # Architecture
//!
//! - [`model`] - Canonical data types (Channel, Contact, Zone, ScanList, ...)
//! - [`normalize`] - Value normalizers for vendor spellings
//! - [`codec`] - Per-dialect CSV decoders and encoders
//! - [`resolve`] - Talkgroup name to contact linking
//! - [`membership`] - Collection membership and channel renumbering
//! - [`storage`] - SQLite database layer
//! - [`transfer`] - Import/export orchestration with progress
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod membership;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod storage;
pub mod transfer;

pub use error::{Error, Result};

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Escape a value for CSV output (wrap in quotes if it contains commas, quotes, or newlines).
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
