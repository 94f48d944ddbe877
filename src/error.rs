//! Error types for the codeplug manager.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

/// Result type alias for codeplug operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    ChannelNotFound,
    ZoneNotFound,
    ScanListNotFound,
    ContactNotFound,
    DirectoryEntryNotFound,
    AllowListNotFound,

    // Validation (exit 4)
    ValidationFailed,
    InvalidArgument,
    UnknownDialect,

    // Precondition (exit 5)
    RenumberMismatch,

    // Transfer (exit 6)
    TransferError,
    MalformedFile,
    Cancelled,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    CsvError,

    // Network (exit 9)
    NetworkError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ChannelNotFound => "CHANNEL_NOT_FOUND",
            Self::ZoneNotFound => "ZONE_NOT_FOUND",
            Self::ScanListNotFound => "SCAN_LIST_NOT_FOUND",
            Self::ContactNotFound => "CONTACT_NOT_FOUND",
            Self::DirectoryEntryNotFound => "DIRECTORY_ENTRY_NOT_FOUND",
            Self::AllowListNotFound => "ALLOW_LIST_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::UnknownDialect => "UNKNOWN_DIALECT",
            Self::RenumberMismatch => "RENUMBER_MISMATCH",
            Self::TransferError => "TRANSFER_ERROR",
            Self::MalformedFile => "MALFORMED_FILE",
            Self::Cancelled => "CANCELLED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::CsvError => "CSV_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::ChannelNotFound
            | Self::ZoneNotFound
            | Self::ScanListNotFound
            | Self::ContactNotFound
            | Self::DirectoryEntryNotFound
            | Self::AllowListNotFound => 3,
            Self::ValidationFailed | Self::InvalidArgument | Self::UnknownDialect => 4,
            Self::RenumberMismatch => 5,
            Self::TransferError | Self::MalformedFile | Self::Cancelled => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::CsvError => 8,
            Self::NetworkError => 9,
        }
    }

    /// Whether a caller should retry with corrected input.
    ///
    /// True for bad input and for transient failures (busy database,
    /// network). False for not-found and internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed
                | Self::InvalidArgument
                | Self::UnknownDialect
                | Self::RenumberMismatch
                | Self::DatabaseError
                | Self::NetworkError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in codeplug operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `cpm init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Channel not found: {id}")]
    ChannelNotFound { id: i64 },

    #[error("Zone not found: {name}")]
    ZoneNotFound { name: String },

    #[error("Scan list not found: {name}")]
    ScanListNotFound { name: String },

    #[error("Roaming zone not found: {name}")]
    RoamingZoneNotFound { name: String },

    #[error("Contact not found: {name}")]
    ContactNotFound { name: String },

    #[error("Directory entry not found: {dmr_id}")]
    DirectoryContactNotFound { dmr_id: i64 },

    #[error("Allow list not found: {name}")]
    AllowListNotFound { name: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Renumber list does not match the channel table: expected {expected} ids, got {actual}")]
    RenumberMismatch { expected: usize, actual: usize },

    #[error("Renumber list is invalid: {0}")]
    RenumberInvalid(String),

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Malformed file {member}: {message}")]
    MalformedFile { member: String, message: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::ChannelNotFound { .. } => ErrorCode::ChannelNotFound,
            Self::ZoneNotFound { .. } | Self::RoamingZoneNotFound { .. } => ErrorCode::ZoneNotFound,
            Self::ScanListNotFound { .. } => ErrorCode::ScanListNotFound,
            Self::ContactNotFound { .. } => ErrorCode::ContactNotFound,
            Self::DirectoryContactNotFound { .. } => ErrorCode::DirectoryEntryNotFound,
            Self::AllowListNotFound { .. } => ErrorCode::AllowListNotFound,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::UnknownDialect(_) => ErrorCode::UnknownDialect,
            Self::RenumberMismatch { .. } | Self::RenumberInvalid(_) => ErrorCode::RenumberMismatch,
            Self::MalformedFile { .. } => ErrorCode::MalformedFile,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Transfer(_) => ErrorCode::TransferError,
            Self::Codec(e) => match e {
                CodecError::Csv(_) => ErrorCode::CsvError,
                CodecError::Io(_) => ErrorCode::IoError,
                CodecError::MissingHeader | CodecError::UnrecognizedLayout(_) => {
                    ErrorCode::MalformedFile
                }
                CodecError::Unsupported { .. } => ErrorCode::InvalidArgument,
            },
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `cpm init` to create the codeplug database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::ChannelNotFound { id } => Some(format!(
                "No channel with ID {id}. Use `cpm channel list` to see available channels."
            )),
            Self::ZoneNotFound { name } => Some(format!(
                "No zone named '{name}'. Use `cpm zone list` or `cpm zone create {name}`."
            )),
            Self::ScanListNotFound { name } => Some(format!(
                "No scan list named '{name}'. Use `cpm scanlist list` or `cpm scanlist create {name}`."
            )),
            Self::ContactNotFound { name } => Some(format!(
                "No contact named '{name}'. Use `cpm contact list` to see available contacts."
            )),
            Self::AllowListNotFound { name } => Some(format!(
                "No allow list named '{name}'. Import one with `cpm allowlist import {name} <file>`."
            )),
            Self::DirectoryContactNotFound { dmr_id } => Some(format!(
                "DMR ID {dmr_id} is not in the directory. Use `cpm directory import` or `cpm directory download`."
            )),

            Self::Validation { field, .. } if field == "color_code" => {
                Some("DMR channels need a color code between 1 and 15".to_string())
            }
            Self::Validation { field, .. } if field == "time_slot" => {
                Some("DMR channels need time slot 1 or 2".to_string())
            }

            Self::RenumberMismatch { expected, .. } => Some(format!(
                "Pass every channel ID exactly once ({expected} in total). \
                 Use `cpm channel list --json` to get the current order."
            )),
            Self::RenumberInvalid(_) => Some(
                "Pass every existing channel ID exactly once. \
                 Use `cpm channel list --json` to get the current order."
                    .to_string(),
            ),

            Self::UnknownDialect(_) => {
                Some("Valid dialects: generic (db25-d), chirp, anytone, dm32uv, radioid".to_string())
            }

            Self::MalformedFile { .. } | Self::Codec(CodecError::UnrecognizedLayout(_)) => Some(
                "Check the header row, or pass `--dialect` explicitly to skip layout detection"
                    .to_string(),
            ),

            Self::Network(_) => Some(
                "Check connectivity, or download the feed manually and use `cpm directory import <file>`"
                    .to_string(),
            ),

            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
