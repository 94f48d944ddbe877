//! SQLite storage layer.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`queries`] - Row-level reads and writes usable inside a transaction
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod migrations;
pub mod queries;
pub mod schema;
pub mod sqlite;

pub use sqlite::{InvalidChannel, MutationContext, SqliteStorage, StatusSummary};
