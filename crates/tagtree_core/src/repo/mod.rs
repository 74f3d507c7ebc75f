//! Persistence boundaries.
//!
//! # Responsibility
//! - Store library documents as files with atomic replace and backups.
//! - Store application settings in the SQLite settings database.
//!
//! # Invariants
//! - Repository APIs return semantic errors in addition to transport errors.

pub mod library_file;
pub mod settings_repo;
