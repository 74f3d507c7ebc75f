//! Library use-case services.
//!
//! # Responsibility
//! - Expose the UUID-addressed library facade to UI and collaborators.
//! - Translate model, codec and file errors into titled facade errors.
//! - Provide read-only presentation helpers (descriptions, rows, drag data).

pub mod describe;
pub mod drag;
pub mod error;
pub mod library_service;
pub mod projection;
