//! Core engine of the tag library.
//! This crate is the single source of truth for tree, link and format
//! invariants; UI layers talk to it through [`Library`].

pub mod db;
pub mod format;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use format::{DecodedLibrary, FormatError, LibraryMetadata, FORMAT_VERSION};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::icon::IconRef;
pub use model::link::{LinkResolution, ResolveError, ShadowNode};
pub use model::node::{Node, NodeError, NodeId, NodeType};
pub use model::settings::{LibraryOptions, Settings};
pub use model::tree::{NodeKey, Tree, TreeError};
pub use repo::settings_repo::{
    SettingsRepoError, SettingsRepoResult, SettingsRepository, SqliteSettingsRepository,
};
pub use service::describe::RichText;
pub use service::drag::{DragError, DRAG_MIME_TYPE};
pub use service::error::{ChangeError, LibraryError, LibraryResult, LinkError, MoveError};
pub use service::library_service::{
    DeleteReport, Library, LibraryEvent, LoadReport, NodeSummary, SaveReport,
};
pub use service::projection::{row_data, rows, Row, RowData, RowNode};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
