//! Application settings that influence the library engine.

use crate::logging::default_log_level;
use std::path::PathBuf;

/// User-configurable settings persisted in the settings database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Create a backup copy on every save.
    pub backup_on_any_change: bool,
    /// Normalized log level (`trace|debug|info|warn|error`).
    pub log_level: String,
    /// Library opened most recently.
    pub last_library_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_on_any_change: false,
            log_level: default_log_level().to_string(),
            last_library_path: None,
        }
    }
}

impl Settings {
    /// Options handed to the library facade.
    pub fn library_options(&self) -> LibraryOptions {
        LibraryOptions {
            backup_on_any_change: self.backup_on_any_change,
        }
    }
}

/// Library facade behavior derived from [`Settings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryOptions {
    pub backup_on_any_change: bool,
}
