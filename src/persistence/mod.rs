//! Keeping projects outside the process.
//!
//! # Module Organization
//!
//! - `storage` - Key-value backends (memory, files, `localStorage`)
//! - `repository` - Loading, saving, export/import of the project collection
//! - `sync` - The asynchronous "save to server" stub

pub mod repository;
pub mod storage;
pub mod sync;

use crate::types::{CustomNodeType, Project};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use repository::ProjectRepository;
#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStore;
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;
pub use storage::{KeyValueStore, MemoryStore};
pub use sync::{save_current_project, SimulatedSync, SyncBackend, SyncResponse};

/// The content of an export file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectExportData {
    /// Exported projects, complete with their nested processes
    pub projects: Vec<Project>,
    /// The custom node registry at export time
    #[serde(default)]
    pub custom_node_types: Vec<CustomNodeType>,
    /// When the file was written
    pub exported_at: DateTime<Utc>,
    /// Format version of the file
    pub version: String,
}

/// How an import combines with the stored projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Keep existing projects, overwriting those with the same id.
    /// When false every stored project is replaced.
    pub merge: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { merge: true }
    }
}

/// Outcome of an import. Failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Whether anything was written
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Number of projects that were not present before the import
    pub imported: usize,
}

impl ImportResult {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            imported: 0,
        }
    }
}
