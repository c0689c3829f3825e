//! Error types for the document engine and its storage.

use thiserror::Error;

/// Errors raised while reading or mutating the document tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A process path names a process that does not exist
    #[error("Process '{missing}' not found while resolving path {path:?}")]
    InvalidPath {
        /// The full path being resolved
        path: Vec<String>,
        /// The first segment that did not resolve
        missing: String,
    },

    /// A content action arrived while no project was open
    #[error("No project is currently selected")]
    NoProjectSelected,

    /// No project in the collection has this id
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),
}

/// Errors raised by the storage backends and the project repository.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The backend refused or could not be reached
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// Stored or exported JSON did not match the expected shape
    #[error("Failed to (de)serialize stored data: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reading or writing a file failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// No stored project has this id
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),
}
