//! # Flow Diagrammer
//!
//! The document engine of a visual diagram editor whose diagrams nest: any
//! process node opens a sub-diagram of its own, to any depth.
//!
//! - [`types`] defines the recursive document tree rooted at a [`Project`]
//! - [`flow`] resolves process paths and applies copy-on-write edits
//! - [`history`] keeps undo/redo snapshots of whole projects
//! - [`store`] is the reducer every editor command goes through
//! - [`persistence`] stores, exports, imports and syncs projects
//!
//! ## Example
//!
//! ```
//! use flow_diagrammer::{Action, Project, ProjectStore};
//!
//! let mut store = ProjectStore::default();
//! store.dispatch(Action::CreateProject(Project::new("Checkout Flow", None))).unwrap();
//! let pid = store.create_process("Validate Payment", None, None).unwrap();
//! store.dispatch(Action::EnterProcess(pid)).unwrap();
//! assert_eq!(store.breadcrumbs().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod constants;
pub mod error;
pub mod flow;
pub mod history;
pub mod ids;
pub mod persistence;
pub mod store;
pub mod templates;
pub mod types;

// Re-export the types most callers need
pub use config::EditorConfig;
pub use error::{FlowError, PersistenceError};
pub use history::History;
pub use persistence::{ImportOptions, ImportResult, ProjectExportData, ProjectRepository};
pub use store::{Action, ProjectState, ProjectStore, StoreEvent};
pub use templates::{build_template, TemplateKind};
pub use types::*;
