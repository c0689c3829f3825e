//! Reading and editing the nested document tree.
//!
//! # Module Organization
//!
//! - `path` - Resolving process paths to levels, breadcrumbs
//! - `mutator` - Copy-on-write updates and the cascading process/custom-type operations
//! - `canvas` - Per-level list edits (palette drops, connections, deletions)

pub mod canvas;
pub mod mutator;
pub mod path;

pub use mutator::{
    create_process, delete_process, find_custom_node_usages, remove_custom_node_type,
    rename_process, update_flow, update_flow_with, CustomNodeUsage, FlowPatch,
};
pub use path::{breadcrumbs, is_valid_path, resolve, valid_prefix, Breadcrumb};
