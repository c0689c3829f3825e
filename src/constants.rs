//! Shared application-wide constants.
//! Centralizes tweakable values used by the store, the mutator and persistence.

// Undo/redo
/// Maximum number of undo history entries to retain.
pub const MAX_UNDO_HISTORY: usize = 50;

// Storage
/// Storage key holding the serialized project collection.
pub const PROJECTS_STORAGE_KEY: &str = "react-flow-projects";
/// Storage key holding the registered custom node types.
pub const CUSTOM_NODES_STORAGE_KEY: &str = "react-flow-custom-nodes";
/// Storage key holding the execution-flow visibility preference.
pub const EXECUTION_FLOW_STORAGE_KEY: &str = "showExecutionFlow";

// Export format
/// Version string written into every export file.
pub const EXPORT_VERSION: &str = "1.0.0";

// Node defaults
/// Position used for a new process node when the caller gives none.
pub const DEFAULT_PROCESS_POSITION: (f64, f64) = (300.0, 300.0);
/// Node type tag for process nodes.
pub const PROCESS_NODE_TYPE: &str = "process";
/// Node type tag for user-defined custom nodes.
pub const CUSTOM_NODE_TYPE: &str = "custom";
/// Prefix of palette identifiers that describe a custom node (`custom::name::dir`).
pub const CUSTOM_PALETTE_PREFIX: &str = "custom::";
/// Substring marking a handle as part of the execution flow.
pub const EXECUTION_HANDLE_MARKER: &str = "exec";

// Sync
/// Simulated latency of the stub sync backend, in milliseconds.
pub const SIMULATED_SYNC_DELAY_MS: u64 = 800;
