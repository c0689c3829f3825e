//! Runtime configuration for the editor core.
//!
//! Every field has a default taken from [`crate::constants`], so a config file
//! only needs the values it overrides.

use crate::constants::*;
use crate::types::Position;
use serde::{Deserialize, Serialize};

/// Tunables shared by the store, the repository and the sync backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo entries kept per project session
    pub history_limit: usize,
    /// Version written into export files
    pub export_version: String,
    /// Storage key for the project collection
    pub projects_key: String,
    /// Storage key for the custom node registry
    pub custom_nodes_key: String,
    /// Storage key for the execution-flow visibility preference
    pub execution_flow_key: String,
    /// Where process nodes land when the caller gives no position
    pub default_process_position: Position,
    /// Latency of the simulated sync backend, in milliseconds
    pub sync_delay_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: MAX_UNDO_HISTORY,
            export_version: EXPORT_VERSION.to_string(),
            projects_key: PROJECTS_STORAGE_KEY.to_string(),
            custom_nodes_key: CUSTOM_NODES_STORAGE_KEY.to_string(),
            execution_flow_key: EXECUTION_FLOW_STORAGE_KEY.to_string(),
            default_process_position: DEFAULT_PROCESS_POSITION.into(),
            sync_delay_ms: SIMULATED_SYNC_DELAY_MS,
        }
    }
}

impl EditorConfig {
    /// Deserialize a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{"historyLimit": 10}"#).unwrap();

        assert_eq!(config.history_limit, 10);
        assert_eq!(config.projects_key, "react-flow-projects");
        assert_eq!(config.custom_nodes_key, "react-flow-custom-nodes");
        assert_eq!(config.default_process_position, Position::new(300.0, 300.0));
    }
}
