//! Saving the current project to a remote server.
//!
//! There is no real server. [`SimulatedSync`] waits for a while and reports
//! success, which is enough for the editor to exercise its "unsaved changes"
//! indicator. A sync never modifies the document; a failed one only leaves
//! the unsaved flag set.

use crate::config::EditorConfig;
use crate::store::ProjectStore;
use crate::types::Project;
use futures::future::BoxFuture;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::time::Duration;

/// Reply of a sync backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Whether the server accepted the project
    pub success: bool,
    /// Confirmation text on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Reason on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResponse {
    /// A successful reply.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    /// A failed reply.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Somewhere a project can be pushed to.
pub trait SyncBackend {
    /// Sends a full copy of `project`. Repeating a sync is harmless.
    fn sync_project<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, SyncResponse>;
}

/// A backend that always succeeds after a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSync {
    delay: Duration,
}

impl SimulatedSync {
    /// A backend answering after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A backend using the configured latency.
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(Duration::from_millis(config.sync_delay_ms))
    }

    /// The simulated latency.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedSync {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl SyncBackend for SimulatedSync {
    fn sync_project<'a>(&'a self, project: &'a Project) -> BoxFuture<'a, SyncResponse> {
        Box::pin(async move {
            // wasm builds have no timer runtime and answer immediately
            #[cfg(not(target_arch = "wasm32"))]
            tokio::time::sleep(self.delay).await;
            log::debug!("Simulated sync of project {}", project.id);
            SyncResponse::ok("Project saved successfully")
        })
    }
}

/// Pushes the current project to `backend` and clears the unsaved flag on success.
///
/// The store is only borrowed to take the snapshot and to record the reply,
/// so edits can keep arriving while the sync is in flight. The flag stays set
/// if the sync fails, or if the project was edited again before the reply.
pub async fn save_current_project<B>(store: &RefCell<ProjectStore>, backend: &B) -> SyncResponse
where
    B: SyncBackend + ?Sized,
{
    let Some(snapshot) = store.borrow().current_project().cloned() else {
        return SyncResponse::failed("No project selected");
    };

    let response = backend.sync_project(&snapshot).await;
    if response.success {
        info!("Synced project '{}' ({})", snapshot.name, snapshot.id);
        store.borrow_mut().mark_saved(&snapshot);
    } else {
        warn!(
            "Sync of project {} failed: {}",
            snapshot.id,
            response.error.as_deref().unwrap_or("unknown error")
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Action;
    use crate::types::{Node, Position};
    use std::rc::Rc;

    struct FailingSync;

    /// Lets the editor change the project while the request is out.
    struct EditDuringSync {
        store: Rc<RefCell<ProjectStore>>,
    }

    impl SyncBackend for EditDuringSync {
        fn sync_project<'a>(&'a self, _project: &'a Project) -> BoxFuture<'a, SyncResponse> {
            self.store
                .borrow_mut()
                .dispatch(Action::UpdateNodes(Vec::new()))
                .unwrap();
            Box::pin(async { SyncResponse::ok("Project saved successfully") })
        }
    }

    impl SyncBackend for FailingSync {
        fn sync_project<'a>(&'a self, _project: &'a Project) -> BoxFuture<'a, SyncResponse> {
            Box::pin(async { SyncResponse::failed("Failed to save project to server") })
        }
    }

    fn edited_store() -> RefCell<ProjectStore> {
        let mut store = ProjectStore::default();
        store
            .dispatch(Action::CreateProject(Project::new("Synced", None)))
            .unwrap();
        store
            .dispatch(Action::UpdateNodes(vec![Node::standard(
                "event",
                "Start",
                Position::new(0.0, 0.0),
            )]))
            .unwrap();
        RefCell::new(store)
    }

    #[tokio::test]
    async fn test_successful_sync_clears_unsaved_flag() {
        let store = edited_store();
        assert!(store.borrow().state().has_unsaved_changes);
        let before = store.borrow().current_project().cloned();

        let response = save_current_project(&store, &SimulatedSync::new(Duration::ZERO)).await;

        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("Project saved successfully"));
        assert!(!store.borrow().state().has_unsaved_changes);
        assert_eq!(store.borrow().current_project().cloned(), before);
    }

    #[tokio::test]
    async fn test_failed_sync_keeps_unsaved_flag() {
        let store = edited_store();

        let response = save_current_project(&store, &FailingSync).await;

        assert!(!response.success);
        assert!(store.borrow().state().has_unsaved_changes);
    }

    #[tokio::test]
    async fn test_edit_during_sync_keeps_unsaved_flag() {
        let store = Rc::new(edited_store());
        let backend = EditDuringSync {
            store: Rc::clone(&store),
        };

        let response = save_current_project(&store, &backend).await;

        assert!(response.success);
        assert!(store.borrow().current_nodes().is_empty());
        assert!(store.borrow().state().has_unsaved_changes);
    }

    #[tokio::test]
    async fn test_sync_without_project() {
        let store = RefCell::new(ProjectStore::default());

        let response = save_current_project(&store, &SimulatedSync::default()).await;

        assert_eq!(response, SyncResponse::failed("No project selected"));
    }

    #[test]
    fn test_delay_comes_from_config() {
        let config = EditorConfig {
            sync_delay_ms: 25,
            ..Default::default()
        };

        assert_eq!(SimulatedSync::from_config(&config).delay(), Duration::from_millis(25));
    }
}
