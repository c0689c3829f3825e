//! The project repository: the store's view of durable storage.
//!
//! Reads never fail loudly. A missing or corrupt entry is logged and replaced
//! by its default, the way a fresh editor would start. Writes return their
//! error so the caller can report it, and never touch the in-memory document.

use super::storage::KeyValueStore;
use super::{ImportOptions, ImportResult, ProjectExportData};
use crate::config::EditorConfig;
use crate::error::{FlowError, PersistenceError};
use crate::store::{Action, ProjectState, ProjectStore, StoreEvent};
use crate::types::{CustomNodeType, Project};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;

/// Fields every imported project must carry with a non-empty value.
const REQUIRED_PROJECT_FIELDS: [&str; 4] = ["id", "name", "createdAt", "updatedAt"];

/// Loads and saves projects, custom node types and preferences.
#[derive(Debug)]
pub struct ProjectRepository<S> {
    storage: S,
    config: EditorConfig,
}

impl<S: KeyValueStore> ProjectRepository<S> {
    /// Creates a repository over `storage`, using the keys from `config`.
    pub fn new(storage: S, config: EditorConfig) -> Self {
        Self { storage, config }
    }

    /// The underlying backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The configuration the repository was created with.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!("Failed to read storage key \"{key}\": {e}");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Failed to parse storage key \"{key}\": {e}");
            T::default()
        })
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(value)?;
        self.storage.set(key, &json)?;
        debug!("Saved storage key \"{key}\" ({} bytes)", json.len());
        Ok(())
    }

    /// Every stored project, or none if storage is empty or unreadable.
    pub fn load(&self) -> Vec<Project> {
        self.read(&self.config.projects_key)
    }

    /// Replaces the stored project collection.
    pub fn save(&self, projects: &[Project]) -> Result<(), PersistenceError> {
        self.write(&self.config.projects_key, projects)
    }

    /// The stored custom node registry, or an empty one.
    pub fn load_custom_node_types(&self) -> Vec<CustomNodeType> {
        self.read(&self.config.custom_nodes_key)
    }

    /// Replaces the stored custom node registry.
    pub fn save_custom_node_types(
        &self,
        types: &[CustomNodeType],
    ) -> Result<(), PersistenceError> {
        self.write(&self.config.custom_nodes_key, types)
    }

    /// Whether execution-flow edges were visible last session. Defaults to hidden.
    pub fn load_show_execution_flow(&self) -> bool {
        self.read(&self.config.execution_flow_key)
    }

    /// Stores whether execution-flow edges are visible.
    pub fn save_show_execution_flow(&self, show: bool) -> Result<(), PersistenceError> {
        self.write(&self.config.execution_flow_key, &show)
    }

    /// The stored project with `project_id`.
    pub fn find_project(&self, project_id: &str) -> Option<Project> {
        self.load().into_iter().find(|p| p.id == project_id)
    }

    /// Everything in storage, ready to be written to an export file.
    pub fn export_all(&self) -> ProjectExportData {
        self.export_data(self.load())
    }

    /// A single stored project, bundled with the custom node registry.
    pub fn export_project(&self, project_id: &str) -> Result<ProjectExportData, PersistenceError> {
        let project = self
            .find_project(project_id)
            .ok_or_else(|| PersistenceError::ProjectNotFound(project_id.to_string()))?;
        Ok(self.export_data(vec![project]))
    }

    fn export_data(&self, projects: Vec<Project>) -> ProjectExportData {
        ProjectExportData {
            projects,
            custom_node_types: self.load_custom_node_types(),
            exported_at: Utc::now(),
            version: self.config.export_version.clone(),
        }
    }

    /// Pretty-printed JSON of an export.
    pub fn export_to_json(data: &ProjectExportData) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Parses the text of an export file without validating its structure.
    pub fn read_export(json: &str) -> Result<Value, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Imports the text of an export file. Unparseable text is a failed import.
    pub fn import_json(&self, json: &str, options: ImportOptions) -> ImportResult {
        match Self::read_export(json) {
            Ok(data) => self.import_projects(&data, options),
            Err(e) => {
                warn!("Import failed: {e}");
                ImportResult::failed("Invalid JSON file")
            }
        }
    }

    /// Validates `data` and writes its projects and custom node types to storage.
    ///
    /// With `merge`, a project whose id is already stored is overwritten in
    /// place and the others are appended; only the appended ones count as
    /// imported. Custom node types are added when their name is new. Without
    /// `merge`, both collections are replaced by the imported ones.
    ///
    /// Nothing is written unless the whole document validates.
    pub fn import_projects(&self, data: &Value, options: ImportOptions) -> ImportResult {
        let Some(raw_projects) = data.get("projects").and_then(Value::as_array) else {
            return ImportResult::failed("Invalid import data: missing projects array");
        };
        let structurally_valid = raw_projects.iter().all(|project| {
            REQUIRED_PROJECT_FIELDS
                .iter()
                .all(|field| is_present(project.get(field)))
        });
        if !structurally_valid {
            return ImportResult::failed("Invalid project structure");
        }

        let imported: Vec<Project> =
            match serde_json::from_value(Value::Array(raw_projects.clone())) {
                Ok(projects) => projects,
                Err(e) => {
                    warn!("Import failed: {e}");
                    return ImportResult::failed(format!("Invalid project structure: {e}"));
                }
            };
        let custom_types: Option<Vec<CustomNodeType>> = match data.get("customNodeTypes") {
            Some(Value::Array(raw)) => match serde_json::from_value(Value::Array(raw.clone())) {
                Ok(types) => Some(types),
                Err(e) => {
                    warn!("Import failed: {e}");
                    return ImportResult::failed(format!("Invalid custom node types: {e}"));
                }
            },
            _ => None,
        };

        let (projects, count) = if options.merge {
            merge_projects(self.load(), imported)
        } else {
            let count = imported.len();
            (imported, count)
        };
        if let Err(e) = self.save(&projects) {
            warn!("Import failed: {e}");
            return ImportResult::failed(e.to_string());
        }

        if let Some(incoming) = custom_types {
            let types = if options.merge {
                merge_custom_types(self.load_custom_node_types(), incoming)
            } else {
                incoming
            };
            if let Err(e) = self.save_custom_node_types(&types) {
                warn!("Import failed: {e}");
                return ImportResult::failed(e.to_string());
            }
        }

        let message = if options.merge {
            format!("Successfully imported {count} new projects")
        } else {
            format!("Successfully replaced all projects with {count} imported projects")
        };
        info!("{message}");
        ImportResult {
            success: true,
            message,
            imported: count,
        }
    }

    /// Writes an export to `path` as pretty JSON.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(
        data: &ProjectExportData,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), PersistenceError> {
        std::fs::write(path.as_ref(), Self::export_to_json(data)?)?;
        info!("Exported {} projects to {}", data.projects.len(), path.as_ref().display());
        Ok(())
    }

    /// Reads an export file written by [`Self::save_to_path`] or a browser download.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(
        path: impl AsRef<std::path::Path>,
    ) -> Result<ProjectExportData, PersistenceError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Imports an export file from disk. Unreadable files are a failed import.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn import_from_path(
        &self,
        path: impl AsRef<std::path::Path>,
        options: ImportOptions,
    ) -> ImportResult {
        match std::fs::read_to_string(path) {
            Ok(content) => self.import_json(&content, options),
            Err(e) => {
                warn!("Import failed: {e}");
                ImportResult::failed("Failed to read file")
            }
        }
    }

    /// Fills a fresh store with everything saved by a previous session.
    pub fn hydrate(&self, store: &mut ProjectStore) -> Result<(), FlowError> {
        let projects = self.load();
        info!("Loaded {} projects from storage", projects.len());
        store.dispatch(Action::LoadProjects(projects))?;
        for custom_type in self.load_custom_node_types() {
            store.dispatch(Action::AddCustomNodeType(custom_type))?;
        }
        store.set_show_execution_flow(self.load_show_execution_flow());
        Ok(())
    }

    /// A store listener that writes every change back to storage.
    ///
    /// Failed writes are logged and otherwise ignored; the document in the
    /// store stays as it is.
    pub fn autosave(repository: Rc<Self>) -> impl FnMut(StoreEvent, &ProjectState) + 'static
    where
        S: 'static,
    {
        move |event, state| {
            let result = match event {
                StoreEvent::ProjectsChanged => repository.save(&state.projects),
                StoreEvent::CustomNodeTypesChanged => {
                    repository.save_custom_node_types(&state.custom_node_types)
                }
                StoreEvent::PreferencesChanged => {
                    repository.save_show_execution_flow(state.show_execution_flow)
                }
                StoreEvent::NavigationChanged => Ok(()),
            };
            if let Err(e) = result {
                warn!("Autosave after {event:?} failed: {e}");
            }
        }
    }
}

/// File name offered when downloading a single project.
pub fn project_file_name(project_name: &str) -> String {
    let stem: String = project_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}_project.json")
}

/// File name offered when downloading every project on `date`.
pub fn all_projects_file_name(date: NaiveDate) -> String {
    format!("react_flow_projects_{}.json", date.format("%Y-%m-%d"))
}

/// A JSON value that counts as "set": not missing, null, false or empty text.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

fn merge_projects(mut existing: Vec<Project>, imported: Vec<Project>) -> (Vec<Project>, usize) {
    let mut added = 0;
    for project in imported {
        match existing.iter_mut().find(|p| p.id == project.id) {
            Some(slot) => *slot = project,
            None => {
                existing.push(project);
                added += 1;
            }
        }
    }
    (existing, added)
}

fn merge_custom_types(
    mut existing: Vec<CustomNodeType>,
    incoming: Vec<CustomNodeType>,
) -> Vec<CustomNodeType> {
    for custom_type in incoming {
        if !existing.iter().any(|t| t.name == custom_type.name) {
            existing.push(custom_type);
        }
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::storage::MemoryStore;
    use crate::types::{Direction, Node, Position};
    use serde_json::json;
    use std::cell::RefCell;

    fn repository() -> ProjectRepository<MemoryStore> {
        ProjectRepository::new(MemoryStore::new(), EditorConfig::default())
    }

    fn sample_project(name: &str) -> Project {
        let mut project = Project::new(name, Some("demo"));
        project
            .flow
            .nodes
            .push(Node::standard("event", "Start", Position::new(10.0, 20.0)).with_id("start"));
        project
    }

    #[test]
    fn test_load_defaults_when_storage_is_empty() {
        let repo = repository();

        assert!(repo.load().is_empty());
        assert!(repo.load_custom_node_types().is_empty());
        assert!(!repo.load_show_execution_flow());
    }

    #[test]
    fn test_corrupt_entry_loads_as_default() {
        let repo = repository();
        repo.storage().set("react-flow-projects", "{not json").unwrap();

        assert!(repo.load().is_empty());
    }

    #[test]
    fn test_save_and_load_projects() {
        let repo = repository();
        let projects = vec![sample_project("One"), sample_project("Two")];

        repo.save(&projects).unwrap();

        assert_eq!(repo.load(), projects);
        assert_eq!(repo.find_project(&projects[1].id), Some(projects[1].clone()));
    }

    #[test]
    fn test_custom_types_and_preference_use_their_own_keys() {
        let repo = repository();
        repo.save_custom_node_types(&[CustomNodeType::new("Validator", Some(Direction::In))])
            .unwrap();
        repo.save_show_execution_flow(true).unwrap();

        let raw = repo.storage().get("react-flow-custom-nodes").unwrap().unwrap();
        assert_eq!(raw, r#"[{"name":"Validator","dir":"in"}]"#);
        assert_eq!(
            repo.storage().get("showExecutionFlow").unwrap().as_deref(),
            Some("true")
        );
        assert!(repo.load_show_execution_flow());
    }

    #[test]
    fn test_export_then_replace_import_round_trips() {
        let repo = repository();
        let projects = vec![sample_project("One"), sample_project("Two")];
        repo.save(&projects).unwrap();
        repo.save_custom_node_types(&[CustomNodeType::new("Validator", None)])
            .unwrap();
        let json = ProjectRepository::<MemoryStore>::export_to_json(&repo.export_all()).unwrap();

        let target = repository();
        target.save(&[sample_project("Old")]).unwrap();
        let result = target.import_json(&json, ImportOptions { merge: false });

        assert!(result.success);
        assert_eq!(result.imported, 2);
        assert_eq!(
            result.message,
            "Successfully replaced all projects with 2 imported projects"
        );
        assert_eq!(target.load(), projects);
        assert_eq!(target.load_custom_node_types(), repo.load_custom_node_types());
    }

    #[test]
    fn test_merge_import_overwrites_by_id_and_counts_new() {
        let repo = repository();
        let kept = sample_project("Kept");
        let mut changed = sample_project("Before");
        repo.save(&[kept.clone(), changed.clone()]).unwrap();
        repo.save_custom_node_types(&[CustomNodeType::new("Validator", Some(Direction::In))])
            .unwrap();

        changed.name = "After".to_string();
        let added = sample_project("Added");
        let data = ProjectExportData {
            projects: vec![changed.clone(), added.clone()],
            custom_node_types: vec![
                CustomNodeType::new("Validator", Some(Direction::Out)),
                CustomNodeType::new("Router", None),
            ],
            exported_at: Utc::now(),
            version: "1.0.0".to_string(),
        };
        let result = repo.import_projects(
            &serde_json::to_value(&data).unwrap(),
            ImportOptions::default(),
        );

        assert!(result.success);
        assert_eq!(result.imported, 1);
        assert_eq!(result.message, "Successfully imported 1 new projects");
        assert_eq!(repo.load(), vec![kept, changed, added]);
        assert_eq!(
            repo.load_custom_node_types(),
            vec![
                CustomNodeType::new("Validator", Some(Direction::In)),
                CustomNodeType::new("Router", None),
            ]
        );
    }

    #[test]
    fn test_import_rejects_missing_projects_array() {
        let repo = repository();

        let result = repo.import_projects(&json!({"projects": {}}), ImportOptions::default());

        assert_eq!(
            result,
            ImportResult::failed("Invalid import data: missing projects array")
        );
    }

    #[test]
    fn test_import_rejects_project_without_required_fields() {
        let repo = repository();
        repo.save(&[sample_project("Untouched")]).unwrap();
        let data = json!({
            "projects": [{
                "id": "p1",
                "name": "",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }]
        });

        let result = repo.import_projects(&data, ImportOptions { merge: false });

        assert_eq!(result, ImportResult::failed("Invalid project structure"));
        assert_eq!(repo.load().len(), 1);
    }

    #[test]
    fn test_import_of_unparseable_text_fails() {
        let repo = repository();

        let result = repo.import_json("not json at all", ImportOptions::default());

        assert!(!result.success);
        assert_eq!(result.message, "Invalid JSON file");
    }

    #[test]
    fn test_export_unknown_project() {
        let repo = repository();

        let err = repo.export_project("project_missing").unwrap_err();

        assert!(matches!(err, PersistenceError::ProjectNotFound(id) if id == "project_missing"));
    }

    #[test]
    fn test_download_file_names_are_sanitized() {
        assert_eq!(project_file_name("Checkout Flow!"), "checkout_flow__project.json");
        assert_eq!(project_file_name("v2 Ñandú"), "v2__and__project.json");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(all_projects_file_name(date), "react_flow_projects_2024-03-09.json");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_save_and_load_export_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let repo = repository();
        repo.save(&[sample_project("One")]).unwrap();
        let export = repo.export_all();

        ProjectRepository::<MemoryStore>::save_to_path(&export, &path).unwrap();

        assert_eq!(ProjectRepository::<MemoryStore>::load_from_path(&path).unwrap(), export);
        let target = repository();
        let result = target.import_from_path(&path, ImportOptions::default());
        assert!(result.success);
        assert_eq!(target.load(), export.projects);
    }

    #[test]
    fn test_hydrate_then_autosave() {
        let repo = Rc::new(repository());
        let project = sample_project("Stored");
        repo.save(&[project.clone()]).unwrap();
        repo.save_custom_node_types(&[CustomNodeType::new("Validator", None)])
            .unwrap();
        repo.save_show_execution_flow(true).unwrap();

        let mut store = ProjectStore::default();
        repo.hydrate(&mut store).unwrap();
        assert_eq!(store.projects(), &[project.clone()]);
        assert_eq!(store.custom_node_types().len(), 1);
        assert!(store.state().show_execution_flow);

        let events = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&events);
        store.subscribe(move |event, _| seen.borrow_mut().push(event));
        store.subscribe(ProjectRepository::autosave(Rc::clone(&repo)));

        store
            .dispatch(Action::SelectProject(project.id.clone()))
            .unwrap();
        store
            .dispatch(Action::UpdateNodes(Vec::new()))
            .unwrap();
        store
            .dispatch(Action::AddCustomNodeType(CustomNodeType::new("Router", None)))
            .unwrap();
        store.dispatch(Action::ToggleExecutionFlow).unwrap();

        assert!(repo.load()[0].flow.nodes.is_empty());
        assert_eq!(repo.load_custom_node_types().len(), 2);
        assert!(!repo.load_show_execution_flow());
        assert!(events.borrow().contains(&StoreEvent::ProjectsChanged));
    }
}
