//! The project store: the single mutation surface of the editor.
//!
//! [`ProjectStore::dispatch`] is a synchronous reducer. Content actions resolve
//! the focused level, run the copy-on-write mutator and record the previous
//! project in the [`History`]; navigation actions only move
//! `current_process_path`. Listeners registered with
//! [`ProjectStore::subscribe`] are told what changed after each transition,
//! which is how persistence keeps storage in step with the store.

use crate::config::EditorConfig;
use crate::error::FlowError;
use crate::flow::canvas::{self, Connection, PaletteItem};
use crate::flow::{self, Breadcrumb, CustomNodeUsage, FlowPatch};
use crate::history::History;
use crate::types::*;
use log::{debug, info, warn};


/// Description given to processes created from the palette.
const PALETTE_PROCESS_DESCRIPTION: &str = "New process description";

/// Every state transition the store understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replaces the project collection
    LoadProjects(Vec<Project>),
    /// Appends a project and focuses its root
    CreateProject(Project),
    /// Focuses the root of an existing project
    SelectProject(String),
    /// Removes a project from the collection
    DeleteProject(String),
    /// Renames or redescribes a project
    UpdateProjectMeta {
        /// Project to update
        project_id: String,
        /// New name, if changing
        name: Option<String>,
        /// New description, if changing
        description: Option<String>,
    },
    /// Replaces the node list of the focused level
    UpdateNodes(Vec<Node>),
    /// Replaces the edge list of the focused level
    UpdateEdges(Vec<Edge>),
    /// Descends into a process of the focused level
    EnterProcess(ProcessId),
    /// Goes up one level
    ExitProcess,
    /// Goes back to the project root
    NavigateRoot,
    /// Jumps to any resolvable path
    NavigateTo(ProcessPath),
    /// Creates a process (and its process node) in the focused level
    CreateProcess {
        /// Name of the process and label of its node
        name: String,
        /// Optional description
        description: Option<String>,
        /// Where the process node goes; a default spot when absent
        position: Option<Position>,
    },
    /// Renames a process found from the focused level downward
    RenameProcess {
        /// Process to rename
        process_id: ProcessId,
        /// Its new name
        new_name: String,
    },
    /// Deletes a process of the focused level with its process nodes
    DeleteProcess(ProcessId),
    /// Restores the previous snapshot of the current project
    Undo,
    /// Reapplies the last undone snapshot
    Redo,
    /// Registers a custom node type; duplicates by name are ignored
    AddCustomNodeType(CustomNodeType),
    /// Unregisters a custom node type and strips its nodes from the current project
    RemoveCustomNodeType(String),
    /// Shows or hides execution-flow edges
    ToggleExecutionFlow,
}

/// What changed in a transition, reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The project collection or the current project changed
    ProjectsChanged,
    /// The custom node registry changed
    CustomNodeTypesChanged,
    /// The focused project or process path changed
    NavigationChanged,
    /// A display preference changed
    PreferencesChanged,
}

/// Callback invoked after each transition.
pub type Listener = Box<dyn FnMut(StoreEvent, &ProjectState)>;

/// The complete state held by the store.
#[derive(Debug, Clone, Default)]
pub struct ProjectState {
    /// All known projects
    pub projects: Vec<Project>,
    /// The project being edited, if any
    pub current_project: Option<Project>,
    /// Path of the focused level inside the current project
    pub current_process_path: ProcessPath,
    /// Undo/redo snapshots of the current project
    pub history: History,
    /// Registered custom node types
    pub custom_node_types: Vec<CustomNodeType>,
    /// Whether execution-flow edges are shown
    pub show_execution_flow: bool,
    /// Set by every content change, cleared by a successful sync
    pub has_unsaved_changes: bool,
}

/// Owns the editor state and applies actions to it.
pub struct ProjectStore {
    state: ProjectState,
    config: EditorConfig,
    listeners: Vec<Listener>,
    pending: Vec<StoreEvent>,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ProjectStore {
    /// Creates an empty store.
    pub fn new(config: EditorConfig) -> Self {
        let state = ProjectState {
            history: History::new(config.history_limit),
            ..Default::default()
        };
        Self {
            state,
            config,
            listeners: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Registers a listener called after every transition that changes something.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(StoreEvent, &ProjectState) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Applies one action.
    ///
    /// # Returns
    ///
    /// `Ok(())` when the action was applied or was a documented no-op (undo
    /// with empty history, duplicate custom type, exit at root). Errors leave
    /// the state exactly as it was.
    pub fn dispatch(&mut self, action: Action) -> Result<(), FlowError> {
        debug!("dispatch {}", action_name(&action));
        let result = self.reduce(action);
        self.flush();
        result
    }

    fn reduce(&mut self, action: Action) -> Result<(), FlowError> {
        match action {
            Action::LoadProjects(projects) => {
                self.load_projects(projects);
                Ok(())
            }
            Action::CreateProject(project) => {
                info!("Created project '{}' ({})", project.name, project.id);
                self.state.projects.push(project.clone());
                self.focus_project(Some(project));
                self.emit(StoreEvent::ProjectsChanged);
                Ok(())
            }
            Action::SelectProject(project_id) => {
                let project = self
                    .state
                    .projects
                    .iter()
                    .find(|p| p.id == project_id)
                    .cloned();
                if project.is_none() {
                    warn!("Selected unknown project {project_id}");
                }
                self.focus_project(project);
                Ok(())
            }
            Action::DeleteProject(project_id) => {
                let before = self.state.projects.len();
                self.state.projects.retain(|p| p.id != project_id);
                if self.state.projects.len() == before {
                    return Err(FlowError::ProjectNotFound(project_id));
                }
                if self.current_project_id() == Some(project_id.as_str()) {
                    self.focus_project(None);
                }
                self.emit(StoreEvent::ProjectsChanged);
                Ok(())
            }
            Action::UpdateProjectMeta {
                project_id,
                name,
                description,
            } => self.update_project_meta(&project_id, name, description),
            Action::UpdateNodes(nodes) => self.apply_patch(FlowPatch::nodes(nodes)),
            Action::UpdateEdges(edges) => self.apply_patch(FlowPatch::edges(edges)),
            Action::EnterProcess(process_id) => {
                let mut path = self.focus_path()?;
                path.push(process_id);
                // A failed lookup leaves even a stale path where it was.
                self.navigate(path)
            }
            Action::ExitProcess => {
                if self.state.current_process_path.pop().is_some() {
                    self.emit(StoreEvent::NavigationChanged);
                }
                Ok(())
            }
            Action::NavigateRoot => {
                if !self.state.current_process_path.is_empty() {
                    self.state.current_process_path.clear();
                    self.emit(StoreEvent::NavigationChanged);
                }
                Ok(())
            }
            Action::NavigateTo(path) => {
                self.require_project()?;
                self.navigate(path)
            }
            Action::CreateProcess {
                name,
                description,
                position,
            } => self
                .create_process(&name, description.as_deref(), position)
                .map(|_| ()),
            Action::RenameProcess {
                process_id,
                new_name,
            } => {
                let path = self.focus_path()?;
                let next =
                    flow::rename_process(self.require_project()?, &path, &process_id, &new_name)?;
                self.commit(next);
                self.settle_focus(path);
                Ok(())
            }
            Action::DeleteProcess(process_id) => {
                let path = self.focus_path()?;
                let next = flow::delete_process(self.require_project()?, &path, &process_id)?;
                self.commit(next);
                self.settle_focus(path);
                Ok(())
            }
            Action::Undo => {
                self.step_history(History::undo);
                Ok(())
            }
            Action::Redo => {
                self.step_history(History::redo);
                Ok(())
            }
            Action::AddCustomNodeType(node_type) => {
                if self
                    .state
                    .custom_node_types
                    .iter()
                    .any(|t| t.name == node_type.name)
                {
                    debug!("Custom node type '{}' already registered", node_type.name);
                } else {
                    self.state.custom_node_types.push(node_type);
                    self.emit(StoreEvent::CustomNodeTypesChanged);
                }
                Ok(())
            }
            Action::RemoveCustomNodeType(name) => {
                let Some(project) = &self.state.current_project else {
                    debug!("No project selected; custom node type '{name}' kept");
                    return Ok(());
                };
                let next = flow::remove_custom_node_type(project, &name);
                self.commit(next);
                let before = self.state.custom_node_types.len();
                self.state.custom_node_types.retain(|t| t.name != name);
                if self.state.custom_node_types.len() != before {
                    self.emit(StoreEvent::CustomNodeTypesChanged);
                }
                Ok(())
            }
            Action::ToggleExecutionFlow => {
                self.state.show_execution_flow = !self.state.show_execution_flow;
                self.emit(StoreEvent::PreferencesChanged);
                Ok(())
            }
        }
    }

    // --- Convenience operations built on the reducer ---

    /// Creates a process in the focused level and returns its id.
    pub fn create_process(
        &mut self,
        name: &str,
        description: Option<&str>,
        position: Option<Position>,
    ) -> Result<ProcessId, FlowError> {
        let path = self.focus_path()?;
        let position = position.unwrap_or(self.config.default_process_position);
        let (next, process_id) = flow::create_process(
            self.require_project()?,
            &path,
            name,
            description,
            Some(position),
        )?;
        self.commit(next);
        self.settle_focus(path);
        self.flush();
        Ok(process_id)
    }

    /// Drops a palette item on the focused level.
    ///
    /// # Returns
    ///
    /// The id of the created node (the process node for `process` items).
    pub fn add_palette_node(
        &mut self,
        item: &str,
        position: Position,
    ) -> Result<NodeId, FlowError> {
        let item = PaletteItem::parse(item);
        match canvas::new_palette_node(&item, position) {
            Some(node) => {
                let node_id = node.id.clone();
                let mut nodes = self.current_nodes().to_vec();
                nodes.push(node);
                self.dispatch(Action::UpdateNodes(nodes))?;
                Ok(node_id)
            }
            None => {
                let name = canvas::next_process_name(self.require_current_flow()?);
                let process_id =
                    self.create_process(&name, Some(PALETTE_PROCESS_DESCRIPTION), Some(position))?;
                Ok(Node::process(&process_id, &name, position).id)
            }
        }
    }

    /// Deletes a node of the focused level with its edges, as one undoable edit.
    ///
    /// Deleting a process node deletes the linked process as well.
    pub fn delete_node(&mut self, node_id: &str) -> Result<(), FlowError> {
        let flow = self.require_current_flow()?;
        if let Some(process_id) = flow.node(node_id).and_then(Node::process_id) {
            if flow.processes.contains_key(process_id) {
                let process_id = process_id.to_string();
                return self.dispatch(Action::DeleteProcess(process_id));
            }
        }
        let (nodes, edges) = canvas::delete_node(flow, node_id);
        let result = self.apply_patch(FlowPatch {
            nodes: Some(nodes),
            edges: Some(edges),
        });
        self.flush();
        result
    }

    /// Connects two handles in the focused level.
    pub fn connect(&mut self, connection: Connection) -> Result<(), FlowError> {
        let edges = canvas::connect(self.current_edges(), connection);
        self.dispatch(Action::UpdateEdges(edges))
    }

    pub fn delete_edge(&mut self, edge_id: &str) -> Result<(), FlowError> {
        let edges = canvas::delete_edge(self.current_edges(), edge_id);
        self.dispatch(Action::UpdateEdges(edges))
    }

    /// Relabels a node; relabelling a process node renames its process.
    pub fn relabel_node(&mut self, node_id: &str, label: &str) -> Result<(), FlowError> {
        let process_id = self
            .require_current_flow()?
            .node(node_id)
            .and_then(Node::process_id)
            .map(str::to_string);
        match process_id {
            Some(process_id) => self.dispatch(Action::RenameProcess {
                process_id,
                new_name: label.to_string(),
            }),
            None => {
                let nodes = canvas::relabel_node(self.current_nodes(), node_id, label);
                self.dispatch(Action::UpdateNodes(nodes))
            }
        }
    }

    pub fn relabel_edge(&mut self, edge_id: &str, label: &str) -> Result<(), FlowError> {
        let edges = canvas::relabel_edge(self.current_edges(), edge_id, label);
        self.dispatch(Action::UpdateEdges(edges))
    }

    /// Restores the execution-flow preference without notifying listeners.
    pub fn set_show_execution_flow(&mut self, show: bool) {
        self.state.show_execution_flow = show;
    }

    /// Clears the unsaved flag if `synced` is still the current project.
    ///
    /// A sync that finishes after further edits leaves the flag set.
    pub fn mark_saved(&mut self, synced: &Project) {
        if self.state.current_project.as_ref() == Some(synced) {
            self.state.has_unsaved_changes = false;
        }
    }

    // --- Read access ---

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn projects(&self) -> &[Project] {
        &self.state.projects
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.state.current_project.as_ref()
    }

    pub fn current_process_path(&self) -> &[ProcessId] {
        &self.state.current_process_path
    }

    pub fn custom_node_types(&self) -> &[CustomNodeType] {
        &self.state.custom_node_types
    }

    /// The focused level, or the root if the focus path has gone stale.
    pub fn current_flow(&self) -> Option<&FlowData> {
        let project = self.state.current_project.as_ref()?;
        Some(
            flow::resolve(&project.flow, &self.state.current_process_path)
                .unwrap_or(&project.flow),
        )
    }

    pub fn current_nodes(&self) -> &[Node] {
        self.current_flow().map(|f| f.nodes.as_slice()).unwrap_or_default()
    }

    pub fn current_edges(&self) -> &[Edge] {
        self.current_flow().map(|f| f.edges.as_slice()).unwrap_or_default()
    }

    /// Edges of the focused level, without execution edges when those are hidden.
    pub fn visible_edges(&self) -> Vec<Edge> {
        canvas::visible_edges(self.current_edges(), self.state.show_execution_flow)
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.state
            .current_project
            .as_ref()
            .map(|p| flow::breadcrumbs(p, &self.state.current_process_path))
            .unwrap_or_default()
    }

    /// Every node of the custom type `name` in the current project.
    pub fn custom_node_usages(&self, name: &str) -> Vec<CustomNodeUsage> {
        self.state
            .current_project
            .as_ref()
            .map(|p| flow::find_custom_node_usages(p, name))
            .unwrap_or_default()
    }

    pub fn can_undo(&self) -> bool {
        self.state.current_project.is_some() && self.state.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state.current_project.is_some() && self.state.history.can_redo()
    }

    // --- Internals ---

    fn current_project_id(&self) -> Option<&str> {
        self.state.current_project.as_ref().map(|p| p.id.as_str())
    }

    fn require_project(&self) -> Result<&Project, FlowError> {
        self.state
            .current_project
            .as_ref()
            .ok_or(FlowError::NoProjectSelected)
    }

    fn require_current_flow(&self) -> Result<&FlowData, FlowError> {
        self.current_flow().ok_or(FlowError::NoProjectSelected)
    }

    /// The path content actions should work on: the focus path, or the root
    /// if it went stale. Nothing is changed until [`Self::settle_focus`].
    fn focus_path(&self) -> Result<ProcessPath, FlowError> {
        let project = self.require_project()?;
        if flow::is_valid_path(&project.flow, &self.state.current_process_path) {
            Ok(self.state.current_process_path.clone())
        } else {
            warn!(
                "Process path {:?} no longer resolves; falling back to root",
                self.state.current_process_path
            );
            Ok(ProcessPath::new())
        }
    }

    /// Moves the focus to the path a successful content action ran on.
    fn settle_focus(&mut self, path: ProcessPath) {
        if path != self.state.current_process_path {
            self.state.current_process_path = path;
            self.emit(StoreEvent::NavigationChanged);
        }
    }

    fn navigate(&mut self, path: ProcessPath) -> Result<(), FlowError> {
        let project = self.require_project()?;
        flow::resolve(&project.flow, &path)?;
        self.settle_focus(path);
        Ok(())
    }

    /// Makes `project` current at its root; history never spans projects.
    fn focus_project(&mut self, project: Option<Project>) {
        self.state.current_project = project;
        self.state.current_process_path.clear();
        self.state.history.clear();
        self.emit(StoreEvent::NavigationChanged);
    }

    fn load_projects(&mut self, projects: Vec<Project>) {
        info!("Loaded {} projects", projects.len());
        self.state.projects = projects;
        if let Some(current_id) = self.current_project_id().map(str::to_string) {
            let loaded = self
                .state
                .projects
                .iter()
                .find(|p| p.id == current_id)
                .cloned();
            // An unchanged current project keeps its history and focus.
            if loaded.as_ref() != self.state.current_project.as_ref() {
                self.focus_project(loaded);
            }
        }
        self.emit(StoreEvent::ProjectsChanged);
    }

    fn update_project_meta(
        &mut self,
        project_id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<(), FlowError> {
        let project = self
            .state
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| FlowError::ProjectNotFound(project_id.to_string()))?;
        if let Some(name) = name {
            project.name = name;
        }
        if description.is_some() {
            project.description = description;
        }
        project.touch();
        let updated = project.clone();

        if let Some(current) = self.state.current_project.as_mut() {
            if current.id == project_id {
                current.name = updated.name;
                current.description = updated.description;
                current.updated_at = updated.updated_at;
            }
        }
        self.emit(StoreEvent::ProjectsChanged);
        Ok(())
    }

    fn apply_patch(&mut self, patch: FlowPatch) -> Result<(), FlowError> {
        let path = self.focus_path()?;
        let next = flow::update_flow(self.require_project()?, &path, patch)?;
        self.commit(next);
        self.settle_focus(path);
        Ok(())
    }

    /// Installs a mutated project, recording the previous one for undo.
    fn commit(&mut self, next: Project) {
        if let Some(previous) = self.state.current_project.replace(next.clone()) {
            self.state.history.record(previous);
        }
        self.replace_in_collection(next);
        self.state.has_unsaved_changes = true;
        self.emit(StoreEvent::ProjectsChanged);
    }

    fn step_history(&mut self, step: fn(&mut History, &Project) -> Option<Project>) {
        let Some(current) = &self.state.current_project else {
            return;
        };
        let Some(mut restored) = step(&mut self.state.history, current) else {
            return;
        };
        // Name and description are not part of the undoable content.
        restored.name = current.name.clone();
        restored.description = current.description.clone();
        self.state.current_project = Some(restored.clone());
        self.replace_in_collection(restored);
        self.state.has_unsaved_changes = true;
        self.emit(StoreEvent::ProjectsChanged);

        // Undoing a process creation can strand the focus inside it.
        if let Some(project) = &self.state.current_project {
            let valid = flow::valid_prefix(&project.flow, &self.state.current_process_path);
            if valid.len() != self.state.current_process_path.len() {
                self.state.current_process_path = valid;
                self.emit(StoreEvent::NavigationChanged);
            }
        }
    }

    fn replace_in_collection(&mut self, project: Project) {
        if let Some(slot) = self.state.projects.iter_mut().find(|p| p.id == project.id) {
            *slot = project;
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        if !self.pending.contains(&event) {
            self.pending.push(event);
        }
    }

    fn flush(&mut self) {
        for event in std::mem::take(&mut self.pending) {
            for listener in self.listeners.iter_mut() {
                listener(event, &self.state);
            }
        }
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::LoadProjects(_) => "LOAD_PROJECTS",
        Action::CreateProject(_) => "CREATE_PROJECT",
        Action::SelectProject(_) => "SELECT_PROJECT",
        Action::DeleteProject(_) => "DELETE_PROJECT",
        Action::UpdateProjectMeta { .. } => "UPDATE_PROJECT_META",
        Action::UpdateNodes(_) => "UPDATE_NODES",
        Action::UpdateEdges(_) => "UPDATE_EDGES",
        Action::EnterProcess(_) => "ENTER_PROCESS",
        Action::ExitProcess => "EXIT_PROCESS",
        Action::NavigateRoot => "NAVIGATE_ROOT",
        Action::NavigateTo(_) => "NAVIGATE_TO",
        Action::CreateProcess { .. } => "CREATE_PROCESS",
        Action::RenameProcess { .. } => "UPDATE_PROCESS_NAME",
        Action::DeleteProcess(_) => "DELETE_PROCESS",
        Action::Undo => "UNDO",
        Action::Redo => "REDO",
        Action::AddCustomNodeType(_) => "ADD_CUSTOM_NODE_TYPE",
        Action::RemoveCustomNodeType(_) => "REMOVE_CUSTOM_NODE_TYPE",
        Action::ToggleExecutionFlow => "TOGGLE_EXECUTION_FLOW",
    }
}
