//! Copy-on-write mutation of the document tree.
//!
//! Every operation here takes the current project by reference and returns a
//! new one; the input is never modified. Copies are made along the ancestor
//! chain of the edited level only (`Arc::make_mut` on each step), so sibling
//! subtrees stay shared between the old and the new project. A shared subtree
//! is never written through, which keeps both values independent.

use super::path::resolve;
use crate::constants::DEFAULT_PROCESS_POSITION;
use crate::error::FlowError;
use crate::types::*;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A partial replacement of one level's node and edge lists.
///
/// Lists are replaced wholesale; a field left as `None` is untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowPatch {
    /// New node list of the level
    pub nodes: Option<Vec<Node>>,
    /// New edge list of the level
    pub edges: Option<Vec<Edge>>,
}

impl FlowPatch {
    /// A patch replacing only the nodes.
    pub fn nodes(nodes: Vec<Node>) -> Self {
        Self {
            nodes: Some(nodes),
            edges: None,
        }
    }

    /// A patch replacing only the edges.
    pub fn edges(edges: Vec<Edge>) -> Self {
        Self {
            nodes: None,
            edges: Some(edges),
        }
    }

    /// True if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_none() && self.edges.is_none()
    }

    fn apply(self, flow: &mut FlowData) {
        if let Some(nodes) = self.nodes {
            flow.nodes = nodes;
        }
        if let Some(edges) = self.edges {
            flow.edges = edges;
        }
    }
}

/// Walks `path` in a project being edited, unsharing each process on the way.
fn focus_mut<'a>(
    root: &'a mut FlowData,
    path: &[ProcessId],
) -> Result<&'a mut FlowData, FlowError> {
    let mut current = root;
    for pid in path {
        current = match current.processes.get_mut(pid) {
            Some(child) => &mut Arc::make_mut(child).flow,
            None => {
                return Err(FlowError::InvalidPath {
                    path: path.to_vec(),
                    missing: pid.clone(),
                })
            }
        };
    }
    Ok(current)
}

/// Returns true if `pred` holds for this level or any level below it.
fn subtree_any<P>(flow: &FlowData, pred: &P) -> bool
where
    P: Fn(&FlowData) -> bool,
{
    pred(flow) || flow.processes.values().any(|c| subtree_any(&c.flow, pred))
}

/// Applies `edit` to every level of the subtree for which `needs_edit` holds.
///
/// Only processes leading to an edited level are unshared; untouched
/// subtrees keep pointing at the original allocation.
fn edit_subtree<P, E>(flow: &mut FlowData, needs_edit: &P, edit: &mut E)
where
    P: Fn(&FlowData) -> bool,
    E: FnMut(&mut FlowData),
{
    if needs_edit(flow) {
        edit(flow);
    }
    for child in flow.processes.values_mut() {
        if subtree_any(&child.flow, needs_edit) {
            edit_subtree(&mut Arc::make_mut(child).flow, needs_edit, edit);
        }
    }
}

/// Removes every node matching `pred` from one level, together with every
/// edge of that level touching a removed node.
///
/// # Returns
///
/// The ids of the removed nodes, in their former order.
pub fn remove_nodes_where<P>(flow: &mut FlowData, pred: P) -> Vec<NodeId>
where
    P: Fn(&Node) -> bool,
{
    let mut removed = Vec::new();
    flow.nodes.retain(|n| {
        let hit = pred(n);
        if hit {
            removed.push(n.id.clone());
        }
        !hit
    });
    if !removed.is_empty() {
        let gone: HashSet<&str> = removed.iter().map(String::as_str).collect();
        flow.edges
            .retain(|e| !gone.contains(e.source.as_str()) && !gone.contains(e.target.as_str()));
    }
    removed
}

/// Replaces the node and/or edge list of the level at `path`.
///
/// # Arguments
///
/// * `root` - The current project; left untouched
/// * `path` - Process path of the level to edit; empty for the root
/// * `patch` - Lists to replace
///
/// # Returns
///
/// A new project with only the addressed level changed and `updated_at`
/// refreshed, or [`FlowError::InvalidPath`] if `path` does not resolve.
pub fn update_flow(
    root: &Project,
    path: &[ProcessId],
    patch: FlowPatch,
) -> Result<Project, FlowError> {
    let mut next = root.clone();
    patch.apply(focus_mut(&mut next.flow, path)?);
    next.touch();
    Ok(next)
}

/// Like [`update_flow`], but edits the addressed level through a closure.
pub fn update_flow_with<F>(
    root: &Project,
    path: &[ProcessId],
    edit: F,
) -> Result<Project, FlowError>
where
    F: FnOnce(&mut FlowData),
{
    let mut next = root.clone();
    edit(focus_mut(&mut next.flow, path)?);
    next.touch();
    Ok(next)
}

/// Creates an empty process inside the level at `path`, plus the process node
/// that links to it.
///
/// # Returns
///
/// The new project and the id of the created process.
pub fn create_process(
    root: &Project,
    path: &[ProcessId],
    name: &str,
    description: Option<&str>,
    position: Option<Position>,
) -> Result<(Project, ProcessId), FlowError> {
    let process = ProcessFlow::new(name, description);
    let process_id = process.id.clone();
    let node = Node::process(
        &process_id,
        &process.name,
        position.unwrap_or_else(|| DEFAULT_PROCESS_POSITION.into()),
    );

    let next = update_flow_with(root, path, |flow| {
        flow.nodes.push(node);
        flow.processes.insert(process_id.clone(), Arc::new(process));
    })?;
    Ok((next, process_id))
}

/// Renames a process and relabels the process nodes that point at it.
///
/// The search starts at the level addressed by `path` and covers its
/// descendants only. A process living outside that subtree is left alone, so
/// the call is then a no-op apart from the `updated_at` refresh.
pub fn rename_process(
    root: &Project,
    path: &[ProcessId],
    process_id: &str,
    new_name: &str,
) -> Result<Project, FlowError> {
    let stamp = Utc::now().timestamp_millis();
    let mentions = |flow: &FlowData| {
        flow.processes.contains_key(process_id)
            || flow.nodes.iter().any(|n| n.is_process_for(process_id))
    };

    update_flow_with(root, path, |focus| {
        edit_subtree(focus, &mentions, &mut |flow: &mut FlowData| {
            if let Some(process) = flow.processes.get_mut(process_id) {
                Arc::make_mut(process).name = new_name.to_string();
            }
            for node in flow.nodes.iter_mut().filter(|n| n.is_process_for(process_id)) {
                node.set_label(new_name, stamp);
            }
        });
    })
}

/// Deletes the process `process_id` from the level at `path`, along with every
/// process node of that level linking to it and those nodes' edges.
pub fn delete_process(
    root: &Project,
    path: &[ProcessId],
    process_id: &str,
) -> Result<Project, FlowError> {
    let focus = resolve(&root.flow, path)?;
    if !focus.processes.contains_key(process_id) {
        let mut full = path.to_vec();
        full.push(process_id.to_string());
        return Err(FlowError::InvalidPath {
            path: full,
            missing: process_id.to_string(),
        });
    }

    update_flow_with(root, path, |flow| {
        flow.processes.shift_remove(process_id);
        remove_nodes_where(flow, |n| n.is_process_for(process_id));
    })
}

/// Removes every node of the custom type `name` from the whole tree, and every
/// edge touching a removed node in the same level.
///
/// The walk runs over a private copy and the result is returned only once the
/// whole tree is clean.
pub fn remove_custom_node_type(root: &Project, name: &str) -> Project {
    let mut next = root.clone();
    edit_subtree(
        &mut next.flow,
        &|flow: &FlowData| flow.nodes.iter().any(|n| n.is_custom_of(name)),
        &mut |flow: &mut FlowData| {
            remove_nodes_where(flow, |n| n.is_custom_of(name));
        },
    );
    next.touch();
    next
}

/// Where a custom node type is used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomNodeUsage {
    /// Path of the level holding the node
    pub path: ProcessPath,
    /// The custom node
    pub node_id: NodeId,
    /// Its current label
    pub label: String,
}

/// Lists every node of the custom type `name` anywhere in the tree.
pub fn find_custom_node_usages(root: &Project, name: &str) -> Vec<CustomNodeUsage> {
    let mut usages = Vec::new();
    root.flow.visit(&mut |path, flow| {
        for node in flow.nodes.iter().filter(|n| n.is_custom_of(name)) {
            usages.push(CustomNodeUsage {
                path: path.to_vec(),
                node_id: node.id.clone(),
                label: node.label().to_string(),
            });
        }
    });
    usages
}
