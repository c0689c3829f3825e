//! Path resolution: finding the level of the tree a process path addresses.

use crate::error::FlowError;
use crate::types::{FlowData, ProcessId, ProcessPath, Project};
use serde::{Deserialize, Serialize};

/// Resolves `path` against `root` and returns the addressed level.
///
/// An empty path addresses the root itself. Each segment must name a process
/// in the level reached so far; the first missing one yields
/// [`FlowError::InvalidPath`].
pub fn resolve<'a>(root: &'a FlowData, path: &[ProcessId]) -> Result<&'a FlowData, FlowError> {
    let mut current = root;
    for pid in path {
        current = &current
            .processes
            .get(pid)
            .ok_or_else(|| FlowError::InvalidPath {
                path: path.to_vec(),
                missing: pid.clone(),
            })?
            .flow;
    }
    Ok(current)
}

/// Returns true if every segment of `path` resolves.
pub fn is_valid_path(root: &FlowData, path: &[ProcessId]) -> bool {
    resolve(root, path).is_ok()
}

/// Returns the longest prefix of `path` that resolves against `root`.
pub fn valid_prefix(root: &FlowData, path: &[ProcessId]) -> ProcessPath {
    let mut current = root;
    let mut prefix = Vec::with_capacity(path.len());
    for pid in path {
        match current.processes.get(pid) {
            Some(child) => {
                prefix.push(pid.clone());
                current = &child.flow;
            }
            None => break,
        }
    }
    prefix
}

/// One entry of the navigation trail from the project root to the focused level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Process id, or `"root"` for the project itself
    pub id: String,
    /// Project or process name
    pub name: String,
    /// Depth, 0 for the root
    pub level: usize,
    /// Path that navigates to this entry
    pub path: ProcessPath,
}

/// Builds the breadcrumb trail for `path`.
///
/// Segments that do not resolve are skipped rather than reported, so a stale
/// path still yields a usable trail.
pub fn breadcrumbs(project: &Project, path: &[ProcessId]) -> Vec<Breadcrumb> {
    let mut trail = vec![Breadcrumb {
        id: "root".to_string(),
        name: project.name.clone(),
        level: 0,
        path: Vec::new(),
    }];

    let mut current = &project.flow;
    for (i, pid) in path.iter().enumerate() {
        if let Some(process) = current.processes.get(pid) {
            trail.push(Breadcrumb {
                id: pid.clone(),
                name: process.name.clone(),
                level: i + 1,
                path: path[..=i].to_vec(),
            });
            current = &process.flow;
        }
    }
    trail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcessFlow;
    use std::sync::Arc;

    fn nested_project() -> (Project, String, String) {
        let mut project = Project::new("Root", None);
        let mut outer = ProcessFlow::new("Outer", None);
        let inner = ProcessFlow::new("Inner", None);
        let inner_id = inner.id.clone();
        outer.flow.processes.insert(inner_id.clone(), Arc::new(inner));
        let outer_id = outer.id.clone();
        project.flow.processes.insert(outer_id.clone(), Arc::new(outer));
        (project, outer_id, inner_id)
    }

    #[test]
    fn test_empty_path_resolves_to_root() {
        let (project, _, _) = nested_project();
        let flow = resolve(&project.flow, &[]).unwrap();
        assert!(std::ptr::eq(flow, &project.flow));
    }

    #[test]
    fn test_resolve_nested_path() {
        let (project, outer, inner) = nested_project();

        let outer_flow = resolve(&project.flow, &[outer.clone()]).unwrap();
        let inner_flow = resolve(&project.flow, &[outer.clone(), inner.clone()]).unwrap();

        assert!(outer_flow.processes.contains_key(&inner));
        assert!(inner_flow.processes.is_empty());
    }

    #[test]
    fn test_resolve_missing_segment_is_error() {
        let (project, outer, inner) = nested_project();

        // The inner process does not live at the root level.
        let err = resolve(&project.flow, &[inner.clone()]).unwrap_err();
        assert_eq!(
            err,
            FlowError::InvalidPath {
                path: vec![inner.clone()],
                missing: inner.clone(),
            }
        );
        assert!(!is_valid_path(&project.flow, &[outer, "nope".to_string()]));
    }

    #[test]
    fn test_valid_prefix_stops_at_first_missing_segment() {
        let (project, outer, inner) = nested_project();
        let path = vec![outer.clone(), "gone".to_string(), inner];

        assert_eq!(valid_prefix(&project.flow, &path), vec![outer]);
    }

    #[test]
    fn test_breadcrumbs_follow_path() {
        let (project, outer, inner) = nested_project();

        let trail = breadcrumbs(&project, &[outer.clone(), inner.clone()]);

        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0].id, "root");
        assert_eq!(trail[0].name, "Root");
        assert_eq!(trail[1].name, "Outer");
        assert_eq!(trail[1].path, vec![outer.clone()]);
        assert_eq!(trail[2].level, 2);
        assert_eq!(trail[2].path, vec![outer, inner]);
    }

    #[test]
    fn test_breadcrumbs_skip_stale_segments() {
        let (project, outer, _) = nested_project();

        let trail = breadcrumbs(&project, &[outer, "deleted".to_string()]);

        assert_eq!(trail.len(), 2);
    }
}
