//! Undo/redo history built from whole-project snapshots.
//!
//! Every recorded entry is a complete [`Project`] value. Because projects share
//! untouched subtrees through `Arc` and those subtrees are only ever replaced,
//! never written through, keeping a snapshot costs one shallow copy and later
//! edits can never reach it.

use crate::constants::MAX_UNDO_HISTORY;
use crate::types::Project;
use std::collections::VecDeque;

/// Manages the linear undo/redo history of the current project.
#[derive(Debug, Clone)]
pub struct History {
    /// Snapshots that can be restored by undo, oldest first
    past: Vec<Project>,
    /// Snapshots that can be restored by redo, next first
    future: VecDeque<Project>,
    /// Maximum length of `past`
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl History {
    /// Creates an empty history keeping at most `limit` undo entries.
    pub fn new(limit: usize) -> Self {
        Self {
            past: Vec::new(),
            future: VecDeque::new(),
            limit,
        }
    }

    /// Records the state a project had before a mutation.
    ///
    /// This clears the redo stack since a new edit invalidates any previously
    /// undone ones, and drops the oldest entry once `limit` is exceeded.
    ///
    /// # Arguments
    ///
    /// * `before` - The pre-mutation project
    pub fn record(&mut self, before: Project) {
        self.past.push(before);
        self.future.clear();

        if self.past.len() > self.limit {
            let excess = self.past.len() - self.limit;
            self.past.drain(..excess);
        }
    }

    /// Returns true if there are snapshots that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Returns true if there are snapshots that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Steps back one edit.
    ///
    /// # Returns
    ///
    /// The project to make current, or `None` if there is nothing to undo. On
    /// success `current` becomes the first redo entry.
    pub fn undo(&mut self, current: &Project) -> Option<Project> {
        let previous = self.past.pop()?;
        self.future.push_front(current.clone());
        Some(previous)
    }

    /// Steps forward one undone edit.
    ///
    /// # Returns
    ///
    /// The project to make current, or `None` if there is nothing to redo. On
    /// success `current` becomes the last undo entry.
    pub fn redo(&mut self, current: &Project) -> Option<Project> {
        let next = self.future.pop_front()?;
        self.past.push(current.clone());
        Some(next)
    }

    /// Number of undo entries.
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redo entries.
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Maximum number of undo entries kept.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Clears all undo and redo history.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Project {
        Project::new(name, None)
    }

    #[test]
    fn test_empty_history_is_noop() {
        let mut history = History::default();
        let current = named("current");

        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo(&current).is_none());
        assert!(history.redo(&current).is_none());
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn test_undo_then_redo_restores_states() {
        let mut history = History::default();
        let v0 = named("v0");
        let v1 = named("v1");

        history.record(v0.clone());
        let undone = history.undo(&v1).unwrap();
        assert_eq!(undone, v0);
        assert!(history.can_redo());

        let redone = history.redo(&undone).unwrap();
        assert_eq!(redone, v1);
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::default();
        history.record(named("v0"));
        history.undo(&named("v1"));
        assert!(history.can_redo());

        history.record(named("v0"));

        assert!(!history.can_redo());
    }

    #[test]
    fn test_past_is_capped_dropping_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.record(named(&format!("v{i}")));
        }

        assert_eq!(history.past_len(), 3);
        let current = named("v5");
        let restored = history.undo(&current).unwrap();
        assert_eq!(restored.name, "v4");
        history.undo(&restored);
        let oldest = history.undo(&named("ignored")).unwrap();
        assert_eq!(oldest.name, "v2");
        assert!(!history.can_undo());
    }

    #[test]
    fn test_future_is_not_capped() {
        let mut history = History::new(2);
        history.record(named("v0"));
        history.record(named("v1"));
        let mut current = named("v2");
        while let Some(previous) = history.undo(&current) {
            current = previous;
        }

        assert_eq!(history.future_len(), 2);
        assert_eq!(current.name, "v0");
    }

    #[test]
    fn test_default_limit() {
        assert_eq!(History::default().limit(), 50);
    }
}
