//! Core models for the todotree library
//!
//! This module contains the task tree node, its identifier, the on-disk snapshot
//! record and the tree walks shared by the store and the manager.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a task, unique across the whole forest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an existing identifier, e.g. one typed by the user
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Represents a task in the to-do tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    name: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    subtasks: Vec<Task>,
}

impl Task {
    /// Creates a new, uncompleted leaf task with a freshly generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(TaskId::generate(), name)
    }

    /// Creates a new, uncompleted leaf task with the given id
    pub fn with_id(id: TaskId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completed: false,
            subtasks: Vec::new(),
        }
    }

    /// Adds a subtask to this task
    pub(crate) fn add_subtask(&mut self, subtask: Task) {
        self.subtasks.push(subtask);
    }

    /// Flips the completion flag. Descendants and ancestors are untouched.
    pub(crate) fn toggle(&mut self) {
        self.completed = !self.completed;
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn subtasks(&self) -> &[Task] {
        &self.subtasks
    }

    /// Number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        1 + count(&self.subtasks)
    }
}

/// The persisted record: `{ "tasks": [Task, ...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Depth-first pre-order search for the first node with the given id
pub fn find<'a>(tasks: &'a [Task], id: &TaskId) -> Option<&'a Task> {
    for task in tasks {
        if task.id == *id {
            return Some(task);
        }
        if let Some(found) = find(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Mutable counterpart of [`find`], same visiting order
pub fn find_mut<'a>(tasks: &'a mut [Task], id: &TaskId) -> Option<&'a mut Task> {
    for task in tasks.iter_mut() {
        if task.id == *id {
            return Some(task);
        }
        if let Some(found) = find_mut(&mut task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Detaches the node with the given id, wherever it sits, and returns it with its subtree
pub fn remove(tasks: &mut Vec<Task>, id: &TaskId) -> Option<Task> {
    if let Some(pos) = tasks.iter().position(|t| t.id == *id) {
        return Some(tasks.remove(pos));
    }
    tasks
        .iter_mut()
        .find_map(|task| remove(&mut task.subtasks, id))
}

/// Total number of nodes in a forest
pub fn count(tasks: &[Task]) -> usize {
    tasks.iter().map(Task::count).sum()
}

/// Checks that every name is non-blank and every id is unique across the forest.
/// Returns a description of the first violation found.
pub fn validate(tasks: &[Task]) -> Result<(), String> {
    let mut seen = HashSet::new();
    let mut pending: Vec<&Task> = tasks.iter().collect();
    while let Some(task) = pending.pop() {
        if task.name.trim().is_empty() {
            return Err(format!("task {} has an empty name", task.id));
        }
        if !seen.insert(&task.id) {
            return Err(format!("task id {} appears more than once", task.id));
        }
        pending.extend(&task.subtasks);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_forest() -> Vec<Task> {
        let mut groceries = Task::with_id("a".into(), "Groceries");
        let mut milk = Task::with_id("a1".into(), "Milk");
        milk.add_subtask(Task::with_id("a1x".into(), "Check fridge"));
        groceries.add_subtask(milk);
        groceries.add_subtask(Task::with_id("a2".into(), "Bread"));
        vec![groceries, Task::with_id("b".into(), "Call Bob")]
    }

    #[test]
    fn test_task_creation() {
        let task = Task::new("Write report");

        assert_eq!(task.name(), "Write report");
        assert!(!task.is_completed());
        assert!(task.subtasks().is_empty());
        assert!(!task.id().as_str().is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: std::collections::HashSet<TaskId> =
            (0..1000).map(|_| TaskId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_find_at_any_depth() {
        let forest = sample_forest();

        assert_eq!(find(&forest, &"a".into()).unwrap().name(), "Groceries");
        assert_eq!(find(&forest, &"a1x".into()).unwrap().name(), "Check fridge");
        assert_eq!(find(&forest, &"b".into()).unwrap().name(), "Call Bob");
        assert!(find(&forest, &"zzz".into()).is_none());
    }

    #[test]
    fn test_find_mut_and_toggle() {
        let mut forest = sample_forest();

        find_mut(&mut forest, &"a2".into()).unwrap().toggle();

        assert!(find(&forest, &"a2".into()).unwrap().is_completed());
        assert!(!find(&forest, &"a".into()).unwrap().is_completed());
    }

    #[test]
    fn test_remove_nested_takes_subtree() {
        let mut forest = sample_forest();
        assert_eq!(count(&forest), 5);

        let removed = remove(&mut forest, &"a1".into()).unwrap();

        assert_eq!(removed.count(), 2);
        assert_eq!(count(&forest), 3);
        assert!(find(&forest, &"a1x".into()).is_none());
        assert_eq!(find(&forest, &"a".into()).unwrap().subtasks().len(), 1);
        assert!(remove(&mut forest, &"a1".into()).is_none());
    }

    #[test]
    fn test_validate() {
        assert_eq!(validate(&sample_forest()), Ok(()));
        assert_eq!(validate(&[]), Ok(()));

        let mut forest = sample_forest();
        forest[1].add_subtask(Task::with_id("a2".into(), "Bread again"));
        assert!(validate(&forest).unwrap_err().contains("a2"));

        let mut forest = sample_forest();
        forest[0].add_subtask(Task::with_id("c".into(), "  "));
        assert!(validate(&forest).unwrap_err().contains("empty name"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let task: Task = serde_json::from_str(r#"{"id": "x", "name": "牛乳を買う"}"#).unwrap();

        assert_eq!(task.name(), "牛乳を買う");
        assert!(!task.is_completed());
        assert!(task.subtasks().is_empty());
    }

    #[test]
    fn test_deserialize_rejects_missing_or_mistyped_fields() {
        assert!(serde_json::from_str::<Task>(r#"{"name": "no id"}"#).is_err());
        assert!(serde_json::from_str::<Task>(r#"{"id": "x"}"#).is_err());
        assert!(serde_json::from_str::<Task>(r#"{"id": 7, "name": "n"}"#).is_err());
        assert!(serde_json::from_str::<Task>(r#"{"id": "x", "name": ["n"]}"#).is_err());
    }

    #[test]
    fn test_serialize_preserves_child_order() {
        let snapshot = Snapshot {
            tasks: sample_forest(),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back, snapshot);
        let names: Vec<&str> = back.tasks[0].subtasks().iter().map(Task::name).collect();
        assert_eq!(names, vec!["Milk", "Bread"]);
    }
}
