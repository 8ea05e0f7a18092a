use indexmap::IndexMap;
use serde::Serialize;

use super::payload::{Collaborator, Project};
use super::task::{CollaboratorId, ProjectId, Task, TaskId};

/// A top-level task and its subtasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskNode {
    pub parent: Task,
    pub children: Vec<Task>,
}

impl TaskNode {
    pub fn new(parent: Task) -> Self {
        TaskNode {
            parent,
            children: Vec::new(),
        }
    }

    /// Position of a child by task id
    pub fn child_index(&self, id: TaskId) -> Option<usize> {
        self.children.iter().position(|c| c.id == id)
    }
}

/// The persistent, two-level task tree plus the side tables rows are
/// resolved against.
///
/// Invariants: a parent id appears in at most one node, and a child id
/// appears in at most one node's children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTree {
    pub nodes: Vec<TaskNode>,
    pub projects: IndexMap<ProjectId, Project>,
    pub collaborators: IndexMap<CollaboratorId, Collaborator>,
}

impl TaskTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the node whose parent has the given id
    pub fn node_index(&self, parent_id: TaskId) -> Option<usize> {
        self.nodes.iter().position(|n| n.parent.id == parent_id)
    }

    pub fn node(&self, parent_id: TaskId) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.parent.id == parent_id)
    }

    /// Locate a child anywhere in the tree: `(node index, child index)`
    pub fn child_position(&self, id: TaskId) -> Option<(usize, usize)> {
        self.nodes
            .iter()
            .enumerate()
            .find_map(|(ni, n)| n.child_index(id).map(|ci| (ni, ci)))
    }

    /// Find a task by id, whether it is a parent or a child
    pub fn find_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks().find(|t| t.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.find_task(id).is_some()
    }

    /// All tasks in tree order (each parent followed by its children)
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.nodes
            .iter()
            .flat_map(|n| std::iter::once(&n.parent).chain(n.children.iter()))
    }

    pub fn task_count(&self) -> usize {
        self.nodes.iter().map(|n| 1 + n.children.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn collaborator(&self, id: CollaboratorId) -> Option<&Collaborator> {
        self.collaborators.get(&id)
    }

    /// Drop all nodes and side tables
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.projects.clear();
        self.collaborators.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Id;

    fn sample() -> TaskTree {
        let mut tree = TaskTree::new();
        let mut node = TaskNode::new(Task::new(1, 10, "parent"));
        let mut child = Task::new(2, 10, "child");
        child.parent_id = Some(Id(1));
        node.children.push(child);
        tree.nodes.push(node);
        tree.nodes.push(TaskNode::new(Task::new(3, 10, "solo")));
        tree
    }

    #[test]
    fn lookups() {
        let tree = sample();
        assert_eq!(tree.node_index(Id(3)), Some(1));
        assert_eq!(tree.node_index(Id(2)), None);
        assert_eq!(tree.child_position(Id(2)), Some((0, 0)));
        assert_eq!(tree.find_task(Id(2)).unwrap().content, "child");
        assert!(!tree.contains(Id(9)));
    }

    #[test]
    fn iterates_in_tree_order() {
        let tree = sample();
        let ids: Vec<u64> = tree.tasks().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(tree.task_count(), 3);
    }
}
