use tracing::{debug, warn};

use crate::model::payload::{Collaborator, Project};
use crate::model::task::{Task, TaskId};
use crate::model::tree::{TaskNode, TaskTree};

/// A subtask whose declared parent is not a node of the tree. The task is
/// dropped; the tree is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task {task} references parent {parent} which is not in the tree")]
pub struct OrphanReference {
    pub task: TaskId,
    pub parent: TaskId,
}

/// What a reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Tasks that changed owner (re-parented, promoted or demoted)
    pub moved: usize,
    pub orphans: Vec<OrphanReference>,
}

/// One normalized, filtered sync response
#[derive(Debug, Clone, Default)]
pub struct Incoming {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub collaborators: Vec<Collaborator>,
    pub full_sync: bool,
}

/// Apply a sync response to the tree: a full sync replaces everything, a
/// delta sync merges into what is there. With `strict` set, tasks are never
/// nested and each becomes its own node.
pub fn reconcile(tree: &mut TaskTree, incoming: Incoming, strict: bool) -> ReconcileReport {
    if incoming.full_sync {
        replace_side_tables(tree, incoming.projects, incoming.collaborators);
        replace_all(tree, incoming.tasks, strict)
    } else {
        merge_side_tables(tree, incoming.projects, incoming.collaborators);
        merge_delta(tree, incoming.tasks, strict)
    }
}

/// The node id a task belongs under: its own id for top-level tasks (and
/// for every task in strict mode), otherwise its parent's id.
pub fn owning_id(task: &Task, strict: bool) -> TaskId {
    match task.parent_id {
        Some(parent) if !strict => parent,
        _ => task.id,
    }
}

// ---------------------------------------------------------------------------
// Full replace
// ---------------------------------------------------------------------------

/// Rebuild the tree from a complete task list. Parents are placed before
/// children so payload order does not matter; deleted records are skipped.
pub fn replace_all(tree: &mut TaskTree, tasks: Vec<Task>, strict: bool) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    tree.nodes.clear();

    let (parents, children): (Vec<Task>, Vec<Task>) = tasks
        .into_iter()
        .filter(|t| !t.deleted)
        .partition(|t| owning_id(t, strict) == t.id);

    for parent in parents {
        match tree.node_index(parent.id) {
            Some(ni) => {
                tree.nodes[ni].parent = parent;
                report.updated += 1;
            }
            None => {
                tree.nodes.push(TaskNode::new(parent));
                report.inserted += 1;
            }
        }
    }

    // Subtasks of subtasks wait until their own parent is placed
    let mut nested = Vec::new();
    for child in children {
        match owning_node(tree, owning_id(&child, strict)) {
            Some(ni) => upsert_child(&mut tree.nodes[ni], child, &mut report),
            None => nested.push(child),
        }
    }
    for child in nested {
        let parent_id = owning_id(&child, strict);
        let Some(ni) = owning_node(tree, parent_id) else {
            report_orphan(&mut report, child.id, parent_id);
            continue;
        };
        upsert_child(&mut tree.nodes[ni], child, &mut report);
    }

    debug!(
        nodes = tree.nodes.len(),
        inserted = report.inserted,
        orphans = report.orphans.len(),
        "full sync replaced task tree"
    );
    report
}

// ---------------------------------------------------------------------------
// Incremental merge
// ---------------------------------------------------------------------------

/// Merge changed, created and deleted records into the existing tree
pub fn merge_delta(tree: &mut TaskTree, tasks: Vec<Task>, strict: bool) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for task in tasks {
        let owner = owning_id(&task, strict);
        if owner == task.id {
            merge_parent(tree, task, &mut report);
        } else {
            merge_child(tree, task, owner, &mut report);
        }
    }
    debug!(
        nodes = tree.nodes.len(),
        inserted = report.inserted,
        updated = report.updated,
        removed = report.removed,
        moved = report.moved,
        orphans = report.orphans.len(),
        "delta sync merged into task tree"
    );
    report
}

fn merge_parent(tree: &mut TaskTree, task: Task, report: &mut ReconcileReport) {
    // Promoted from subtask: leave the old parent first
    if let Some((ni, ci)) = tree.child_position(task.id) {
        tree.nodes[ni].children.remove(ci);
        if task.deleted {
            report.removed += 1;
        } else {
            report.moved += 1;
        }
    }

    match tree.node_index(task.id) {
        Some(ni) if task.deleted => {
            tree.nodes.remove(ni);
            report.removed += 1;
        }
        Some(ni) => {
            tree.nodes[ni].parent = task;
            report.updated += 1;
        }
        None if task.deleted => {
            debug!(task = %task.id, "deleted task was not in the tree");
        }
        None => {
            tree.nodes.push(TaskNode::new(task));
            report.inserted += 1;
        }
    }
}

fn merge_child(tree: &mut TaskTree, task: Task, parent_id: TaskId, report: &mut ReconcileReport) {
    if task.deleted {
        if let Some((ni, ci)) = tree.child_position(task.id) {
            tree.nodes[ni].children.remove(ci);
            report.removed += 1;
        }
        if let Some(ni) = tree.node_index(task.id) {
            tree.nodes.remove(ni);
            report.removed += 1;
        }
        return;
    }

    if owning_node(tree, parent_id).is_none() {
        report_orphan(report, task.id, parent_id);
        return;
    }

    // Demoted from parent: its subtasks come along, the tree is two levels deep
    let carried = match tree.node_index(task.id) {
        Some(ni) => {
            report.moved += 1;
            tree.nodes.remove(ni).children
        }
        None => Vec::new(),
    };

    let Some(target) = owning_node(tree, parent_id) else {
        report_orphan(report, task.id, parent_id);
        return;
    };

    // Re-parented: leave the previous node
    if let Some((ni, ci)) = tree.child_position(task.id)
        && ni != target
    {
        tree.nodes[ni].children.remove(ci);
        report.moved += 1;
    }

    let node = &mut tree.nodes[target];
    upsert_child(node, task, report);
    node.children.extend(carried);
}

/// Node that holds the subtasks of `parent_id`: its own node, or the node
/// it sits in when it is itself a subtask (a demoted parent keeps its
/// former subtasks next to it).
fn owning_node(tree: &TaskTree, parent_id: TaskId) -> Option<usize> {
    tree.node_index(parent_id)
        .or_else(|| tree.child_position(parent_id).map(|(ni, _)| ni))
}

fn upsert_child(node: &mut TaskNode, child: Task, report: &mut ReconcileReport) {
    match node.child_index(child.id) {
        Some(ci) => {
            node.children[ci] = child;
            report.updated += 1;
        }
        None => {
            node.children.push(child);
            report.inserted += 1;
        }
    }
}

fn report_orphan(report: &mut ReconcileReport, task: TaskId, parent: TaskId) {
    let orphan = OrphanReference { task, parent };
    warn!(task = %task, parent = %parent, "{}", orphan);
    report.orphans.push(orphan);
}

// ---------------------------------------------------------------------------
// Side tables
// ---------------------------------------------------------------------------

/// Full sync: the payload's projects and collaborators become the tables
pub fn replace_side_tables(tree: &mut TaskTree, projects: Vec<Project>, collaborators: Vec<Collaborator>) {
    tree.projects = projects.into_iter().map(|p| (p.id, p)).collect();
    tree.collaborators = collaborators.into_iter().map(|c| (c.id, c)).collect();
}

/// Delta sync: append records not yet known by id; nothing is removed
pub fn merge_side_tables(tree: &mut TaskTree, projects: Vec<Project>, collaborators: Vec<Collaborator>) {
    for project in projects {
        tree.projects.entry(project.id).or_insert(project);
    }
    for collaborator in collaborators {
        tree.collaborators.entry(collaborator.id).or_insert(collaborator);
    }
}
