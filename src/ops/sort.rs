use std::cmp::Ordering;

use crate::model::config::SortStrategy;
use crate::model::task::Task;
use crate::model::tree::TaskTree;

/// Sort the parent sequence and every child sequence of the tree. Every
/// strategy is a total order ending in an id tiebreak, so results do not
/// depend on incoming order.
pub fn sort_tree(tree: &mut TaskTree, strategy: SortStrategy) {
    tree.nodes
        .sort_by(|a, b| compare_parents(&a.parent, &b.parent, strategy));
    for node in &mut tree.nodes {
        node.children
            .sort_by(|a, b| compare_children(a, b, strategy));
    }
}

/// Ordering of two top-level tasks
pub fn compare_parents(a: &Task, b: &Task, strategy: SortStrategy) -> Ordering {
    match strategy {
        SortStrategy::Todoist => by_id(a, b),
        _ => compare(a, b, strategy),
    }
}

/// Ordering of two siblings under the same parent
pub fn compare_children(a: &Task, b: &Task, strategy: SortStrategy) -> Ordering {
    match strategy {
        // Open subtasks first, then by id within each group
        SortStrategy::Todoist => a
            .is_completed()
            .cmp(&b.is_completed())
            .then_with(|| by_id(a, b)),
        _ => compare(a, b, strategy),
    }
}

fn compare(a: &Task, b: &Task, strategy: SortStrategy) -> Ordering {
    let primary = match strategy {
        SortStrategy::Todoist => Ordering::Equal,
        SortStrategy::Priority => by_priority_desc(a, b),
        SortStrategy::DueDateAsc => by_due_asc(a, b),
        SortStrategy::DueDateDesc => by_due_asc(b, a),
        // Historical name: date ascending, then priority descending
        SortStrategy::DueDateDescPriority => by_due_asc(a, b).then_with(|| by_priority_desc(a, b)),
        SortStrategy::TodoistAndDue => by_priority_desc(a, b)
            .then_with(|| by_due_asc(a, b))
            .then_with(|| b.has_due().cmp(&a.has_due())),
    };
    primary.then_with(|| by_id(a, b))
}

fn by_id(a: &Task, b: &Task) -> Ordering {
    a.id.cmp(&b.id)
}

fn by_priority_desc(a: &Task, b: &Task) -> Ordering {
    b.priority.cmp(&a.priority)
}

fn by_due_asc(a: &Task, b: &Task) -> Ordering {
    a.due.at.cmp(&b.due.at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Due, Id, Priority};
    use crate::model::tree::TaskNode;
    use chrono::{TimeZone, Utc};

    fn task(id: u64, priority: u8, due_day: Option<u32>) -> Task {
        let mut t = Task::new(id, 1, "t");
        t.priority = Priority::new(priority);
        if let Some(day) = due_day {
            t.due = Due {
                at: Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
                all_day: true,
                is_set: true,
            };
        }
        t
    }

    fn tree_of(tasks: Vec<Task>) -> TaskTree {
        let mut tree = TaskTree::new();
        tree.nodes = tasks.into_iter().map(TaskNode::new).collect();
        tree
    }

    fn order(tree: &TaskTree) -> Vec<u64> {
        tree.nodes.iter().map(|n| n.parent.id.0).collect()
    }

    #[test]
    fn todoist_orders_parents_by_id() {
        let mut tree = tree_of(vec![task(3, 1, None), task(1, 4, None), task(2, 1, Some(1))]);
        sort_tree(&mut tree, SortStrategy::Todoist);
        assert_eq!(order(&tree), vec![1, 2, 3]);
    }

    #[test]
    fn todoist_puts_completed_children_last() {
        let mut node = TaskNode::new(task(1, 1, None));
        let mut done_low = task(2, 1, None);
        done_low.checked = true;
        let mut done_high = task(5, 1, None);
        done_high.checked = true;
        node.children = vec![done_high, task(4, 1, None), done_low, task(3, 1, None)];
        let mut tree = TaskTree::new();
        tree.nodes.push(node);

        sort_tree(&mut tree, SortStrategy::Todoist);
        let ids: Vec<u64> = tree.nodes[0].children.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![3, 4, 2, 5]);
        let first_done = tree.nodes[0].children.iter().position(Task::is_completed).unwrap();
        assert!(tree.nodes[0].children[first_done..].iter().all(Task::is_completed));
    }

    #[test]
    fn priority_descending_with_id_tiebreak() {
        let mut tree = tree_of(vec![task(1, 1, None), task(4, 3, None), task(2, 4, None), task(3, 3, None)]);
        sort_tree(&mut tree, SortStrategy::Priority);
        assert_eq!(order(&tree), vec![2, 3, 4, 1]);
    }

    #[test]
    fn due_date_ascending_puts_undated_last() {
        let mut tree = tree_of(vec![task(1, 1, None), task(2, 1, Some(9)), task(3, 1, Some(2))]);
        sort_tree(&mut tree, SortStrategy::DueDateAsc);
        assert_eq!(order(&tree), vec![3, 2, 1]);
    }

    #[test]
    fn due_date_descending() {
        let mut tree = tree_of(vec![task(1, 1, Some(5)), task(2, 1, Some(9)), task(3, 1, Some(2))]);
        sort_tree(&mut tree, SortStrategy::DueDateDesc);
        assert_eq!(order(&tree), vec![2, 1, 3]);
    }

    #[test]
    fn due_date_desc_priority_is_date_then_priority() {
        let mut tree = tree_of(vec![
            task(1, 1, Some(5)),
            task(2, 4, Some(5)),
            task(3, 2, Some(1)),
        ]);
        sort_tree(&mut tree, SortStrategy::DueDateDescPriority);
        assert_eq!(order(&tree), vec![3, 2, 1]);
    }

    #[test]
    fn todoist_and_due_is_priority_then_date_then_id() {
        let mut tree = tree_of(vec![
            task(1, 2, None),
            task(2, 2, Some(3)),
            task(3, 4, Some(20)),
            task(4, 2, Some(3)),
            task(5, 1, Some(1)),
        ]);
        sort_tree(&mut tree, SortStrategy::TodoistAndDue);
        assert_eq!(order(&tree), vec![3, 2, 4, 1, 5]);
    }

    #[test]
    fn dated_task_beats_undated_on_same_instant() {
        let mut dated = task(9, 1, None);
        dated.due = Due {
            is_set: true,
            ..Due::unset()
        };
        let undated = task(1, 1, None);
        assert_eq!(
            compare_parents(&dated, &undated, SortStrategy::TodoistAndDue),
            Ordering::Less
        );
    }

    #[test]
    fn children_use_the_same_strategy() {
        let mut node = TaskNode::new(task(1, 1, None));
        node.children = vec![task(2, 1, None), task(3, 4, None)];
        let mut tree = TaskTree::new();
        tree.nodes.push(node);
        sort_tree(&mut tree, SortStrategy::Priority);
        assert_eq!(tree.nodes[0].children[0].id, Id(3));
    }
}
