use chrono::{NaiveDate, TimeZone};
use tracing::debug;

use crate::model::task::{Task, TaskId};
use crate::model::tree::TaskTree;
use crate::ops::dates::{day_in, days_between};

/// Whether a completed task is still inside the retention window. Both
/// timestamps are truncated to local midnight before differencing; open
/// tasks and tasks without a completion time are always retained.
pub fn is_retained<Tz: TimeZone>(task: &Task, retention_days: i64, today: NaiveDate, tz: &Tz) -> bool {
    match task.completed_at {
        Some(done) if task.is_completed() => days_between(day_in(done, tz), today) <= retention_days,
        _ => true,
    }
}

/// Remove completed tasks older than `retention_days`. A parent that ages
/// out takes its whole node with it. Returns the ids removed, in tree
/// order.
pub fn filter_completed_by_age<Tz: TimeZone>(
    tree: &mut TaskTree,
    retention_days: i64,
    today: NaiveDate,
    tz: &Tz,
) -> Vec<TaskId> {
    let mut removed = Vec::new();

    tree.nodes.retain_mut(|node| {
        if !is_retained(&node.parent, retention_days, today, tz) {
            removed.push(node.parent.id);
            removed.extend(node.children.iter().map(|c| c.id));
            return false;
        }
        node.children.retain(|child| {
            let keep = is_retained(child, retention_days, today, tz);
            if !keep {
                removed.push(child.id);
            }
            keep
        });
        true
    });

    if !removed.is_empty() {
        debug!(count = removed.len(), retention_days, "aged out completed tasks");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Id;
    use crate::model::tree::TaskNode;
    use chrono::{Duration, Local, Utc};

    fn completed(id: u64, days_ago: i64, now: chrono::DateTime<Utc>) -> Task {
        let mut t = Task::new(id, 1, "done");
        t.checked = true;
        t.completed_at = Some(now - Duration::days(days_ago));
        t
    }

    fn today_local() -> (chrono::DateTime<Utc>, NaiveDate) {
        let now = Utc::now();
        (now, day_in(now, &Local))
    }

    #[test]
    fn twenty_days_old_task_respects_retention() {
        let (now, today) = today_local();
        let task = completed(1, 20, now);
        assert!(!is_retained(&task, 14, today, &Local));
        assert!(is_retained(&task, 30, today, &Local));
    }

    #[test]
    fn boundary_day_is_retained() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let mut task = Task::new(1, 1, "done");
        task.checked = true;
        task.completed_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap());
        assert!(is_retained(&task, 14, today, &Utc));
        assert!(!is_retained(&task, 13, today, &Utc));
    }

    #[test]
    fn open_tasks_always_retained() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let task = Task::new(1, 1, "open");
        assert!(is_retained(&task, 0, today, &Utc));
    }

    #[test]
    fn removes_parents_with_children_and_stale_children() {
        let (now, today) = today_local();
        let mut tree = TaskTree::new();

        let mut old_parent = TaskNode::new(completed(1, 20, now));
        old_parent.children.push(Task::new(2, 1, "open child"));
        tree.nodes.push(old_parent);

        let mut live = TaskNode::new(Task::new(3, 1, "open parent"));
        live.children.push(completed(4, 20, now));
        live.children.push(completed(5, 2, now));
        tree.nodes.push(live);

        let removed = filter_completed_by_age(&mut tree, 14, today, &Local);
        assert_eq!(removed, vec![Id(1), Id(2), Id(4)]);
        assert_eq!(tree.nodes.len(), 1);
        let kept: Vec<u64> = tree.nodes[0].children.iter().map(|c| c.id.0).collect();
        assert_eq!(kept, vec![5]);
    }
}
