use chrono::{DateTime, TimeZone, Utc};

use crate::model::config::DisplayOptions;
use crate::model::task::Task;
use crate::model::tree::TaskTree;
use crate::model::view::{Projection, ViewRow};
use crate::ops::labels::due_label;
use crate::util::unicode::display_width;

/// Cap used when `maximum_entries` is 0
pub const UNBOUNDED_ENTRIES: usize = 256;

/// Where a held-back completed task would go if backfilled
#[derive(Debug, Clone, Copy)]
enum Slot {
    Parent { row: usize },
    Child { row: usize, index: usize },
}

/// Project a sorted, quiescent tree into at most `maximum_entries` emitted
/// tasks. Open work is emitted first; with deprioritization on, completed
/// tasks are held back as placeholders and backfilled in row order while
/// budget remains. Completed parents that never get backfilled are dropped
/// from the output, child placeholders stay as `None`.
pub fn project_view<Tz: TimeZone>(
    tree: &TaskTree,
    options: &DisplayOptions,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Projection {
    let cap = match options.maximum_entries {
        0 => UNBOUNDED_ENTRIES,
        n => n,
    };
    let hold_back = options.display_completed && options.deprioritize_completed;

    let mut rows: Vec<ViewRow> = Vec::new();
    let mut held: Vec<(Slot, &Task)> = Vec::new();
    let mut count = 0;

    for node in &tree.nodes {
        if count >= cap {
            break;
        }
        let parent = &node.parent;

        if parent.is_completed() {
            if !options.display_completed {
                continue;
            }
            if hold_back {
                held.push((Slot::Parent { row: rows.len() }, parent));
                rows.push(ViewRow {
                    parent: None,
                    children: Vec::new(),
                });
            } else {
                count += 1;
                rows.push(ViewRow {
                    parent: Some(parent.clone()),
                    children: Vec::new(),
                });
            }
            continue;
        }

        count += 1;
        let row = rows.len();
        let mut children = Vec::new();
        for child in &node.children {
            if child.is_completed() {
                if !options.display_completed {
                    continue;
                }
                if hold_back {
                    held.push((
                        Slot::Child {
                            row,
                            index: children.len(),
                        },
                        child,
                    ));
                    children.push(None);
                    continue;
                }
            }
            if count < cap {
                count += 1;
                children.push(Some(child.clone()));
            }
        }
        rows.push(ViewRow {
            parent: Some(parent.clone()),
            children,
        });
    }

    for (slot, task) in held {
        if count >= cap {
            break;
        }
        count += 1;
        match slot {
            Slot::Parent { row } => rows[row].parent = Some(task.clone()),
            Slot::Child { row, index } => rows[row].children[index] = Some(task.clone()),
        }
    }

    // A held-back parent that stayed empty has nothing to show
    rows.retain(|r| r.parent.is_some());

    let mut projection = Projection {
        rows,
        ..Default::default()
    };
    measure(&mut projection, tree, options, now, tz);
    projection
}

/// Fill the width hints from the emitted parents
fn measure<Tz: TimeZone>(
    projection: &mut Projection,
    tree: &TaskTree,
    options: &DisplayOptions,
    now: DateTime<Utc>,
    tz: &Tz,
) {
    for parent in projection.rows.iter().filter_map(|r| r.parent.as_ref()) {
        if let Some(label) = due_label(parent, now, tz, options.twelve_hour_clock) {
            projection.max_due_label_width = projection.max_due_label_width.max(display_width(&label.text));
        }
        if let Some(project) = tree.project(parent.project_id) {
            let width = display_width(&project.name).min(options.max_project_length);
            projection.max_project_name_width = projection.max_project_name_width.max(width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payload::Project;
    use crate::model::task::{Due, Id};
    use crate::model::tree::TaskNode;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn open(id: u64) -> Task {
        Task::new(id, 1, "open")
    }

    fn done(id: u64) -> Task {
        let mut t = Task::new(id, 1, "done");
        t.checked = true;
        t.completed_at = Some(now() - Duration::days(1));
        t
    }

    fn node(parent: Task, children: Vec<Task>) -> TaskNode {
        TaskNode { parent, children }
    }

    fn tree_of(nodes: Vec<TaskNode>) -> TaskTree {
        let mut tree = TaskTree::new();
        tree.nodes = nodes;
        tree
    }

    fn options(max: usize) -> DisplayOptions {
        DisplayOptions {
            maximum_entries: max,
            ..Default::default()
        }
    }

    fn emitted_ids(p: &Projection) -> Vec<u64> {
        p.tasks().map(|t| t.id.0).collect()
    }

    #[test]
    fn completed_child_is_deferred_and_not_backfilled_when_full() {
        let mut parent = open(1);
        parent.due = Due {
            at: now(),
            all_day: true,
            is_set: true,
        };
        let tree = tree_of(vec![node(parent, vec![done(2)])]);

        let p = project_view(&tree, &options(1), now(), &Utc);
        assert_eq!(p.rows.len(), 1);
        assert_eq!(p.rows[0].parent.as_ref().map(|t| t.id), Some(Id(1)));
        assert_eq!(p.rows[0].children, vec![None]);
        assert_eq!(p.emitted(), 1);
    }

    #[test]
    fn open_work_wins_slots_over_completed() {
        let tree = tree_of(vec![
            node(done(1), vec![]),
            node(open(2), vec![done(3), open(4)]),
            node(open(5), vec![]),
        ]);
        let p = project_view(&tree, &options(4), now(), &Utc);
        // 2, 4, 5 are open; one slot left goes to the first held-back task
        assert_eq!(emitted_ids(&p), vec![1, 2, 4, 5]);
        assert!(p.emitted() <= 4);
    }

    #[test]
    fn backfill_follows_row_order() {
        let tree = tree_of(vec![
            node(open(1), vec![done(2), done(3)]),
            node(done(4), vec![]),
        ]);
        let p = project_view(&tree, &options(3), now(), &Utc);
        assert_eq!(emitted_ids(&p), vec![1, 2, 3]);
        assert_eq!(p.rows.len(), 1);
    }

    #[test]
    fn without_deprioritization_completed_consume_budget_in_place() {
        let tree = tree_of(vec![node(done(1), vec![]), node(open(2), vec![])]);
        let opts = DisplayOptions {
            deprioritize_completed: false,
            ..options(1)
        };
        let p = project_view(&tree, &opts, now(), &Utc);
        assert_eq!(emitted_ids(&p), vec![1]);
    }

    #[test]
    fn hidden_completed_never_emitted() {
        let tree = tree_of(vec![
            node(done(1), vec![]),
            node(open(2), vec![done(3), open(4)]),
        ]);
        let opts = DisplayOptions {
            display_completed: false,
            ..options(10)
        };
        let p = project_view(&tree, &opts, now(), &Utc);
        assert_eq!(emitted_ids(&p), vec![2, 4]);
        assert_eq!(p.rows[0].children.len(), 1);
    }

    #[test]
    fn zero_means_unbounded() {
        let nodes = (1..=300).map(|id| node(open(id), vec![])).collect();
        let p = project_view(&tree_of(nodes), &options(0), now(), &Utc);
        assert_eq!(p.emitted(), UNBOUNDED_ENTRIES);
    }

    #[test]
    fn never_exceeds_cap() {
        for cap in 1..8 {
            let tree = tree_of(vec![
                node(open(1), vec![open(2), done(3), open(4)]),
                node(done(5), vec![open(6)]),
                node(open(7), vec![done(8)]),
            ]);
            let p = project_view(&tree, &options(cap), now(), &Utc);
            assert!(p.emitted() <= cap, "cap {} emitted {}", cap, p.emitted());
        }
    }

    #[test]
    fn width_hints_cover_emitted_parents() {
        let mut tree = tree_of(vec![node(open(1), vec![])]);
        tree.nodes[0].parent.due = Due {
            at: now() + Duration::days(1),
            all_day: true,
            is_set: true,
        };
        tree.projects.insert(
            Id(1),
            Project {
                id: Id(1),
                name: "A rather long project name".into(),
                color: None,
            },
        );
        let opts = DisplayOptions {
            max_project_length: 10,
            ..options(5)
        };
        let p = project_view(&tree, &opts, now(), &Utc);
        assert_eq!(p.max_due_label_width, "Tomorrow".len());
        assert_eq!(p.max_project_name_width, 10);
    }
}
