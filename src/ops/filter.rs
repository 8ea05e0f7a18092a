use chrono::{NaiveDate, TimeZone};
use tracing::debug;

use crate::model::config::{DisplayOptions, FilterConfig, FilterMode, ProjectRule};
use crate::model::payload::{Project, WireTask};
use crate::model::tree::TaskTree;
use crate::ops::dates::{day_in, days_between};

// ---------------------------------------------------------------------------
// Entry policy (flat incoming items)
// ---------------------------------------------------------------------------

/// Keep the incoming items that pass the entry policy, in their original
/// order.
pub fn filter_items(items: Vec<WireTask>, filter: &FilterConfig, display_subtasks: bool) -> Vec<WireTask> {
    let before = items.len();
    let kept: Vec<WireTask> = items
        .into_iter()
        .filter(|item| passes(item, filter, display_subtasks))
        .collect();
    debug!(before, kept = kept.len(), "filtered incoming items");
    kept
}

/// Whether a single item passes the entry policy:
/// 1. subtasks are dropped when subtasks are hidden
/// 2. a configured label match admits the item regardless of project
/// 3. otherwise the project rules decide
pub fn passes(item: &WireTask, filter: &FilterConfig, display_subtasks: bool) -> bool {
    if item.parent_id.is_some() && !display_subtasks {
        return false;
    }
    if matches_labels(&item.labels, filter) {
        return true;
    }
    passes_project_rules(item, filter)
}

/// True if any of `labels` is in the configured label set
pub fn matches_labels(labels: &[String], filter: &FilterConfig) -> bool {
    labels
        .iter()
        .any(|label| filter.labels.iter().any(|l| !l.is_empty() && l == label))
}

/// Apply the project/section rules to one item
pub fn passes_project_rules(item: &WireTask, filter: &FilterConfig) -> bool {
    let Some(rule) = filter.rule_for(item.project_id) else {
        // Unlisted projects pass only when every rule is an exclusion
        return filter.only_disallow();
    };
    rule_admits(rule, item)
}

fn rule_admits(rule: &ProjectRule, item: &WireTask) -> bool {
    match &rule.sections {
        Some(sections) => {
            let in_list = item.section_id.is_some_and(|s| sections.contains(&s));
            // A disallowed entry inverts its section list
            in_list != rule.disallowed
        }
        None => !rule.disallowed,
    }
}

/// Recompute the effective rules of a blacklist configuration from the
/// account's project list: every known project the user did not list is
/// allowed. A listed project with sections stays as an exclusion of just
/// those sections. No-op in whitelist mode.
///
/// Only full syncs call this, so projects created or removed between full
/// syncs keep the previous derivation until the next one.
pub fn derive_blacklist(filter: &mut FilterConfig, projects: &[Project]) {
    if filter.mode != FilterMode::Blacklist {
        return;
    }
    let rules: Vec<ProjectRule> = projects
        .iter()
        .filter_map(|project| {
            match filter.user_rules.iter().find(|r| r.project_id == project.id) {
                None => Some(ProjectRule::allow(project.id)),
                Some(listed) if listed.sections.is_some() => Some(ProjectRule {
                    project_id: project.id,
                    sections: listed.sections.clone(),
                    disallowed: true,
                }),
                Some(_) => None,
            }
        })
        .collect();
    debug!(
        known = projects.len(),
        effective = rules.len(),
        "derived blacklist project rules"
    );
    filter.rules = rules;
}

// ---------------------------------------------------------------------------
// Due window (tree level)
// ---------------------------------------------------------------------------

/// Whether a due day falls inside the display window. Negative
/// `within_days` disables the window; overdue days always pass.
pub fn within_window(due_day: NaiveDate, today: NaiveDate, within_days: i64) -> bool {
    within_days < 0 || days_between(today, due_day) <= within_days
}

/// Drop nodes whose parent falls outside the due window. Children follow
/// their parent: a parent is assumed to be due no earlier than its
/// subtasks.
pub fn retain_within_due_window<Tz: TimeZone>(
    tree: &mut TaskTree,
    options: &DisplayOptions,
    today: NaiveDate,
    tz: &Tz,
) {
    if options.display_tasks_within_days < 0 && options.display_tasks_without_due {
        return;
    }
    tree.nodes.retain(|node| {
        let parent = &node.parent;
        if !parent.has_due() {
            return options.display_tasks_without_due;
        }
        within_window(
            day_in(parent.due.at, tz),
            today,
            options.display_tasks_within_days,
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Due, Id, Task};
    use crate::model::tree::TaskNode;
    use chrono::{TimeZone, Utc};

    fn item(id: u64, project: u64) -> WireTask {
        WireTask::new(id, project, "task")
    }

    fn rule(project: u64, sections: Option<Vec<u64>>, disallowed: bool) -> ProjectRule {
        ProjectRule {
            project_id: Id(project),
            sections: sections.map(|s| s.into_iter().map(Id).collect()),
            disallowed,
        }
    }

    fn ids(items: &[WireTask]) -> Vec<u64> {
        items.iter().map(|i| i.id.0).collect()
    }

    #[test]
    fn allowed_project_passes_disallowed_does_not() {
        let filter = FilterConfig::whitelist(vec![rule(1, None, false), rule(2, None, true)], vec![]);
        let out = filter_items(vec![item(10, 1), item(11, 2)], &filter, true);
        assert_eq!(ids(&out), vec![10]);
    }

    #[test]
    fn unlisted_project_needs_only_disallow_mode() {
        let whitelist = FilterConfig::whitelist(vec![rule(1, None, false)], vec![]);
        assert!(!passes(&item(10, 3), &whitelist, true));

        let exclusions = FilterConfig::whitelist(vec![rule(2, None, true)], vec![]);
        assert!(passes(&item(10, 3), &exclusions, true));
        assert!(!passes(&item(11, 2), &exclusions, true));
    }

    #[test]
    fn empty_config_admits_nothing() {
        let filter = FilterConfig::default();
        assert!(filter_items(vec![item(1, 1)], &filter, true).is_empty());
    }

    #[test]
    fn subtasks_dropped_when_hidden() {
        let filter = FilterConfig::whitelist(vec![rule(1, None, false)], vec![]);
        let mut child = item(11, 1);
        child.parent_id = Some(Id(10));
        let out = filter_items(vec![item(10, 1), child.clone()], &filter, false);
        assert_eq!(ids(&out), vec![10]);
        let out = filter_items(vec![item(10, 1), child], &filter, true);
        assert_eq!(ids(&out), vec![10, 11]);
    }

    #[test]
    fn label_match_short_circuits_projects() {
        let filter = FilterConfig::whitelist(vec![rule(2, None, true)], vec!["errand".into()]);
        let mut labelled = item(10, 2);
        labelled.labels = vec!["errand".into()];
        assert!(passes(&labelled, &filter, true));
        labelled.labels = vec!["other".into()];
        assert!(!passes(&labelled, &filter, true));
    }

    #[test]
    fn empty_label_name_never_matches() {
        let filter = FilterConfig::whitelist(vec![], vec![String::new()]);
        let mut labelled = item(10, 2);
        labelled.labels = vec![String::new()];
        assert!(!passes(&labelled, &filter, true));
    }

    #[test]
    fn section_rules_invert_for_disallowed_entries() {
        let allow = FilterConfig::whitelist(vec![rule(1, Some(vec![5]), false)], vec![]);
        let deny = FilterConfig::whitelist(vec![rule(1, Some(vec![5]), true)], vec![]);

        let mut in_section = item(10, 1);
        in_section.section_id = Some(Id(5));
        let mut other_section = item(11, 1);
        other_section.section_id = Some(Id(6));
        let no_section = item(12, 1);

        assert!(passes(&in_section, &allow, true));
        assert!(!passes(&other_section, &allow, true));
        assert!(!passes(&no_section, &allow, true));

        assert!(!passes(&in_section, &deny, true));
        assert!(passes(&other_section, &deny, true));
        assert!(passes(&no_section, &deny, true));
    }

    #[test]
    fn blacklist_derives_from_known_projects() {
        let mut filter = FilterConfig {
            mode: FilterMode::Blacklist,
            user_rules: vec![rule(2, None, false), rule(3, Some(vec![9]), false)],
            rules: vec![],
            labels: vec![],
        };
        let projects: Vec<Project> = [1, 2, 3]
            .into_iter()
            .map(|id| Project {
                id: Id(id),
                name: format!("p{}", id),
                color: None,
            })
            .collect();
        derive_blacklist(&mut filter, &projects);
        assert_eq!(filter.rules, vec![rule(1, None, false), rule(3, Some(vec![9]), true)]);

        assert!(passes(&item(10, 1), &filter, true));
        assert!(!passes(&item(11, 2), &filter, true));
        let mut sectioned = item(12, 3);
        sectioned.section_id = Some(Id(9));
        assert!(!passes(&sectioned, &filter, true));
        assert!(passes(&item(13, 3), &filter, true));
        // projects created after the last derivation stay hidden
        assert!(!passes(&item(14, 4), &filter, true));
    }

    #[test]
    fn derive_blacklist_ignores_whitelist_mode() {
        let mut filter = FilterConfig::whitelist(vec![rule(1, None, false)], vec![]);
        derive_blacklist(&mut filter, &[]);
        assert_eq!(filter.rules, vec![rule(1, None, false)]);
    }

    fn tree_with_dues(dues: &[Option<(i32, u32, u32)>]) -> TaskTree {
        let mut tree = TaskTree::new();
        for (i, d) in dues.iter().enumerate() {
            let mut task = Task::new(i as u64 + 1, 1, "t");
            if let Some((y, m, day)) = d {
                task.due = Due {
                    at: Utc.with_ymd_and_hms(*y, *m, *day, 0, 0, 0).unwrap(),
                    all_day: true,
                    is_set: true,
                };
            }
            tree.nodes.push(TaskNode::new(task));
        }
        tree
    }

    #[test]
    fn due_window_keeps_overdue_and_near() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut tree = tree_with_dues(&[Some((2024, 5, 1)), Some((2024, 5, 12)), Some((2024, 5, 20)), None]);
        let options = DisplayOptions {
            display_tasks_within_days: 2,
            ..Default::default()
        };
        retain_within_due_window(&mut tree, &options, today, &Utc);
        let kept: Vec<u64> = tree.nodes.iter().map(|n| n.parent.id.0).collect();
        assert_eq!(kept, vec![1, 2, 4]);
    }

    #[test]
    fn due_window_can_hide_undated() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut tree = tree_with_dues(&[Some((2030, 1, 1)), None]);
        let options = DisplayOptions {
            display_tasks_without_due: false,
            ..Default::default()
        };
        retain_within_due_window(&mut tree, &options, today, &Utc);
        let kept: Vec<u64> = tree.nodes.iter().map(|n| n.parent.id.0).collect();
        assert_eq!(kept, vec![1]);
    }
}
