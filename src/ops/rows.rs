use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;

use crate::model::config::{DisplayOptions, SortStrategy};
use crate::model::task::Task;
use crate::model::tree::TaskTree;
use crate::model::view::{AvatarRef, Projection, ProjectCell, RenderedView, RowDescriptor};
use crate::ops::labels::{due_label, priority_class};
use crate::util::unicode::{display_width, truncate_to_width, wrap_to_width};

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid markdown link regex"));

const SUBTASK_INDENT: &str = "- ";

/// Turn a projection into the flat row list handed to the render surface.
/// Placeholders are skipped.
pub fn render_rows<Tz: TimeZone>(
    projection: &Projection,
    tree: &TaskTree,
    options: &DisplayOptions,
    now: DateTime<Utc>,
    tz: &Tz,
) -> RenderedView {
    let due_width = projection.max_due_label_width;
    let mut rows = Vec::with_capacity(projection.emitted());

    for row in &projection.rows {
        if let Some(parent) = &row.parent {
            let mut desc = describe(parent, 0, tree, options, due_width);
            desc.due = due_label(parent, now, tz, options.twelve_hour_clock);
            if options.show_project {
                desc.project = project_cell(parent, tree, options);
            }
            rows.push(desc);
        }
        for child in row.children.iter().flatten() {
            rows.push(describe(child, 1, tree, options, due_width));
        }
    }

    RenderedView {
        rows,
        due_width,
        project_width: projection.max_project_name_width,
    }
}

fn describe(task: &Task, depth: u8, tree: &TaskTree, options: &DisplayOptions, due_width: usize) -> RowDescriptor {
    let completed = task.is_completed();
    RowDescriptor {
        task_id: task.id,
        depth,
        title_lines: title_lines(task, depth, completed, options, due_width),
        due: None,
        priority: priority_class(task.priority),
        completed,
        project: None,
        avatar: if options.display_avatar { avatar(task, tree) } else { None },
    }
}

/// Title text shortened or wrapped to its share of `max_title_length`
pub fn title_lines(task: &Task, depth: u8, completed: bool, options: &DisplayOptions, due_width: usize) -> Vec<String> {
    let indent = if depth > 0 && options.sort == SortStrategy::Todoist {
        SUBTASK_INDENT
    } else {
        ""
    };
    let marker = usize::from(completed);
    let budget = options
        .max_title_length
        .saturating_sub(display_width(indent) + marker + due_width)
        .max(1);

    let text = plain_title(&task.content);
    let mut lines = if options.wrap_events {
        wrap_to_width(&text, budget)
    } else {
        vec![truncate_to_width(&text, budget)]
    };
    if let Some(first) = lines.first_mut() {
        first.insert_str(0, indent);
    }
    lines
}

/// Replace `[text](url)` links with their text
pub fn plain_title(content: &str) -> String {
    MARKDOWN_LINK.replace_all(content, "$1").trim().to_string()
}

fn project_cell(task: &Task, tree: &TaskTree, options: &DisplayOptions) -> Option<ProjectCell> {
    let project = tree.project(task.project_id)?;
    let color = project
        .color
        .as_ref()
        .and_then(|token| options.project_colors.get(token))
        .cloned();
    Some(ProjectCell {
        name: truncate_to_width(&project.name, options.max_project_length),
        color_token: project.color.clone(),
        color,
    })
}

fn avatar(task: &Task, tree: &TaskTree) -> Option<AvatarRef> {
    let uid = task.responsible_uid?;
    let image_id = tree.collaborator(uid)?.image_id.clone()?;
    Some(AvatarRef { image_id })
}
