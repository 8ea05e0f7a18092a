use serde::Serialize;

use crate::model::config::{DisplayOptions, FilterConfig, ProjectRule, Role, Settings};
use crate::model::payload::Project;
use crate::model::view::{DueStyle, PriorityClass, RenderedView, RowDescriptor, ViewState};
use crate::util::unicode::display_width;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RowJson {
    pub id: String,
    pub depth: u8,
    pub title: Vec<String>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_style: Option<DueStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Serialize)]
pub struct ViewJson {
    pub loading: bool,
    pub rows: Vec<RowJson>,
}

#[derive(Serialize)]
pub struct NamedViewJson {
    pub config: String,
    #[serde(flatten)]
    pub view: ViewJson,
}

#[derive(Serialize)]
pub struct ProjectJson {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Serialize)]
pub struct CheckJson<'a> {
    pub role: Role,
    pub filter: &'a FilterConfig,
    pub sort: String,
    pub strict: bool,
    pub maximum_entries: usize,
    pub update_interval_secs: u64,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub fn row_to_json(row: &RowDescriptor) -> RowJson {
    RowJson {
        id: row.task_id.to_string(),
        depth: row.depth,
        title: row.title_lines.clone(),
        completed: row.completed,
        due: row.due.as_ref().map(|d| d.text.clone()),
        due_style: row.due.as_ref().map(|d| d.style),
        priority: row.priority,
        project: row.project.as_ref().map(|p| p.name.clone()),
        project_color: row
            .project
            .as_ref()
            .and_then(|p| p.color.clone().or_else(|| p.color_token.clone())),
        avatar_url: row.avatar.as_ref().map(|a| a.url()),
    }
}

pub fn view_to_json(state: &ViewState) -> ViewJson {
    match state {
        ViewState::Loading => ViewJson {
            loading: true,
            rows: Vec::new(),
        },
        ViewState::Ready(view) => ViewJson {
            loading: false,
            rows: view.rows.iter().map(row_to_json).collect(),
        },
    }
}

pub fn project_to_json(project: &Project) -> ProjectJson {
    ProjectJson {
        id: project.id.to_string(),
        name: project.name.clone(),
        color: project.color.clone(),
    }
}

pub fn check_to_json(settings: &Settings) -> CheckJson<'_> {
    CheckJson {
        role: settings.role,
        filter: &settings.filter,
        sort: settings.display.sort.to_string(),
        strict: settings.display.strict,
        maximum_entries: settings.display.maximum_entries,
        update_interval_secs: settings.sync.update_interval.as_secs(),
    }
}

// ---------------------------------------------------------------------------
// Plain-text rendering
// ---------------------------------------------------------------------------

/// Pad `s` with spaces to `width` display cells
pub fn pad_to_width(s: &str, width: usize) -> String {
    let w = display_width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - w))
    }
}

fn priority_marker(priority: Option<PriorityClass>) -> &'static str {
    match priority {
        Some(PriorityClass::P1) => "!!!",
        Some(PriorityClass::P2) => "!!",
        Some(PriorityClass::P3) => "!",
        None => "",
    }
}

/// The board as aligned text: checkbox, title, priority, due, project
pub fn format_view(state: &ViewState) -> String {
    let view = match state {
        ViewState::Loading => return "Loading\u{2026}\n".to_string(),
        ViewState::Ready(view) => view,
    };
    if view.rows.is_empty() {
        return "No tasks.\n".to_string();
    }
    let title_width = title_column_width(view);
    let mut out = String::new();
    for row in &view.rows {
        let check = if row.completed { "[x]" } else { "[ ]" };
        let first = row.title_lines.first().map(String::as_str).unwrap_or("");
        let due = row.due.as_ref().map(|d| d.text.as_str()).unwrap_or("");
        let project = row.project.as_ref().map(|p| p.name.as_str()).unwrap_or("");
        let line = format!(
            "{} {}  {:<3}  {}  {}",
            check,
            pad_to_width(first, title_width),
            priority_marker(row.priority),
            pad_to_width(due, view.due_width),
            project
        );
        out.push_str(line.trim_end());
        out.push('\n');
        for cont in row.title_lines.iter().skip(1) {
            out.push_str("    ");
            out.push_str(cont);
            out.push('\n');
        }
    }
    out
}

fn title_column_width(view: &RenderedView) -> usize {
    view.rows
        .iter()
        .filter_map(|r| r.title_lines.first())
        .map(|t| display_width(t))
        .max()
        .unwrap_or(0)
}

/// Human summary of the normalized config
pub fn format_check(settings: &Settings) -> String {
    let mut out = String::new();
    let filter = &settings.filter;
    out.push_str(&format!("role: {:?}\n", settings.role).to_lowercase());
    out.push_str(&format!("mode: {:?}\n", filter.mode).to_lowercase());
    if filter.user_rules.is_empty() {
        out.push_str("projects: (none)\n");
    } else {
        out.push_str("projects:\n");
        for rule in &filter.user_rules {
            out.push_str(&format!("  {}\n", format_rule(rule)));
        }
    }
    if !filter.labels.is_empty() {
        out.push_str(&format!("labels: {}\n", filter.labels.join(", ")));
    }
    out.push_str(&format_display(&settings.display));
    out.push_str(&format!(
        "update interval: {}s\n",
        settings.sync.update_interval.as_secs()
    ));
    out
}

fn format_rule(rule: &ProjectRule) -> String {
    let verb = if rule.disallowed { "deny" } else { "allow" };
    match &rule.sections {
        Some(sections) => {
            let ids: Vec<String> = sections.iter().map(|s| s.to_string()).collect();
            format!("{} {} sections [{}]", verb, rule.project_id, ids.join(", "))
        }
        None => format!("{} {}", verb, rule.project_id),
    }
}

fn format_display(display: &DisplayOptions) -> String {
    let cap = match display.maximum_entries {
        0 => "unbounded".to_string(),
        n => n.to_string(),
    };
    format!(
        "sort: {}{}\nmaximum entries: {}\n",
        display.sort,
        if display.strict { " (strict)" } else { "" },
        cap
    )
}
