use serde::Serialize;

use super::task::{Task, TaskId};

/// One projected row group. `None` marks a completed task that was held
/// back by deprioritization and not backfilled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub parent: Option<Task>,
    pub children: Vec<Option<Task>>,
}

impl ViewRow {
    /// Number of real (non-placeholder) tasks in this row
    pub fn emitted(&self) -> usize {
        usize::from(self.parent.is_some()) + self.children.iter().flatten().count()
    }
}

/// Bounded view of the task tree plus the column widths rows negotiate
/// their truncation against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub rows: Vec<ViewRow>,
    /// Display width of the longest due-date label among emitted parents
    pub max_due_label_width: usize,
    /// Display width of the longest project name among emitted parents
    pub max_project_name_width: usize,
}

impl Projection {
    /// Total emitted tasks (parents + children), placeholders excluded
    pub fn emitted(&self) -> usize {
        self.rows.iter().map(ViewRow::emitted).sum()
    }

    /// Emitted tasks in display order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.rows.iter().flat_map(|r| {
            r.parent
                .iter()
                .chain(r.children.iter().filter_map(Option::as_ref))
        })
    }
}

/// Display classification of a due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStyle {
    Overdue,
    Today,
    Tomorrow,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueLabel {
    pub text: String,
    pub style: DueStyle,
}

/// Priority marker shown next to a row (P1 is the most urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityClass {
    P1,
    P2,
    P3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCell {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

const AVATAR_BASE_URL: &str = "https://dcff1xvirvpfp.cloudfront.net";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarRef {
    pub image_id: String,
}

impl AvatarRef {
    pub fn url(&self) -> String {
        format!("{}/{}_big.jpg", AVATAR_BASE_URL, self.image_id)
    }
}

/// A row as handed to the render surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDescriptor {
    pub task_id: TaskId,
    /// 0 for parents, 1 for subtasks
    pub depth: u8,
    /// Title, already shortened or wrapped to its budget
    pub title_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DueLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityClass>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectCell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarRef>,
}

/// Everything the render surface needs for one refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedView {
    pub rows: Vec<RowDescriptor>,
    pub due_width: usize,
    pub project_width: usize,
}

/// What the render surface should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// No sync has completed yet
    Loading,
    Ready(RenderedView),
}
