use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::task::{Id, ProjectId, SectionId};

// ---------------------------------------------------------------------------
// Raw configuration (todoview.toml)
// ---------------------------------------------------------------------------

/// Configuration as written in todoview.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub entry: EntryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub access_token: String,
    /// Default: see src/templates/todoview.toml
    #[serde(default = "default_sync_token")]
    pub sync_token: String,
    /// Default: see src/templates/todoview.toml
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            access_token: String::new(),
            sync_token: default_sync_token(),
            update_interval_secs: default_update_interval(),
        }
    }
}

/// Which tasks enter the tree at all
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Project ids, bare or with section rules. `lists` is the legacy name.
    #[serde(default, alias = "lists")]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Treat `projects` as the projects to hide rather than to show
    #[serde(default)]
    pub blacklist_projects: bool,
}

/// A `projects` entry: either a bare id or a table with section rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectEntry {
    Id(Id),
    Detailed {
        id: Id,
        #[serde(default)]
        sections: Option<Vec<Id>>,
        #[serde(default)]
        disallow: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Maximum rows (parents + children); 0 means unbounded
    #[serde(default = "default_maximum_entries")]
    pub maximum_entries: usize,
    #[serde(default = "default_true")]
    pub display_tasks_without_due: bool,
    /// If >= 0, hide tasks due more than this many days from today
    #[serde(default = "default_within_days")]
    pub display_tasks_within_days: i64,
    #[serde(default = "default_true")]
    pub display_subtasks: bool,
    #[serde(default = "default_true")]
    pub display_completed: bool,
    /// Days a completed task stays visible
    #[serde(default = "default_completed_age", alias = "maks_completed_age_days")]
    pub max_completed_age_days: i64,
    #[serde(default = "default_sort_type")]
    pub sort_type: String,
    /// Never nest subtasks: every task becomes its own row
    #[serde(default)]
    pub sort_type_strict: bool,
    #[serde(default = "default_true")]
    pub deprioritize_completed: bool,
    #[serde(default = "default_true")]
    pub show_project: bool,
    #[serde(default)]
    pub display_avatar: bool,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    #[serde(default = "default_max_project_length")]
    pub max_project_length: usize,
    /// Wrap long titles onto several lines instead of truncating
    #[serde(default)]
    pub wrap_events: bool,
    /// 12 or 24
    #[serde(default = "default_time_format")]
    pub time_format: u8,
    /// Project color token → display color
    #[serde(default)]
    pub project_colors: HashMap<String, String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            maximum_entries: default_maximum_entries(),
            display_tasks_without_due: true,
            display_tasks_within_days: default_within_days(),
            display_subtasks: true,
            display_completed: true,
            max_completed_age_days: default_completed_age(),
            sort_type: default_sort_type(),
            sort_type_strict: false,
            deprioritize_completed: true,
            show_project: true,
            display_avatar: false,
            max_title_length: default_max_title_length(),
            max_project_length: default_max_project_length(),
            wrap_events: false,
            time_format: default_time_format(),
            project_colors: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default)]
    pub role: Role,
}

/// How an instance takes part in payload fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fetches for itself only
    #[default]
    Standalone,
    /// Fetches and republishes payloads to receivers
    Broadcast,
    /// Never fetches; applies payloads published by a broadcaster
    Receive,
}

/// Default: see src/templates/todoview.toml
fn default_true() -> bool {
    true
}

/// Default: see src/templates/todoview.toml
fn default_sync_token() -> String {
    "*".to_string()
}

/// Default: see src/templates/todoview.toml
fn default_update_interval() -> u64 {
    600
}

/// Default: see src/templates/todoview.toml
fn default_maximum_entries() -> usize {
    10
}

/// Default: see src/templates/todoview.toml
fn default_within_days() -> i64 {
    -1
}

/// Default: see src/templates/todoview.toml
fn default_completed_age() -> i64 {
    14
}

/// Default: see src/templates/todoview.toml
fn default_sort_type() -> String {
    "todoist".to_string()
}

/// Default: see src/templates/todoview.toml
fn default_max_title_length() -> usize {
    25
}

/// Default: see src/templates/todoview.toml
fn default_max_project_length() -> usize {
    20
}

/// Default: see src/templates/todoview.toml
fn default_time_format() -> u8 {
    24
}

// ---------------------------------------------------------------------------
// Normalized settings
// ---------------------------------------------------------------------------

/// Ordering applied to the parent list and to each child list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SortStrategy {
    /// Parents by id; children by id with completed ones last
    #[default]
    Todoist,
    /// Highest priority first
    Priority,
    DueDateAsc,
    DueDateDesc,
    /// Due date ascending, then priority descending
    DueDateDescPriority,
    /// Priority descending, then due date ascending, then id
    TodoistAndDue,
}

impl SortStrategy {
    /// Parse the `sort_type` config value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todoist" => Some(SortStrategy::Todoist),
            "priority" => Some(SortStrategy::Priority),
            "dueDateAsc" => Some(SortStrategy::DueDateAsc),
            "dueDateDesc" => Some(SortStrategy::DueDateDesc),
            "dueDateDescPriority" => Some(SortStrategy::DueDateDescPriority),
            "todoistAndDue" => Some(SortStrategy::TodoistAndDue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortStrategy::Todoist => "todoist",
            SortStrategy::Priority => "priority",
            SortStrategy::DueDateAsc => "dueDateAsc",
            SortStrategy::DueDateDesc => "dueDateDesc",
            SortStrategy::DueDateDescPriority => "dueDateDescPriority",
            SortStrategy::TodoistAndDue => "todoistAndDue",
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical allow/deny rule for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRule {
    pub project_id: ProjectId,
    /// `None` means every section of the project
    pub sections: Option<Vec<SectionId>>,
    /// The rule excludes rather than includes
    pub disallowed: bool,
}

impl ProjectRule {
    pub fn allow(project_id: ProjectId) -> Self {
        ProjectRule {
            project_id,
            sections: None,
            disallowed: false,
        }
    }
}

impl From<&ProjectEntry> for ProjectRule {
    fn from(entry: &ProjectEntry) -> Self {
        match entry {
            ProjectEntry::Id(id) => ProjectRule::allow(*id),
            ProjectEntry::Detailed {
                id,
                sections,
                disallow,
            } => ProjectRule {
                project_id: *id,
                sections: sections.clone(),
                disallowed: *disallow,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Only listed projects pass
    #[default]
    Whitelist,
    /// Listed projects are excluded; the effective rules are derived from
    /// the account's project list on each full sync
    Blacklist,
}

/// Entry policy in canonical form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    pub mode: FilterMode,
    /// Rules as the user declared them
    pub user_rules: Vec<ProjectRule>,
    /// Rules actually applied (equal to `user_rules` in whitelist mode)
    pub rules: Vec<ProjectRule>,
    /// Label allow-set; empty names are ignored
    pub labels: Vec<String>,
}

impl FilterConfig {
    pub fn whitelist(rules: Vec<ProjectRule>, labels: Vec<String>) -> Self {
        FilterConfig {
            mode: FilterMode::Whitelist,
            user_rules: rules.clone(),
            rules,
            labels,
        }
    }

    pub fn rule_for(&self, project_id: ProjectId) -> Option<&ProjectRule> {
        self.rules.iter().find(|r| r.project_id == project_id)
    }

    /// True when every configured rule is an exclusion, so unlisted
    /// projects pass by default.
    pub fn only_disallow(&self) -> bool {
        !self.rules.is_empty() && self.rules.iter().all(|r| r.disallowed)
    }
}

/// Display policy in canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub maximum_entries: usize,
    pub display_tasks_without_due: bool,
    pub display_tasks_within_days: i64,
    pub display_subtasks: bool,
    pub display_completed: bool,
    pub max_completed_age_days: i64,
    pub sort: SortStrategy,
    pub strict: bool,
    pub deprioritize_completed: bool,
    pub show_project: bool,
    pub display_avatar: bool,
    pub max_title_length: usize,
    pub max_project_length: usize,
    pub wrap_events: bool,
    pub twelve_hour_clock: bool,
    pub project_colors: HashMap<String, String>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        let raw = DisplayConfig::default();
        DisplayOptions {
            maximum_entries: raw.maximum_entries,
            display_tasks_without_due: raw.display_tasks_without_due,
            display_tasks_within_days: raw.display_tasks_within_days,
            display_subtasks: raw.display_subtasks,
            display_completed: raw.display_completed,
            max_completed_age_days: raw.max_completed_age_days,
            sort: SortStrategy::default(),
            strict: raw.sort_type_strict,
            deprioritize_completed: raw.deprioritize_completed,
            show_project: raw.show_project,
            display_avatar: raw.display_avatar,
            max_title_length: raw.max_title_length,
            max_project_length: raw.max_project_length,
            wrap_events: raw.wrap_events,
            twelve_hour_clock: false,
            project_colors: raw.project_colors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub access_token: String,
    /// Initial cursor; empty disables incremental sync
    pub sync_token: String,
    pub update_interval: Duration,
}

/// Fully normalized configuration consumed by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub filter: FilterConfig,
    pub display: DisplayOptions,
    pub sync: SyncOptions,
    pub role: Role,
}
