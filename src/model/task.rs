use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

/// Numeric identifier used by the remote service for tasks, projects,
/// sections and collaborators. The wire format sends these either as JSON
/// numbers or as numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(pub u64);

pub type TaskId = Id;
pub type ProjectId = Id;
pub type SectionId = Id;
pub type CollaboratorId = Id;

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Id)
    }
}

impl From<u64> for Id {
    fn from(v: u64) -> Self {
        Id(v)
    }
}

struct IdVisitor;

impl de::Visitor<'_> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Id, E> {
        Ok(Id(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Id, E> {
        u64::try_from(v)
            .map(Id)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
        v.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

/// Task priority, 1 (normal) to 4 (most urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const LOWEST: Priority = Priority(1);
    pub const HIGHEST: Priority = Priority(4);

    pub fn new(level: u8) -> Self {
        Priority(level.clamp(1, 4))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::LOWEST
    }
}

impl From<u8> for Priority {
    fn from(v: u8) -> Self {
        Priority::new(v)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.0
    }
}

/// Seconds since the epoch for 2100-12-31T00:00:00Z, the due date given to
/// tasks that have none.
const UNSET_DUE_EPOCH: i64 = 4_133_894_400;

/// A canonical due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Due {
    /// Absolute instant of the due date (midnight for all-day dates)
    pub at: DateTime<Utc>,
    /// True when the source string carried no time component
    pub all_day: bool,
    /// False for the far-future placeholder given to undated tasks
    pub is_set: bool,
}

impl Due {
    /// The far-future placeholder for tasks without a due date. Sorts last
    /// under date orderings and is never "due soon".
    pub fn unset() -> Self {
        Due {
            at: DateTime::from_timestamp(UNSET_DUE_EPOCH, 0).unwrap_or(DateTime::<Utc>::MAX_UTC),
            all_day: true,
            is_set: false,
        }
    }
}

impl Default for Due {
    fn default() -> Self {
        Due::unset()
    }
}

/// A normalized task as held in the task tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    /// Owning task, if this is a subtask
    pub parent_id: Option<TaskId>,
    pub project_id: ProjectId,
    pub section_id: Option<SectionId>,
    /// Label names (without the `@` prefix)
    pub labels: Vec<String>,
    pub priority: Priority,
    pub due: Due,
    pub completed_at: Option<DateTime<Utc>>,
    /// Done flag from the remote service
    pub checked: bool,
    pub deleted: bool,
    /// Task text as entered (markdown, not rendered)
    pub content: String,
    /// Assignee, if any
    pub responsible_uid: Option<CollaboratorId>,
}

impl Task {
    /// Create an undated, open top-level task
    pub fn new(id: u64, project_id: u64, content: &str) -> Self {
        Task {
            id: Id(id),
            parent_id: None,
            project_id: Id(project_id),
            section_id: None,
            labels: Vec::new(),
            priority: Priority::default(),
            due: Due::unset(),
            completed_at: None,
            checked: false,
            deleted: false,
            content: content.to_string(),
            responsible_uid: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.checked || self.completed_at.is_some()
    }

    pub fn has_due(&self) -> bool {
        self.due.is_set
    }
}
