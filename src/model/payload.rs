use serde::{Deserialize, Serialize};

use super::task::{CollaboratorId, Id, Priority, ProjectId, SectionId, TaskId};

/// Due block of a task as sent by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDue {
    /// `YYYY-MM-DD` or `YYYY-MM-DDThh:mm:ss[Z]`
    pub date: String,
    #[serde(default)]
    pub string: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

/// A task record exactly as it arrives in a sync or completed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTask {
    pub id: TaskId,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    pub project_id: ProjectId,
    #[serde(default)]
    pub section_id: Option<SectionId>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due: Option<WireDue>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, alias = "deleted")]
    pub is_deleted: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub responsible_uid: Option<CollaboratorId>,
}

impl WireTask {
    pub fn new(id: u64, project_id: u64, content: &str) -> Self {
        WireTask {
            id: Id(id),
            parent_id: None,
            project_id: Id(project_id),
            section_id: None,
            labels: Vec::new(),
            priority: Priority::default(),
            due: None,
            completed_at: None,
            checked: false,
            is_deleted: false,
            content: content.to_string(),
            responsible_uid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Color token (e.g. `berry_red` or a legacy numeric code)
    #[serde(default, deserialize_with = "color_token")]
    pub color: Option<String>,
}

/// Accept color tokens sent either as strings or as legacy numbers.
fn color_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: CollaboratorId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInfo {
    #[serde(default)]
    pub plan_name: String,
    /// Whether completed-task lookups are permitted
    #[serde(default)]
    pub completed_tasks: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    #[serde(default)]
    pub current: Option<PlanInfo>,
}

/// Response of the sync endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    #[serde(default)]
    pub sync_token: Option<String>,
    #[serde(default)]
    pub full_sync: bool,
    #[serde(default)]
    pub items: Vec<WireTask>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub user_plan_limits: PlanLimits,
    /// Credential the fetch collaborator used for this request
    #[serde(default)]
    pub access_token: Option<String>,
}

/// One record of the completed-tasks endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedEntry {
    #[serde(default)]
    pub item_object: Option<WireTask>,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Response of the completed-tasks endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletedPayload {
    #[serde(default)]
    pub items: Vec<CompletedEntry>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_payload() {
        let json = r#"{
            "sync_token": "abc",
            "full_sync": true,
            "items": [
                {"id": "7", "project_id": "100", "content": "Buy milk", "priority": 4,
                 "due": {"date": "2024-05-01", "is_recurring": false}, "labels": ["home"]},
                {"id": "8", "parent_id": "7", "project_id": "100", "content": "Oat", "is_deleted": true}
            ],
            "projects": [{"id": "100", "name": "Inbox", "color": "berry_red"}],
            "collaborators": [{"id": "5", "image_id": "abc123"}],
            "user_plan_limits": {"current": {"plan_name": "pro", "completed_tasks": true}}
        }"#;
        let payload: SyncPayload = serde_json::from_str(json).unwrap();
        assert!(payload.full_sync);
        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[0].priority.level(), 4);
        assert_eq!(payload.items[0].due.as_ref().unwrap().date, "2024-05-01");
        assert_eq!(payload.items[1].parent_id, Some(Id(7)));
        assert!(payload.items[1].is_deleted);
        assert_eq!(payload.projects[0].color.as_deref(), Some("berry_red"));
        assert!(payload.user_plan_limits.current.unwrap().completed_tasks);
        assert!(payload.access_token.is_none());
    }

    #[test]
    fn legacy_numeric_colors_become_tokens() {
        let p: Project = serde_json::from_str(r#"{"id": 1, "name": "Work", "color": 31}"#).unwrap();
        assert_eq!(p.color.as_deref(), Some("31"));
    }

    #[test]
    fn completed_entries_may_lack_item_object() {
        let json = r#"{"items": [{"task_id": "3"}, {"item_object": {"id": 4, "project_id": 1, "checked": true}}]}"#;
        let payload: CompletedPayload = serde_json::from_str(json).unwrap();
        assert!(payload.items[0].item_object.is_none());
        assert!(payload.items[1].item_object.as_ref().unwrap().checked);
    }
}
