use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::attachments::model::Attachment;
use crate::error::StoreError;

/// Workflow state of a task. Wire strings match the UI labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    Open,
    #[serde(rename = "In-progress")]
    InProgress,
    #[serde(rename = "Waiting client")]
    WaitingClient,
    Closed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::InProgress => "In-progress",
            TaskStatus::WaitingClient => "Waiting client",
            TaskStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Open" => Some(TaskStatus::Open),
            "In-progress" => Some(TaskStatus::InProgress),
            "Waiting client" => Some(TaskStatus::WaitingClient),
            "Closed" => Some(TaskStatus::Closed),
            _ => None,
        }
    }
}

/// Task domain model. `assigned_name` is a denormalized snapshot of the
/// employee name taken at assignment time; it can drift if the employee
/// record changes later (see `tasks::local::reconcile_assignees`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub assigned_id: Option<String>,
    #[serde(default)]
    pub assigned_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,

    /// Resolved attachment list, filled in by the tracker block when
    /// joining with the attachment sub-collection.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CreateTaskPayload {
    pub title: String,
    pub details: Option<String>,
    pub assigned_id: Option<String>,
    pub assigned_name: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct UpdateTaskPayload {
    pub title: Option<String>,
    pub details: Option<String>,
    pub assigned_id: Option<String>,
    pub assigned_name: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

impl CreateTaskPayload {
    /// Build the stored record: trims and requires the title, defaults
    /// status and details, stamps the id and creation time.
    pub fn into_task(self, now: DateTime<Utc>) -> Result<Task, StoreError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }
        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            details: self.details.unwrap_or_default(),
            assigned_id: self.assigned_id.filter(|id| !id.is_empty()),
            assigned_name: self.assigned_name.unwrap_or_default(),
            created_at: now,
            deadline: self.deadline,
            status: self.status.unwrap_or_default(),
            attachments: Vec::new(),
        })
    }
}

impl Task {
    /// Merge a patch into the record. `id` and `created_at` are preserved;
    /// an empty `assigned_id` clears the assignment.
    pub fn apply(&mut self, patch: UpdateTaskPayload) -> Result<(), StoreError> {
        if let Some(title) = patch.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(StoreError::Validation("title is required".to_string()));
            }
            self.title = title;
        }
        if let Some(details) = patch.details {
            self.details = details;
        }
        if let Some(assigned_id) = patch.assigned_id {
            self.assigned_id = if assigned_id.is_empty() {
                None
            } else {
                Some(assigned_id)
            };
        }
        if let Some(assigned_name) = patch.assigned_name {
            self.assigned_name = assigned_name;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = Some(deadline);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_strings_round_trip() {
        for status in [
            TaskStatus::Open,
            TaskStatus::InProgress,
            TaskStatus::WaitingClient,
            TaskStatus::Closed,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(TaskStatus::parse("open"), None);
    }

    #[test]
    fn create_defaults_status_and_details() {
        let task = CreateTaskPayload {
            title: "  Fix login  ".to_string(),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap();

        assert_eq!(task.title, "Fix login");
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.details, "");
        assert_eq!(task.assigned_id, None);
        assert!(task.attachments.is_empty());
    }

    #[test]
    fn create_rejects_blank_titles() {
        let err = CreateTaskPayload {
            title: "   ".to_string(),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn create_assigns_distinct_ids() {
        let a = CreateTaskPayload {
            title: "a".into(),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap();
        let b = CreateTaskPayload {
            title: "b".into(),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn apply_merges_and_preserves_identity() {
        let mut task = CreateTaskPayload {
            title: "Original".into(),
            assigned_id: Some("e1".into()),
            assigned_name: Some("Ann".into()),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap();
        let id = task.id.clone();
        let created_at = task.created_at;

        task.apply(UpdateTaskPayload {
            title: Some("Renamed".into()),
            status: Some(TaskStatus::Closed),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(task.id, id);
        assert_eq!(task.created_at, created_at);
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.status, TaskStatus::Closed);
        // untouched fields survive
        assert_eq!(task.assigned_id.as_deref(), Some("e1"));
        assert_eq!(task.assigned_name, "Ann");
    }

    #[test]
    fn apply_clears_assignment_on_empty_id() {
        let mut task = CreateTaskPayload {
            title: "t".into(),
            assigned_id: Some("e1".into()),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap();

        task.apply(UpdateTaskPayload {
            assigned_id: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(task.assigned_id, None);
    }

    #[test]
    fn apply_rejects_blank_title_without_side_effects() {
        let mut task = CreateTaskPayload {
            title: "Keep me".into(),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap();

        let err = task
            .apply(UpdateTaskPayload {
                title: Some("  ".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(task.title, "Keep me");
    }
}
