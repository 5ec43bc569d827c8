use chrono::{Local, NaiveDate};

use crate::tasks::model::{Task, TaskStatus};

/// Conjunctive task filter. Absent dimensions match everything; provided
/// ones must all hold. Evaluated synchronously over the full in-memory
/// snapshot on every change.
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assigned_id: Option<String>,
    /// Calendar day (local time) the task was created.
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring over title, details and assignee name.
    pub text: Option<String>,
}

impl TaskFilter {
    /// Build from query-string values; blank strings mean "match all".
    pub fn from_query(
        status: Option<&str>,
        assigned: Option<&str>,
        date: Option<&str>,
        text: Option<&str>,
    ) -> Self {
        Self {
            status: status
                .filter(|s| !s.is_empty())
                .and_then(TaskStatus::parse),
            assigned_id: assigned
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            date: date
                .filter(|s| !s.is_empty())
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
            text: text
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.assigned_id.is_none()
            && self.date.is_none()
            && self.text.is_none()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(assigned_id) = &self.assigned_id {
            if task.assigned_id.as_deref() != Some(assigned_id.as_str()) {
                return false;
            }
        }
        if let Some(date) = self.date {
            if task.created_at.with_timezone(&Local).date_naive() != date {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hay = format!("{} {} {}", task.title, task.details, task.assigned_name)
                .to_lowercase();
            if !hay.contains(&needle) {
                return false;
            }
        }
        true
    }

    /// Filter and order a snapshot: visible tasks, newest-created first.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let mut visible: Vec<Task> = tasks.iter().filter(|t| self.matches(t)).cloned().collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::model::CreateTaskPayload;
    use chrono::Utc;

    fn task(title: &str, status: TaskStatus, assigned_id: &str, assigned_name: &str) -> Task {
        CreateTaskPayload {
            title: title.to_string(),
            assigned_id: Some(assigned_id.to_string()),
            assigned_name: Some(assigned_name.to_string()),
            status: Some(status),
            ..Default::default()
        }
        .into_task(Utc::now())
        .unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = TaskFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&task("a", TaskStatus::Closed, "e9", "Zoe")));
    }

    #[test]
    fn predicates_compose_conjunctively() {
        let a = task("A", TaskStatus::Open, "e1", "Ann");
        let b = task("B", TaskStatus::Closed, "e1", "Ann");
        let c = task("C", TaskStatus::Open, "e2", "Ben");

        let filter = TaskFilter {
            status: Some(TaskStatus::Open),
            assigned_id: Some("e1".to_string()),
            ..Default::default()
        };

        let visible = filter.apply(&[a.clone(), b, c]);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, a.id);
    }

    #[test]
    fn text_searches_title_details_and_assignee() {
        let mut t = task("Deploy site", TaskStatus::Open, "e1", "Ann Chu");
        t.details = "waiting on DNS".to_string();

        for needle in ["deploy", "dns", "ann chu"] {
            let filter = TaskFilter {
                text: Some(needle.to_string()),
                ..Default::default()
            };
            assert!(filter.matches(&t), "expected match on {:?}", needle);
        }

        let filter = TaskFilter {
            text: Some("billing".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&t));
    }

    #[test]
    fn date_matches_the_local_calendar_day_of_creation() {
        let t = task("today", TaskStatus::Open, "e1", "Ann");
        let today = t.created_at.with_timezone(&Local).date_naive();

        let filter = TaskFilter {
            date: Some(today),
            ..Default::default()
        };
        assert!(filter.matches(&t));

        let filter = TaskFilter {
            date: Some(today.pred_opt().unwrap()),
            ..Default::default()
        };
        assert!(!filter.matches(&t));
    }

    #[test]
    fn from_query_treats_blanks_as_match_all() {
        let filter = TaskFilter::from_query(Some(""), Some(""), Some(""), Some("  "));
        assert!(filter.is_empty());

        let filter = TaskFilter::from_query(
            Some("In-progress"),
            Some("e1"),
            Some("2026-03-04"),
            Some("dns"),
        );
        assert_eq!(filter.status, Some(TaskStatus::InProgress));
        assert_eq!(filter.assigned_id.as_deref(), Some("e1"));
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2026, 3, 4));
        assert_eq!(filter.text.as_deref(), Some("dns"));
    }

    #[test]
    fn apply_orders_newest_first() {
        let mut older = task("older", TaskStatus::Open, "e1", "Ann");
        older.created_at = Utc::now() - chrono::Duration::days(1);
        let newer = task("newer", TaskStatus::Open, "e1", "Ann");

        let visible = TaskFilter::default().apply(&[older, newer.clone()]);
        assert_eq!(visible[0].id, newer.id);
    }
}
