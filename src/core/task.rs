use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{other}' (expected low, medium or high)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub user_id: String,
    pub is_completed: bool,
    pub priority: Priority,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "due_date_format"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields a caller supplies when creating a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub user_id: String,
    pub is_completed: bool,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub is_pinned: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a task. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub user_id: Option<String>,
    pub is_completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
}

impl Task {
    pub fn from_draft(id: String, draft: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            user_id: draft.user_id,
            is_completed: draft.is_completed,
            priority: draft.priority,
            due_date: draft.due_date,
            tags: draft.tags,
            is_pinned: draft.is_pinned,
            created_at: now,
            updated_at: now,
            completed_at: draft.is_completed.then_some(now),
        }
    }

    /// Shallow-merge `patch` into this task. Does not touch timestamps.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
        if let Some(is_completed) = patch.is_completed {
            self.is_completed = is_completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(is_pinned) = patch.is_pinned {
            self.is_pinned = is_pinned;
        }
    }

    /// Flip completion. Completing stamps `completed_at`; un-completing clears it.
    pub fn toggle_complete(&mut self, now: DateTime<Utc>) {
        self.is_completed = !self.is_completed;
        self.completed_at = if self.is_completed { Some(now) } else { None };
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Due dates are written as `YYYY-MM-DD`. Older blobs stored them as full
/// RFC 3339 timestamps, which are accepted and reduced to their UTC date.
mod due_date_format {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if let Ok(date) = NaiveDate::parse_from_str(&raw, FORMAT) {
            return Ok(Some(date));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc).date_naive()))
            .map_err(|_| D::Error::custom(format!("invalid due date '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("low".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn completed_draft_gets_completion_stamp() {
        let draft = NewTask {
            is_completed: true,
            ..NewTask::new("Already done")
        };
        let task = Task::from_draft("t1".into(), draft, at(0));
        assert_eq!(task.completed_at, Some(at(0)));

        let pending = Task::from_draft("t2".into(), NewTask::new("Todo"), at(0));
        assert_eq!(pending.completed_at, None);
        assert_eq!(pending.priority, Priority::Medium);
    }

    #[test]
    fn toggle_complete_sets_and_clears_stamp() {
        let mut task = Task::from_draft("t1".into(), NewTask::new("Pay rent"), at(0));
        task.toggle_complete(at(10));
        assert!(task.is_completed);
        assert_eq!(task.completed_at, Some(at(10)));

        task.toggle_complete(at(20));
        assert!(!task.is_completed);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn patch_can_clear_optional_fields() {
        let draft = NewTask {
            description: Some("first of the month".into()),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..NewTask::new("Pay rent")
        };
        let mut task = Task::from_draft("t1".into(), draft, at(0));
        task.apply(TaskPatch {
            description: Some(None),
            priority: Some(Priority::High),
            ..TaskPatch::default()
        });
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(task.title, "Pay rent");
    }

    #[test]
    fn due_date_written_as_plain_date() {
        let draft = NewTask {
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..NewTask::new("Pay rent")
        };
        let task = Task::from_draft("t1".into(), draft, at(0));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["dueDate"], "2024-01-01");
        assert_eq!(json["isCompleted"], false);
        assert!(json.get("completedAt").is_none());
    }

    #[test]
    fn legacy_timestamp_due_date_is_accepted() {
        let json = r#"{
            "id": "abc123xyz",
            "title": "Pay rent",
            "userId": "demo-user",
            "isCompleted": false,
            "priority": "high",
            "dueDate": "2024-01-01T00:00:00.000Z",
            "tags": [],
            "isPinned": false,
            "createdAt": "2023-12-30T10:00:00.000Z",
            "updatedAt": "2023-12-30T10:00:00.000Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn garbage_due_date_is_rejected() {
        let json = r#"{
            "id": "x", "title": "t", "userId": "u", "isCompleted": false,
            "priority": "low", "dueDate": "next tuesday",
            "createdAt": "2023-12-30T10:00:00Z", "updatedAt": "2023-12-30T10:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Task>(json).is_err());
    }
}
