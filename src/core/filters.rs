use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::note::Note;
use super::task::{Priority, Task};

/// Which collections a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    Notes,
    Tasks,
}

impl Scope {
    pub fn includes_notes(&self) -> bool {
        matches!(self, Self::All | Self::Notes)
    }

    pub fn includes_tasks(&self) -> bool {
        matches!(self, Self::All | Self::Tasks)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Notes => "notes",
            Self::Tasks => "tasks",
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "notes" => Ok(Self::Notes),
            "tasks" => Ok(Self::Tasks),
            other => Err(format!("unknown scope '{other}' (expected all, notes or tasks)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Completed,
    Pending,
    Archived,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "pending" => Ok(Self::Pending),
            "archived" => Ok(Self::Archived),
            other => Err(format!(
                "unknown status '{other}' (expected completed, pending or archived)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The last search the user ran. Persisted, but not domain data.
///
/// `date_range` is carried and persisted but not consulted by the filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub query: String,
    #[serde(default, rename = "type")]
    pub scope: Scope,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusFilter>,
}

/// Partial update for [`SearchFilters`]. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFiltersPatch {
    pub query: Option<String>,
    pub scope: Option<Scope>,
    pub tags: Option<Vec<String>>,
    pub date_range: Option<Option<DateRange>>,
    pub priority: Option<Option<Priority>>,
    pub status: Option<Option<StatusFilter>>,
}

impl SearchFilters {
    pub fn apply(&mut self, patch: SearchFiltersPatch) {
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(scope) = patch.scope {
            self.scope = scope;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(date_range) = patch.date_range {
            self.date_range = date_range;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches_note(&self, note: &Note) -> bool {
        if !self.scope.includes_notes() {
            return false;
        }
        if note.is_archived && self.status != Some(StatusFilter::Archived) {
            return false;
        }
        if !self.query.is_empty() {
            let query = self.query.to_lowercase();
            if !contains_folded(&note.title, &query) && !contains_folded(&note.content, &query) {
                return false;
            }
        }
        self.tags_intersect(&note.tags)
    }

    pub fn matches_task(&self, task: &Task) -> bool {
        if !self.scope.includes_tasks() {
            return false;
        }
        match self.status {
            Some(StatusFilter::Completed) if !task.is_completed => return false,
            Some(StatusFilter::Pending) if task.is_completed => return false,
            _ => {}
        }
        if !self.query.is_empty() {
            let query = self.query.to_lowercase();
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| contains_folded(d, &query));
            if !contains_folded(&task.title, &query) && !in_description {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        self.tags_intersect(&task.tags)
    }

    // An empty tag filter matches everything.
    fn tags_intersect(&self, tags: &[String]) -> bool {
        self.tags.is_empty() || self.tags.iter().any(|t| tags.contains(t))
    }
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}
