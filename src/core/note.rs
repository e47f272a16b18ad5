use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub user_id: String,
    /// Free-text tags, kept in insertion order. Duplicates are allowed.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u64,
}

/// Fields a caller supplies when creating a note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub color: Option<String>,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a note. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub user_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub is_archived: Option<bool>,
    pub color: Option<Option<String>>,
}

impl Note {
    pub fn from_draft(id: String, draft: NewNote, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            user_id: draft.user_id,
            tags: draft.tags,
            is_pinned: draft.is_pinned,
            is_archived: draft.is_archived,
            color: draft.color,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            access_count: 0,
        }
    }

    /// Shallow-merge `patch` into this note. Does not touch timestamps.
    pub fn apply(&mut self, patch: NotePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(is_pinned) = patch.is_pinned {
            self.is_pinned = is_pinned;
        }
        if let Some(is_archived) = patch.is_archived {
            self.is_archived = is_archived;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }

    /// Record an open of this note. `last_accessed_at` only moves forward.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count += 1;
        self.last_accessed_at = self.last_accessed_at.max(now);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
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
    fn draft_starts_with_zeroed_counters() {
        let draft = NewNote {
            tags: vec!["home".into(), "home".into()],
            ..NewNote::new("Groceries", "milk, eggs")
        };
        let note = Note::from_draft("n1".into(), draft, at(0));
        assert_eq!(note.created_at, note.updated_at);
        assert_eq!(note.created_at, note.last_accessed_at);
        assert_eq!(note.access_count, 0);
        assert_eq!(note.tags, vec!["home", "home"]);
    }

    #[test]
    fn patch_keeps_unspecified_fields() {
        let draft = NewNote {
            color: Some("yellow".into()),
            ..NewNote::new("Groceries", "milk, eggs")
        };
        let mut note = Note::from_draft("n1".into(), draft, at(0));
        note.apply(NotePatch {
            content: Some("milk, eggs, bread".into()),
            ..NotePatch::default()
        });
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "milk, eggs, bread");
        assert_eq!(note.color.as_deref(), Some("yellow"));

        note.apply(NotePatch {
            color: Some(None),
            ..NotePatch::default()
        });
        assert_eq!(note.color, None);
    }

    #[test]
    fn touch_never_moves_access_time_backwards() {
        let mut note = Note::from_draft("n1".into(), NewNote::new("a", "b"), at(100));
        note.touch(at(50));
        assert_eq!(note.access_count, 1);
        assert_eq!(note.last_accessed_at, at(100));

        note.touch(at(200));
        assert_eq!(note.access_count, 2);
        assert_eq!(note.last_accessed_at, at(200));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let note = Note::from_draft("n1".into(), NewNote::new("a", "b"), at(0));
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["isPinned"], false);
        assert_eq!(json["accessCount"], 0);
        assert!(json["lastAccessedAt"].is_string());
        assert!(json.get("color").is_none());
    }
}
