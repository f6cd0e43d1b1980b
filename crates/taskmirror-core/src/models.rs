//! Data models for taskmirror
//!
//! Defines the entities mirrored from the task service: Item (a task),
//! Project and Label, plus the due-date and priority value types they carry.
//! Field names follow the wire format of the sync endpoint so the same types
//! decode responses and persist snapshots.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of an all-day due date
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of a floating (timezone-less) due date-time
pub const FLOATING_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A task, called an "item" by the sync protocol
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Item {
    /// Server-assigned identifier
    pub id: String,
    /// Owner of the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Project containing the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Task title, may contain markdown
    pub content: String,
    /// Longer description, may contain markdown
    pub description: String,
    /// Due date, if any
    pub due: Option<DueDate>,
    /// API priority, 4 is the most urgent
    pub priority: Priority,
    /// Parent task for sub-tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Position among siblings
    pub child_order: i64,
    /// Section inside the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    /// Position in the Today/Next 7 days views
    pub day_order: i64,
    /// Whether sub-tasks are collapsed
    pub collapsed: bool,
    /// Label names attached to the task
    pub labels: Vec<String>,
    /// Whether the task is completed
    pub checked: bool,
    /// Soft-delete flag
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Estimated duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<ItemDuration>,
}

impl Item {
    /// Create an item with the given ID and content (mostly useful in tests)
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Whether the task should be shown as open work
    pub fn is_active(&self) -> bool {
        !self.is_deleted && !self.checked
    }

    /// Whether the task carries the given label
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

/// Estimated task duration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemDuration {
    /// Positive amount of `unit`
    pub amount: u32,
    /// Either `minute` or `day`
    pub unit: String,
}

/// A project grouping tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Color name from the service palette
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub child_order: i64,
    pub collapsed: bool,
    pub shared: bool,
    pub is_deleted: bool,
    pub is_archived: bool,
    pub is_favorite: bool,
    /// Set on the user's Inbox project only
    pub inbox_project: bool,
    /// `list` or `board`
    pub view_style: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Not deleted and not archived
    pub fn is_active(&self) -> bool {
        !self.is_deleted && !self.is_archived
    }
}

/// A personal label
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    pub item_order: i64,
    pub is_deleted: bool,
    pub is_favorite: bool,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Due date as exchanged with the server
///
/// Only one of `date` or `string` is meaningful when the client sends a due
/// date: `string` is natural language interpreted server-side, `date` is
/// either `YYYY-MM-DD` or an RFC 3339 instant. The server fills in both when
/// it returns a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DueDate {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// A due date after parsing its `date` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueMoment {
    /// All-day date
    Date(NaiveDate),
    /// Date-time without a timezone, interpreted in the user's local zone
    Floating(NaiveDateTime),
    /// Fixed instant
    Instant(DateTime<Utc>),
}

impl DueDate {
    /// Natural-language due date ("tomorrow", "every monday")
    pub fn natural(text: impl Into<String>) -> Self {
        Self {
            string: text.into(),
            ..Self::default()
        }
    }

    /// All-day due date
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date: date.format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// Due at a fixed instant, rendered as RFC 3339 in UTC
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            date: instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ..Self::default()
        }
    }

    /// Parse the `date` field
    pub fn moment(&self) -> Option<DueMoment> {
        if self.date.is_empty() {
            return None;
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(DueMoment::Instant(instant.with_timezone(&Utc)));
        }
        if let Ok(floating) = NaiveDateTime::parse_from_str(&self.date, FLOATING_DATETIME_FORMAT) {
            return Some(DueMoment::Floating(floating));
        }
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .ok()
            .map(DueMoment::Date)
    }
}

/// Task priority as the API encodes it
///
/// The API counts upwards (4 is very urgent) while clients label the most
/// urgent priority "P1". `Display` renders the client label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const P1: Priority = Priority(4);
    pub const P2: Priority = Priority(3);
    pub const P3: Priority = Priority(2);
    pub const P4: Priority = Priority(1);

    /// All priorities, most urgent first
    pub const ALL: [Priority; 4] = [Self::P1, Self::P2, Self::P3, Self::P4];

    /// Build from the API value (1..=4)
    pub fn new(value: u8) -> Option<Self> {
        (1..=4).contains(&value).then_some(Self(value))
    }

    /// Parse a client label such as "p1" or "P3"
    pub fn from_label(label: &str) -> Option<Self> {
        let rest = label.strip_prefix(['p', 'P'])?;
        let n: u8 = rest.parse().ok()?;
        (1..=4).contains(&n).then(|| Self(5 - n))
    }

    /// The API value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether the value is inside the range the API accepts
    pub fn is_valid(self) -> bool {
        (1..=4).contains(&self.0)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::P4
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", 5u8.saturating_sub(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_decodes_sparse_json() {
        let item: Item = serde_json::from_str(r#"{"id": "1", "content": "test item"}"#).unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.content, "test item");
        assert_eq!(item.priority, Priority::P4);
        assert!(item.due.is_none());
        assert!(item.is_active());
    }

    #[test]
    fn test_item_decodes_null_references() {
        let json = r#"{
            "id": "2995104339",
            "project_id": "2203306141",
            "content": "Buy Milk",
            "parent_id": null,
            "section_id": null,
            "priority": 4,
            "labels": ["Food", "Shopping"],
            "due": {"date": "2016-09-01", "is_recurring": false, "string": "tomorrow", "lang": "en", "timezone": null},
            "added_at": "2014-09-26T08:25:05.000000Z",
            "some_future_field": 12
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.project_id.as_deref(), Some("2203306141"));
        assert!(item.parent_id.is_none());
        assert_eq!(item.priority, Priority::P1);
        assert!(item.has_label("Food"));
        assert_eq!(item.due.unwrap().string, "tomorrow");
        assert!(item.added_at.is_some());
    }

    #[test]
    fn test_project_active() {
        let mut project = Project::new("1", "Inbox");
        assert!(project.is_active());
        project.is_archived = true;
        assert!(!project.is_active());
    }

    #[test]
    fn test_due_date_moment() {
        let day = DueDate::on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(day.date, "2024-03-01");
        assert!(matches!(day.moment(), Some(DueMoment::Date(_))));

        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let at = DueDate::at(instant);
        assert_eq!(at.date, "2024-03-01T14:00:00Z");
        assert_eq!(at.moment(), Some(DueMoment::Instant(instant)));

        let floating = DueDate {
            date: "2024-03-01T09:30:00".to_string(),
            ..DueDate::default()
        };
        assert!(matches!(floating.moment(), Some(DueMoment::Floating(_))));

        assert_eq!(DueDate::natural("tomorrow").moment(), None);
    }

    #[test]
    fn test_due_date_patch_serialization() {
        let json = serde_json::to_string(&DueDate::natural("tomorrow")).unwrap();
        assert_eq!(json, r#"{"string":"tomorrow"}"#);

        let json = serde_json::to_string(&DueDate::on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
            .unwrap();
        assert_eq!(json, r#"{"date":"2024-03-01"}"#);
    }

    #[test]
    fn test_priority_labels() {
        assert_eq!(Priority::P1.value(), 4);
        assert_eq!(Priority::P1.to_string(), "P1");
        assert_eq!(Priority::P4.to_string(), "P4");
        assert_eq!(Priority::from_label("p2"), Some(Priority::P2));
        assert_eq!(Priority::from_label("P5"), None);
        assert_eq!(Priority::from_label("high"), None);
        assert_eq!(Priority::new(0), None);
        assert_eq!(Priority::new(3), Some(Priority::P2));
    }

    #[test]
    fn test_priority_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Priority::P1).unwrap(), "4");
        let p: Priority = serde_json::from_str("2").unwrap();
        assert_eq!(p, Priority::P3);
    }
}
