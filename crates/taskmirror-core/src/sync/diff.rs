//! Minimal update patches from edited form values
//!
//! The edit form hands us the values the user ended up with; [`diff`] compares
//! them against the last-known-good item and emits only the fields that
//! changed. Unchanged fields must stay out of the patch: the server leaves an
//! omitted field alone but treats a present empty value as a clear, so a
//! spurious field would overwrite a concurrent change made elsewhere.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

use super::command::{DuePatch, UpdateItemArgs};
use super::error::{SyncError, SyncResult};
use crate::models::{DueDate, DueMoment, Item, Priority};

/// Converts between the user's wall-clock time and UTC
pub trait TimeZoneProvider: Send + Sync {
    /// `None` when the local time does not exist (DST gap)
    fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>>;

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime;
}

/// The system's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeZone;

impl TimeZoneProvider for SystemTimeZone {
    fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        Local
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&Local).naive_local()
    }
}

/// A fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeZone(pub FixedOffset);

impl FixedTimeZone {
    /// Offset east of UTC in hours; out-of-range values fall back to UTC
    pub fn hours(hours: i32) -> Self {
        Self(FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix()))
    }
}

impl TimeZoneProvider for FixedTimeZone {
    fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.0
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.0).naive_local()
    }
}

/// Due date as entered in the edit form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DueDateInput {
    /// False when the user picked "no due date"
    pub has_due_date: bool,
    /// Absolute date (and time, if `include_time`) in local wall-clock time
    pub absolute: Option<NaiveDateTime>,
    pub include_time: bool,
    /// Natural-language override; wins over `absolute` when non-empty
    pub human_input: String,
}

impl DueDateInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn natural(text: impl Into<String>) -> Self {
        Self {
            has_due_date: true,
            human_input: text.into(),
            ..Self::default()
        }
    }

    pub fn date(date: NaiveDate) -> Self {
        Self {
            has_due_date: true,
            absolute: Some(date.and_time(NaiveTime::MIN)),
            ..Self::default()
        }
    }

    pub fn date_time(local: NaiveDateTime) -> Self {
        Self {
            has_due_date: true,
            absolute: Some(local),
            include_time: true,
            ..Self::default()
        }
    }

    /// Form state for an existing due date
    ///
    /// Recurring dates and strings that do not carry a parseable date are
    /// shown as natural language so the recurrence survives an edit.
    pub fn from_due(due: Option<&DueDate>, tz: &dyn TimeZoneProvider) -> Self {
        let Some(due) = due else {
            return Self::none();
        };
        if due.is_recurring && !due.string.is_empty() {
            return Self::natural(due.string.clone());
        }
        match due.moment() {
            Some(DueMoment::Date(date)) => Self::date(date),
            Some(DueMoment::Floating(local)) => Self::date_time(local),
            Some(DueMoment::Instant(instant)) => Self::date_time(tz.to_local(instant)),
            None if !due.string.is_empty() => Self::natural(due.string.clone()),
            None => Self::none(),
        }
    }

    /// The due date this input asks for, `None` for "no due date"
    ///
    /// Natural language wins; otherwise a date-time is normalized to a UTC
    /// instant and a plain date is sent as `YYYY-MM-DD`.
    pub fn to_due_date(&self, tz: &dyn TimeZoneProvider) -> SyncResult<Option<DueDate>> {
        if !self.has_due_date {
            return Ok(None);
        }
        let human = self.human_input.trim();
        if !human.is_empty() {
            return Ok(Some(DueDate::natural(human)));
        }
        let Some(absolute) = self.absolute else {
            return Err(SyncError::validation("due date selected but no date given"));
        };
        if self.include_time {
            let instant = tz.to_utc(absolute).ok_or_else(|| {
                SyncError::validation(format!("{} does not exist in the local timezone", absolute))
            })?;
            Ok(Some(DueDate::at(instant)))
        } else {
            Ok(Some(DueDate::on(absolute.date())))
        }
    }
}

/// Field values of the task edit form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemForm {
    pub content: String,
    pub description: String,
    pub labels: Vec<String>,
    /// `None` when no priority is selected
    pub priority: Option<Priority>,
    pub due: DueDateInput,
    /// Explicitly remove an existing due date when `due` has none
    pub clear_due: bool,
}

impl ItemForm {
    /// Form prefilled with the item's current values
    pub fn from_item(item: &Item, tz: &dyn TimeZoneProvider) -> Self {
        Self {
            content: item.content.clone(),
            description: item.description.clone(),
            labels: item.labels.clone(),
            priority: Some(item.priority),
            due: DueDateInput::from_due(item.due.as_ref(), tz),
            clear_due: false,
        }
    }
}

/// Compute the update patch turning `baseline` into `edited`
///
/// The result always carries the item ID; every other field is present only
/// if it changed.
pub fn diff(
    baseline: &Item,
    edited: &ItemForm,
    tz: &dyn TimeZoneProvider,
) -> SyncResult<UpdateItemArgs> {
    if baseline.id.is_empty() {
        return Err(SyncError::validation(
            "task ID not specified when trying to update task",
        ));
    }

    let mut args = UpdateItemArgs::new(baseline.id.clone());

    if edited.content != baseline.content {
        if edited.content.trim().is_empty() {
            return Err(SyncError::validation("cannot clear the content of a task"));
        }
        args.content = Some(edited.content.clone());
    }

    if edited.description != baseline.description {
        args.description = Some(edited.description.clone());
    }

    // A prefilled due date the user left alone stays out of the patch;
    // anything else is sent, since natural language is resolved again
    let untouched =
        !edited.clear_due && edited.due == DueDateInput::from_due(baseline.due.as_ref(), tz);
    if !untouched {
        args.due = match edited.due.to_due_date(tz)? {
            Some(wanted) => Some(DuePatch::Set(wanted)),
            None if edited.clear_due && baseline.due.is_some() => Some(DuePatch::Clear),
            None => None,
        };
    }

    if !equal_label_sets(&edited.labels, &baseline.labels) {
        args.labels = Some(edited.labels.clone());
    }

    args.priority = match edited.priority {
        Some(priority) if priority.value() != baseline.priority.value() => Some(priority),
        _ => None,
    };

    Ok(args)
}

/// Multiset equality: same elements with the same multiplicities, any order
pub fn equal_label_sets<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&T, i64> = HashMap::with_capacity(a.len());
    for label in a {
        *counts.entry(label).or_default() += 1;
    }
    for label in b {
        match counts.get_mut(label) {
            Some(n) if *n > 0 => *n -= 1,
            _ => return false,
        }
    }
    counts.values().all(|n| *n == 0)
}
