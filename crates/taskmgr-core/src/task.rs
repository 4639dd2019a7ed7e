use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::countdown::{Countdown, compute_remaining};
use crate::datetime::{created_at_serde, due_date_serde, is_overdue};
use crate::error::TaskError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Millisecond timestamp of the creation instant.
    pub fn from_timestamp(now: DateTime<Utc>) -> Self {
        Self(now.timestamp_millis().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The next candidate id after a collision.
    pub(crate) fn bumped(&self) -> Self {
        match self.0.parse::<i64>() {
            Ok(value) => Self(value.saturating_add(1).to_string()),
            Err(_) => Self(format!("{}-1", self.0)),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
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
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Priority::Low),
            "m" | "med" | "medium" => Ok(Priority::Medium),
            "h" | "high" => Ok(Priority::High),
            _ => Err(TaskError::InvalidPriority(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(
        default,
        with = "due_date_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub completed: bool,

    #[serde(with = "created_at_serde")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Overdue flag shown next to the due date in list views.
    pub fn is_overdue<Z: TimeZone>(&self, now: &DateTime<Z>) -> bool {
        is_overdue(self.due_date, self.completed, now)
    }

    pub fn countdown<Z: TimeZone>(&self, now: &DateTime<Z>) -> Option<Countdown> {
        compute_remaining(self.due_date, self.completed, now)
    }
}

/// User input for a new task, before an id and timestamp are assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        normalize_title(&self.title).map(|_| ())
    }

    pub(crate) fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Result<Task, TaskError> {
        let title = normalize_title(&self.title)?;
        Ok(Task {
            id,
            title,
            description: normalize_description(self.description),
            priority: self.priority,
            due_date: self.due_date,
            completed: false,
            // Stored at millisecond precision.
            created_at: now.trunc_subsecs(3),
        })
    }
}

/// Partial update for an existing task. `None` leaves a field untouched;
/// the nested `Option` on clearable fields distinguishes "clear" from "keep".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    /// Applies the patch, validating first so a rejected patch changes nothing.
    pub(crate) fn apply(self, task: &mut Task) -> Result<(), TaskError> {
        let title = self.title.as_deref().map(normalize_title).transpose()?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = normalize_description(description);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        Ok(())
    }
}

fn normalize_title(raw: &str) -> Result<String, TaskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.filter(|text| !text.trim().is_empty())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{Priority, TaskDraft, TaskId, TaskPatch};
    use crate::error::TaskError;

    #[test]
    fn draft_rejects_blank_title() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let draft = TaskDraft::new("   ");
        assert_eq!(draft.validate(), Err(TaskError::EmptyTitle));
        assert_eq!(
            draft.into_task(TaskId::new("1"), now),
            Err(TaskError::EmptyTitle)
        );
    }

    #[test]
    fn draft_trims_title_and_drops_blank_description() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let task = TaskDraft::new("  Pay rent ")
            .with_description("  ")
            .with_priority(Priority::High)
            .into_task(TaskId::new("1"), now)
            .unwrap();

        assert_eq!(task.title, "Pay rent");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::High);
        assert!(!task.completed);
        assert_eq!(task.created_at, now);
    }

    #[test]
    fn rejected_patch_leaves_task_untouched() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let mut task = TaskDraft::new("Original")
            .into_task(TaskId::new("1"), now)
            .unwrap();
        let before = task.clone();

        let patch = TaskPatch {
            title: Some(String::new()),
            priority: Some(Priority::Low),
            ..TaskPatch::default()
        };
        assert_eq!(patch.apply(&mut task), Err(TaskError::EmptyTitle));
        assert_eq!(task, before);
    }

    #[test]
    fn patch_clears_optional_fields() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let mut task = TaskDraft::new("Write report")
            .with_description("quarterly")
            .with_due_date(due)
            .into_task(TaskId::new("1"), now)
            .unwrap();

        let patch = TaskPatch {
            description: Some(None),
            due_date: Some(None),
            ..TaskPatch::default()
        };
        patch.apply(&mut task).unwrap();

        assert_eq!(task.description, None);
        assert_eq!(task.due_date, None);
        assert_eq!(task.title, "Write report");
    }

    #[test]
    fn priority_parses_short_and_long_forms() {
        assert_eq!("H".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("medium".parse::<Priority>(), Ok(Priority::Medium));
        assert_eq!(" low ".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn bumped_id_increments_numeric_ids() {
        assert_eq!(TaskId::new("1700000000000").bumped().as_str(), "1700000000001");
        assert_eq!(TaskId::new("abc").bumped().as_str(), "abc-1");
    }
}
