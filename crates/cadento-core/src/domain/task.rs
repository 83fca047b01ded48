//! Task entity and status.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::TaskId;
use super::names::{TaskDescription, TaskName, TaskTag};

/// Statuses every installation ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTaskStatus {
    Planned,
    InProgress,
    Paused,
    Done,
}

impl BuiltinTaskStatus {
    /// Builtin statuses occupy the reserved negative id range -1..=-4.
    pub fn reserved_id(self) -> i64 {
        match self {
            BuiltinTaskStatus::Planned => -1,
            BuiltinTaskStatus::InProgress => -2,
            BuiltinTaskStatus::Paused => -3,
            BuiltinTaskStatus::Done => -4,
        }
    }
}

/// Id of a user-defined status. Must be >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TaskStatusId(i64);

impl TaskStatusId {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value < 0 {
            return Err(ValidationError::out_of_range(
                "task status id",
                format!("{value} is inside the reserved negative range"),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for TaskStatusId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskStatusId> for i64 {
    fn from(value: TaskStatusId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TaskStatus {
    Builtin(BuiltinTaskStatus),
    Custom(TaskStatusId),
}

impl TaskStatus {
    pub fn id(self) -> i64 {
        match self {
            TaskStatus::Builtin(status) => status.reserved_id(),
            TaskStatus::Custom(id) => id.value(),
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Builtin(BuiltinTaskStatus::Done))
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Builtin(BuiltinTaskStatus::Planned)
    }
}

/// A task.
///
/// Tasks without `due_at` never show up in the soon-due buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: TaskName,
    pub description: TaskDescription,
    pub created_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub tags: BTreeSet<TaskTag>,
}

impl Task {
    pub fn new(id: TaskId, name: TaskName, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            description: TaskDescription::empty(),
            created_at,
            due_at: None,
            status: TaskStatus::default(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: TaskDescription) -> Self {
        self.description = description;
        self
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_tag(mut self, tag: TaskTag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Is the task due strictly after `instant`?
    pub fn is_due_after(&self, instant: DateTime<Utc>) -> bool {
        self.due_at.is_some_and(|due| due > instant)
    }
}

/// Input for creating a task. The id and creation time are assigned by the use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub name: TaskName,
    pub description: TaskDescription,
    pub due_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub tags: BTreeSet<TaskTag>,
}

impl NewTask {
    pub fn new(name: TaskName) -> Self {
        Self {
            name,
            description: TaskDescription::empty(),
            due_at: None,
            status: TaskStatus::default(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: TaskDescription) -> Self {
        self.description = description;
        self
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_tag(mut self, tag: TaskTag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn into_task(self, id: TaskId, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            name: self.name,
            description: self.description,
            created_at,
            due_at: self.due_at,
            status: self.status,
            tags: self.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    #[test]
    fn custom_status_ids_must_be_non_negative() {
        assert!(TaskStatusId::new(0).is_ok());
        assert!(TaskStatusId::new(42).is_ok());
        assert!(TaskStatusId::new(-1).is_err());
    }

    #[test]
    fn builtin_ids_are_reserved_and_distinct() {
        let ids = [
            BuiltinTaskStatus::Planned,
            BuiltinTaskStatus::InProgress,
            BuiltinTaskStatus::Paused,
            BuiltinTaskStatus::Done,
        ]
        .map(|s| TaskStatus::Builtin(s).id());
        assert_eq!(ids, [-1, -2, -3, -4]);
    }

    #[test]
    fn is_due_after_is_strict() {
        let due = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let task = Task::new(
            TaskId::from_ulid(Ulid::new()),
            TaskName::new("Report").unwrap(),
            due,
        )
        .with_due_at(due);

        assert!(task.is_due_after(due - chrono::Duration::seconds(1)));
        assert!(!task.is_due_after(due));
    }

    #[test]
    fn tags_are_a_set() {
        let task = Task::new(
            TaskId::from_ulid(Ulid::new()),
            TaskName::new("Report").unwrap(),
            Utc::now(),
        )
        .with_tag(TaskTag::new("work").unwrap())
        .with_tag(TaskTag::new("work").unwrap());
        assert_eq!(task.tags.len(), 1);
    }
}
