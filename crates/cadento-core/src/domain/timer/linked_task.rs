//! LinkedTimerTask - Timer に紐づけたタスクのスナップショット

use chrono::{DateTime, Utc};

use crate::domain::ids::TaskId;
use crate::domain::names::TaskName;
use crate::domain::task::Task;

/// Timer にぶら下げるタスク情報
///
/// Task 本体ではなく、リンク時点のスナップショットを保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedTimerTask {
    pub task_id: TaskId,
    pub name: TaskName,
    pub created_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
}

impl From<&Task> for LinkedTimerTask {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            name: task.name.clone(),
            created_at: task.created_at,
            due_at: task.due_at,
        }
    }
}
