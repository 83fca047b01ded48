//! TaskRepository port - タスクの永続化
//!
//! SQL スキーマや行マッピングは core の外側。core はこの trait だけを見る。
//!
//! `observe_*` は「現在の結果を 1 回流し、以後は変更のたびに流し直す」ストリームを返す。
//! ストリームが `Err` を流したら、その購読は終わりとみなす。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use super::RepositoryError;
use crate::domain::{InstantRange, Task, TaskId};

/// 観測ストリームの型
pub type TaskListStream = BoxStream<'static, Result<Vec<Task>, RepositoryError>>;

#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    /// `due_at < instant` のタスク（期限なしは含まない）
    fn observe_tasks_due_before(&self, instant: DateTime<Utc>) -> TaskListStream;

    /// `range.start <= due_at <= range.end` のタスク。空範囲なら常に空リスト。
    fn observe_tasks_due_between(&self, range: InstantRange) -> TaskListStream;

    async fn create_task(&self, task: Task) -> Result<(), RepositoryError>;

    async fn update_task(&self, task: Task) -> Result<(), RepositoryError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), RepositoryError>;

    /// まとめて削除する。存在しない id は無視する。
    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), RepositoryError>;

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;
}
