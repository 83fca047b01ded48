//! InMemoryTaskRepository - 開発・テスト用のタスク保存先
//!
//! # 実装詳細
//! - `watch::Sender<HashMap<TaskId, Task>>` がスナップショット全体を持つ
//! - 書き込みは `send_if_modified` で行い、購読者に変更を通知する
//! - `observe_*` は watch の receiver を射影したストリーム（結果が変わったときだけ流す）

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::watch_stream::watch_stream;
use crate::domain::{InstantRange, Task, TaskId};
use crate::ports::{RepositoryError, TaskListStream, TaskRepository};

pub struct InMemoryTaskRepository {
    tasks: watch::Sender<HashMap<TaskId, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        let (tasks, _) = watch::channel(HashMap::new());
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// 開いている observe ストリームの数
    pub fn observer_count(&self) -> usize {
        self.tasks.receiver_count()
    }

    fn observe_matching<F>(&self, mut predicate: F) -> TaskListStream
    where
        F: FnMut(DateTime<Utc>) -> bool + Send + 'static,
    {
        watch_stream(self.tasks.subscribe(), move |tasks: &HashMap<TaskId, Task>| {
            let mut matching: Vec<Task> = tasks
                .values()
                .filter(|task| task.due_at.is_some_and(&mut predicate))
                .cloned()
                .collect();
            // 期限順、同じなら作成順
            matching.sort_by_key(|task| (task.due_at, task.created_at, task.id.as_ulid()));
            matching
        })
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    fn observe_tasks_due_before(&self, instant: DateTime<Utc>) -> TaskListStream {
        self.observe_matching(move |due| due < instant)
    }

    fn observe_tasks_due_between(&self, range: InstantRange) -> TaskListStream {
        self.observe_matching(move |due| range.contains(due))
    }

    async fn create_task(&self, task: Task) -> Result<(), RepositoryError> {
        let mut result = Ok(());
        self.tasks.send_if_modified(|tasks| {
            if tasks.contains_key(&task.id) {
                result = Err(RepositoryError::AlreadyExists(task.id.to_string()));
                return false;
            }
            tasks.insert(task.id, task);
            true
        });
        result
    }

    async fn update_task(&self, task: Task) -> Result<(), RepositoryError> {
        let mut result = Ok(());
        self.tasks.send_if_modified(|tasks| match tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => {
                result = Err(RepositoryError::NotFound(task.id.to_string()));
                false
            }
        });
        result
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), RepositoryError> {
        let mut result = Ok(());
        self.tasks.send_if_modified(|tasks| {
            if tasks.remove(&id).is_none() {
                result = Err(RepositoryError::NotFound(id.to_string()));
                return false;
            }
            true
        });
        result
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), RepositoryError> {
        self.tasks.send_if_modified(|tasks| {
            let before = tasks.len();
            for id in ids {
                tasks.remove(id);
            }
            tasks.len() != before
        });
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.borrow().get(&id).cloned())
    }
}
