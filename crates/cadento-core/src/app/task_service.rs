//! TaskService - タスクのユースケース

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{NewTask, Task, TaskId, TaskStatus};
use crate::ports::{Clock, IdGenerator, RepositoryError, TaskRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskServiceError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct TaskService<R: ?Sized> {
    tasks: Arc<R>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<R: ?Sized> Clone for TaskService<R> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            clock: Arc::clone(&self.clock),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<R> TaskService<R>
where
    R: TaskRepository + ?Sized,
{
    pub fn new(tasks: Arc<R>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { tasks, clock, ids }
    }

    pub async fn create(&self, new_task: NewTask) -> Result<Task, TaskServiceError> {
        let task = new_task.into_task(self.ids.generate_task_id(), self.clock.now());
        self.tasks.create_task(task.clone()).await?;
        debug!(task_id = %task.id, due_at = ?task.due_at, "task created");
        Ok(task)
    }

    pub async fn get(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        self.tasks
            .get_task(id)
            .await?
            .ok_or(TaskServiceError::NotFound(id))
    }

    /// id と作成時刻はそのまま、それ以外を置き換える
    pub async fn update(&self, task: Task) -> Result<Task, TaskServiceError> {
        let existing = self.get(task.id).await?;
        let updated = Task {
            created_at: existing.created_at,
            ..task
        };
        self.tasks
            .update_task(updated.clone())
            .await
            .map_err(|e| not_found_or(e, updated.id))?;
        debug!(task_id = %updated.id, "task updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: TaskId) -> Result<(), TaskServiceError> {
        self.tasks
            .delete_task(id)
            .await
            .map_err(|e| not_found_or(e, id))?;
        debug!(task_id = %id, "task deleted");
        Ok(())
    }

    /// 存在しない id は無視する
    pub async fn delete_many(&self, ids: &[TaskId]) -> Result<(), TaskServiceError> {
        self.tasks.delete_tasks(ids).await?;
        debug!(count = ids.len(), "tasks deleted");
        Ok(())
    }

    pub async fn set_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, TaskServiceError> {
        let task = self.get(id).await?.with_status(status);
        self.tasks
            .update_task(task.clone())
            .await
            .map_err(|e| not_found_or(e, id))?;
        debug!(task_id = %id, status = status.id(), "task status changed");
        Ok(task)
    }
}

fn not_found_or(error: RepositoryError, id: TaskId) -> TaskServiceError {
    match error {
        RepositoryError::NotFound(_) => TaskServiceError::NotFound(id),
        other => TaskServiceError::Repository(other),
    }
}
