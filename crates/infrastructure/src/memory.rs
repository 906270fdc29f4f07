use crate::TaskStore;
use async_trait::async_trait;
use domain::{NewTask, Task, TaskError, TaskId, TaskPatch};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// プロセス内のタスクストア（挿入順を保持）
/// オフライン実行とテストで DynamoDB の代わりに使う
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初期データ入りのストアを作成
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// 現在の内容のコピー
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_all(&self) -> Result<Vec<Task>, TaskError> {
        Ok(self.snapshot())
    }

    async fn create(&self, task: NewTask) -> Result<TaskId, TaskError> {
        let id = TaskId::from_string(ulid::Ulid::new().to_string())?;
        self.lock().push(Task::from_new(id.clone(), task));
        debug!(task_id = %id, "メモリストアにタスクを追加");
        Ok(id)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut tasks = self.lock();
        let task = tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.apply(&patch);
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
        self.lock().retain(|task| &task.id != id);
        Ok(())
    }
}
