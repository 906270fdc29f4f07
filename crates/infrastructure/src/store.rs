use async_trait::async_trait;
use domain::{NewTask, Task, TaskError, TaskId, TaskPatch};

/// tasks コレクションへのゲートウェイ
///
/// 読み取り・作成・部分更新・削除の 4 操作のみ。トランザクション、バッチ、
/// リトライは行わない。
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// コレクション内の全タスク（並び順はストアの返す順）
    async fn list_all(&self) -> Result<Vec<Task>, TaskError>;

    /// ドキュメントを追加し、ストアが採番した ID を返す
    async fn create(&self, task: NewTask) -> Result<TaskId, TaskError>;

    /// 指定フィールドだけを上書きする。存在しない ID は NotFound
    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskError>;

    /// ドキュメントを削除する。存在しない ID は何もしない
    async fn delete(&self, id: &TaskId) -> Result<(), TaskError>;
}
