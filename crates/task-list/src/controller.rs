use crate::timer::CountdownTimer;
use chrono::{DateTime, Utc};
use domain::{
    DisplayState, NewTask, Task, TaskDraft, TaskError, TaskId, TaskPatch, CALCULATING_LABEL,
};
use infrastructure::TaskStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 一覧表示用のタスク（表示状態は取得時の時刻で毎回判定）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub task: Task,
    pub countdown: String,
    pub state: DisplayState,
}

#[derive(Default)]
struct ListState {
    tasks: Vec<Task>,
    countdowns: HashMap<TaskId, String>,
}

impl ListState {
    fn find_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }
}

/// タスク一覧のコントローラー
///
/// メモリ上のタスク一覧とカウントダウン表示を保持し、ユーザー操作を
/// ストアへ反映する。状態のロックは `.await` をまたいで保持しないため、
/// リモート呼び出し中もタイマーは動き続ける。
#[derive(Clone)]
pub struct TaskListController {
    store: Arc<dyn TaskStore>,
    state: Arc<Mutex<ListState>>,
    countdown_running: Arc<AtomicBool>,
}

impl TaskListController {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(ListState::default())),
            countdown_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// ストアから全タスクを一度だけ読み込み、メモリ上の状態を置き換える
    pub async fn load(&self) -> Result<usize, TaskError> {
        let tasks = self
            .store
            .list_all()
            .await
            .map_err(|e| remote_failure("list_all", None, e))?;

        let count = tasks.len();
        let mut state = self.lock();
        state.tasks = tasks;
        state.countdowns.clear();

        info!("タスク読み込み完了: {} 件", count);
        Ok(count)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    pub fn find(&self, id: &TaskId) -> Option<Task> {
        self.lock().tasks.iter().find(|task| &task.id == id).cloned()
    }

    pub fn countdown_label(&self, id: &TaskId) -> Option<String> {
        self.lock().countdowns.get(id).cloned()
    }

    /// 全タスクの残り時間を現在時刻から計算し直す（タスク一覧は変更しない）
    pub fn refresh_countdowns(&self, now: DateTime<Utc>) {
        let mut state = self.lock();
        let countdowns = state
            .tasks
            .iter()
            .map(|task| (task.id.clone(), task.countdown(now).label()))
            .collect();
        state.countdowns = countdowns;
    }

    pub fn views(&self, now: DateTime<Utc>) -> Vec<TaskView> {
        let state = self.lock();
        state
            .tasks
            .iter()
            .map(|task| TaskView {
                task: task.clone(),
                countdown: state
                    .countdowns
                    .get(&task.id)
                    .cloned()
                    .unwrap_or_else(|| CALCULATING_LABEL.to_string()),
                state: task.display_state(now),
            })
            .collect()
    }

    /// カウントダウンタイマーを開始する
    /// 既に動いているタイマーがあれば None（1 つのコントローラーに 1 つだけ）
    pub fn start_countdown(&self, period: Duration) -> Option<CountdownTimer> {
        if self.countdown_running.swap(true, Ordering::SeqCst) {
            warn!("カウントダウンタイマーは既に動作中です");
            return None;
        }
        debug!(period_ms = period.as_millis() as u64, "カウントダウンタイマー開始");
        Some(CountdownTimer::spawn(
            self.clone(),
            period,
            self.countdown_running.clone(),
        ))
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown_running.load(Ordering::SeqCst)
    }

    /// タスクを追加する
    /// ストアでの作成が成功してから、採番された ID でメモリ上の一覧に追加する
    pub async fn add(&self, draft: TaskDraft) -> Result<Task, TaskError> {
        let draft = draft.validate().map_err(|e| {
            debug!("追加の入力検証エラー: {}", e);
            e
        })?;

        let new_task = NewTask::from_draft(draft);
        let id = self
            .store
            .create(new_task.clone())
            .await
            .map_err(|e| remote_failure("create", None, e))?;

        let task = Task::from_new(id, new_task);
        self.lock().tasks.push(task.clone());

        info!(task_id = %task.id, "タスク追加完了");
        Ok(task)
    }

    /// 完了フラグを反転する
    ///
    /// メモリ上の値を先に反転し（楽観的更新）、ストアへの書き込みが失敗した
    /// 場合は元に戻す。その間に別の操作で値が変わっていれば戻さない。
    pub async fn toggle(&self, id: &TaskId) -> Result<bool, TaskError> {
        let completed = {
            let mut state = self.lock();
            let task = state
                .find_mut(id)
                .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
            task.completed = !task.completed;
            task.completed
        };

        if let Err(e) = self.store.update(id, TaskPatch::completed(completed)).await {
            let mut state = self.lock();
            if let Some(task) = state.find_mut(id) {
                if task.completed == completed {
                    task.completed = !completed;
                    warn!(task_id = %id, "完了フラグの変更を取り消しました");
                }
            }
            drop(state);
            return Err(remote_failure("update", Some(id), e));
        }

        debug!(task_id = %id, completed, "完了フラグ更新完了");
        Ok(completed)
    }

    /// 名前と締め切りを編集する（id と completed は維持）
    ///
    /// ストアへは名前と締め切りだけを書き込み、成功後にメモリ上の最新の
    /// レコードへ同じ 2 項目をマージする。書き込み中に完了フラグが切り替わって
    /// いても上書きしない。
    pub async fn edit(&self, id: &TaskId, draft: TaskDraft) -> Result<Task, TaskError> {
        let draft = draft.validate().map_err(|e| {
            debug!(task_id = %id, "編集の入力検証エラー: {}", e);
            e
        })?;

        if self.find(id).is_none() {
            return Err(TaskError::NotFound(id.to_string()));
        }
        let patch = TaskPatch::details(draft);

        self.store
            .update(id, patch.clone())
            .await
            .map_err(|e| remote_failure("update", Some(id), e))?;

        let updated = {
            let mut state = self.lock();
            let task = state.find_mut(id).ok_or_else(|| {
                warn!(task_id = %id, "編集中にタスクが削除されました");
                TaskError::NotFound(id.to_string())
            })?;
            task.apply(&patch);
            task.clone()
        };

        info!(task_id = %id, "タスク編集完了");
        Ok(updated)
    }

    /// ストアから削除した後、メモリ上の一覧からも取り除く
    pub async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
        self.store
            .delete(id)
            .await
            .map_err(|e| remote_failure("delete", Some(id), e))?;

        let mut state = self.lock();
        state.tasks.retain(|task| &task.id != id);
        state.countdowns.remove(id);

        info!(task_id = %id, "タスク削除完了");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn remote_failure(operation: &str, id: Option<&TaskId>, error: TaskError) -> TaskError {
    match id {
        Some(id) => error!(operation, task_id = %id, error = %error, "ストア操作に失敗しました"),
        None => error!(operation, error = %error, "ストア操作に失敗しました"),
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use domain::{NewTask, TIMES_UP_LABEL};
    use infrastructure::InMemoryTaskStore;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// 失敗や待機を差し込めるテスト用ストア
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryTaskStore,
        fail: AtomicBool,
        calls: AtomicUsize,
        /// 最初の update だけをこの通知まで待たせる
        update_gate: Mutex<Option<Arc<Notify>>>,
    }

    impl FlakyStore {
        fn failing() -> Self {
            Self {
                fail: AtomicBool::new(true),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), TaskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(TaskError::DynamoDb("service unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TaskStore for FlakyStore {
        async fn list_all(&self) -> Result<Vec<Task>, TaskError> {
            self.check()?;
            self.inner.list_all().await
        }

        async fn create(&self, task: NewTask) -> Result<TaskId, TaskError> {
            self.check()?;
            self.inner.create(task).await
        }

        async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskError> {
            let gate = self.update_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.check()?;
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
            self.check()?;
            self.inner.delete(id).await
        }
    }

    fn task(id: &str, text: &str, completed: bool, deadline: &str) -> Task {
        Task {
            id: TaskId::from_string(id.to_string()).unwrap(),
            text: text.to_string(),
            completed,
            deadline: deadline.to_string(),
        }
    }

    fn gated_store(gate: &Arc<Notify>) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: InMemoryTaskStore::with_tasks(vec![task(
                "t1",
                "Write report",
                false,
                "2030-01-01T10:00:00Z",
            )]),
            update_gate: Mutex::new(Some(gate.clone())),
            ..FlakyStore::default()
        })
    }

    fn seeded_store() -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: InMemoryTaskStore::with_tasks(vec![
                task("t1", "Write report", false, "2030-01-01T10:00:00Z"),
                task("t2", "Call mom", true, "2020-01-01T10:00:00Z"),
                task("t3", "Pay rent", false, "2020-06-01T10:00:00Z"),
            ]),
            ..FlakyStore::default()
        })
    }

    async fn loaded_controller(store: Arc<FlakyStore>) -> TaskListController {
        let controller = TaskListController::new(store);
        controller.load().await.unwrap();
        controller
    }

    fn id(raw: &str) -> TaskId {
        TaskId::from_string(raw.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_load_replaces_state_in_store_order() {
        // Arrange
        let store = seeded_store();
        let controller = TaskListController::new(store.clone());
        assert!(controller.is_empty());

        // Act
        let count = controller.load().await.unwrap();

        // Assert
        assert_eq!(count, 3);
        let texts: Vec<String> = controller.tasks().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["Write report", "Call mom", "Pay rent"]);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_state() {
        let store = Arc::new(FlakyStore::failing());
        let controller = TaskListController::new(store);

        assert!(controller.load().await.is_err());
        assert!(controller.is_empty());
    }

    #[tokio::test]
    async fn test_add_persists_then_appends() {
        // Arrange
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        let before = controller.len();

        // Act
        let added = controller
            .add(TaskDraft::new("Buy milk", "2030-01-01T11:00"))
            .await
            .unwrap();

        // Assert: ストアに 1 件追加され、メモリ上も末尾に 1 件増える
        assert_eq!(controller.len(), before + 1);
        let tasks = controller.tasks();
        assert_eq!(tasks.last(), Some(&added));

        let stored = store.inner.snapshot();
        let doc = stored.iter().find(|t| t.id == added.id).unwrap();
        assert_eq!(doc.text, "Buy milk");
        assert!(!doc.completed);
        assert_eq!(stored.len(), 4);
    }

    #[tokio::test]
    async fn test_add_with_empty_field_changes_nothing() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        let calls_after_load = store.calls.load(Ordering::SeqCst);

        let empty_name = controller.add(TaskDraft::new("", "2030-01-01T11:00")).await;
        let empty_deadline = controller.add(TaskDraft::new("Buy milk", "")).await;

        assert!(empty_name.unwrap_err().is_validation());
        assert!(empty_deadline.unwrap_err().is_validation());
        assert_eq!(controller.len(), 3);
        assert_eq!(store.inner.snapshot().len(), 3);
        // 検証エラーではリモート呼び出しを行わない
        assert_eq!(store.calls.load(Ordering::SeqCst), calls_after_load);
    }

    #[tokio::test]
    async fn test_add_failure_leaves_local_state() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        store.fail.store(true, Ordering::SeqCst);

        let result = controller.add(TaskDraft::new("Buy milk", "2030-01-01T11:00")).await;

        assert!(matches!(result, Err(TaskError::DynamoDb(_))));
        assert_eq!(controller.len(), 3);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_completed() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;

        assert!(controller.toggle(&id("t1")).await.unwrap());
        assert!(!controller.toggle(&id("t1")).await.unwrap());

        assert!(!controller.find(&id("t1")).unwrap().completed);
        assert!(!store.inner.snapshot()[0].completed);
    }

    #[tokio::test]
    async fn test_toggle_applies_locally_before_remote_write() {
        // Arrange: update がゲートで止まるストア
        let gate = Arc::new(Notify::new());
        let store = gated_store(&gate);
        let controller = loaded_controller(store.clone()).await;

        // Act: リモート書き込みを待たずに状態を確認
        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle(&id("t1")).await }
        });
        tokio::task::yield_now().await;

        // Assert: メモリ上は即座に反転、ストアはまだ
        assert!(controller.find(&id("t1")).unwrap().completed);
        assert!(!store.inner.snapshot()[0].completed);

        gate.notify_one();
        assert!(pending.await.unwrap().unwrap());
        assert!(store.inner.snapshot()[0].completed);
    }

    #[tokio::test]
    async fn test_toggle_failure_rolls_back() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        store.fail.store(true, Ordering::SeqCst);

        let result = controller.toggle(&id("t1")).await;

        assert!(result.is_err());
        assert!(!controller.find(&id("t1")).unwrap().completed);
    }

    #[tokio::test]
    async fn test_failed_toggle_does_not_undo_later_toggle() {
        // Arrange: 1 回目の書き込みだけが止まるストア
        let gate = Arc::new(Notify::new());
        let store = gated_store(&gate);
        let controller = loaded_controller(store.clone()).await;

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle(&id("t1")).await }
        });
        tokio::task::yield_now().await;
        assert!(controller.find(&id("t1")).unwrap().completed);

        // Act: 2 回目の切り替えが先に成功し、その後 1 回目が失敗する
        assert!(!controller.toggle(&id("t1")).await.unwrap());
        store.fail.store(true, Ordering::SeqCst);
        gate.notify_one();
        let result = first.await.unwrap();

        // Assert: 1 回目の取り消しで 2 回目の値を上書きしない
        assert!(matches!(result, Err(TaskError::DynamoDb(_))));
        assert!(!controller.find(&id("t1")).unwrap().completed);
        assert!(!store.inner.snapshot()[0].completed);
    }

    #[tokio::test]
    async fn test_toggle_unknown_task_is_not_found() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        let calls = store.calls.load(Ordering::SeqCst);

        let result = controller.toggle(&id("nope")).await;

        assert!(matches!(result, Err(TaskError::NotFound(_))));
        assert_eq!(store.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_edit_changes_only_text_and_deadline() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;

        let edited = controller
            .edit(&id("t2"), TaskDraft::new("Call dad", "2031-03-03T08:00"))
            .await
            .unwrap();

        assert_eq!(edited.id, id("t2"));
        assert!(edited.completed);
        assert_eq!(edited.text, "Call dad");
        assert_eq!(edited.deadline, "2031-03-03T08:00");
        assert_eq!(controller.find(&id("t2")), Some(edited.clone()));
        assert_eq!(store.inner.snapshot()[1], edited);
    }

    #[tokio::test]
    async fn test_edit_keeps_toggle_made_during_remote_write() {
        // Arrange: 編集の書き込みがゲートで止まる
        let gate = Arc::new(Notify::new());
        let store = gated_store(&gate);
        let controller = loaded_controller(store.clone()).await;

        let editing = tokio::spawn({
            let controller = controller.clone();
            async move {
                controller
                    .edit(&id("t1"), TaskDraft::new("Renamed", "2031-01-01T09:00"))
                    .await
            }
        });
        tokio::task::yield_now().await;

        // Act: 編集の書き込み中に完了フラグを切り替える
        assert!(controller.toggle(&id("t1")).await.unwrap());
        gate.notify_one();
        let edited = editing.await.unwrap().unwrap();

        // Assert: 完了フラグは維持され、メモリとストアが一致する
        assert!(edited.completed);
        assert_eq!(edited.text, "Renamed");
        assert_eq!(controller.find(&id("t1")), Some(edited.clone()));
        assert_eq!(store.inner.snapshot()[0], edited);
    }

    #[tokio::test]
    async fn test_edit_failure_keeps_local_task() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        let original = controller.find(&id("t1")).unwrap();
        store.fail.store(true, Ordering::SeqCst);

        let result = controller
            .edit(&id("t1"), TaskDraft::new("Renamed", "2031-01-01T09:00"))
            .await;

        assert!(matches!(result, Err(TaskError::DynamoDb(_))));
        assert_eq!(controller.find(&id("t1")), Some(original.clone()));
        assert_eq!(store.inner.snapshot()[0], original);
    }

    #[tokio::test]
    async fn test_edit_validation_and_missing_task() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        let original = controller.find(&id("t1")).unwrap();

        let invalid = controller.edit(&id("t1"), TaskDraft::new("Renamed", "")).await;
        let missing = controller
            .edit(&id("nope"), TaskDraft::new("Renamed", "2030-01-01T10:00"))
            .await;

        assert!(invalid.unwrap_err().is_validation());
        assert!(matches!(missing, Err(TaskError::NotFound(_))));
        assert_eq!(controller.find(&id("t1")), Some(original));
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one_task() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        controller.refresh_countdowns(Utc::now());

        controller.delete(&id("t2")).await.unwrap();

        let local: Vec<TaskId> = controller.tasks().into_iter().map(|t| t.id).collect();
        let remote: Vec<TaskId> = store.inner.snapshot().into_iter().map(|t| t.id).collect();
        assert_eq!(local, vec![id("t1"), id("t3")]);
        assert_eq!(remote, local);
        assert_eq!(controller.countdown_label(&id("t2")), None);
        assert!(controller.countdown_label(&id("t1")).is_some());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_task() {
        let store = seeded_store();
        let controller = loaded_controller(store.clone()).await;
        store.fail.store(true, Ordering::SeqCst);

        assert!(controller.delete(&id("t1")).await.is_err());
        assert_eq!(controller.len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_countdowns_is_derived_state() {
        // Arrange
        let store = seeded_store();
        let controller = loaded_controller(store).await;
        let tasks_before = controller.tasks();
        let now = Utc.with_ymd_and_hms(2029, 12, 31, 7, 54, 30).unwrap();

        // Act
        controller.refresh_countdowns(now);

        // Assert: ラベルだけが更新され、タスク一覧は変わらない
        assert_eq!(controller.tasks(), tasks_before);
        assert_eq!(
            controller.countdown_label(&id("t1")).as_deref(),
            Some("26 hours 5 minutes 30 seconds")
        );
        assert_eq!(
            controller.countdown_label(&id("t3")).as_deref(),
            Some(TIMES_UP_LABEL)
        );
    }

    #[tokio::test]
    async fn test_views_classify_and_show_placeholder_before_first_tick() {
        let store = seeded_store();
        let controller = loaded_controller(store).await;
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let views = controller.views(now);
        assert!(views.iter().all(|v| v.countdown == CALCULATING_LABEL));
        assert_eq!(views[0].state, DisplayState::Pending);
        assert_eq!(views[1].state, DisplayState::Completed);
        assert_eq!(views[2].state, DisplayState::Expired);

        controller.refresh_countdowns(now);
        let views = controller.views(now);
        assert_eq!(views[2].countdown, TIMES_UP_LABEL);
    }
}
