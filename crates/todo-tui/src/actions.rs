use domain::{Task, TaskDraft, TaskError, TaskId};
use task_list::TaskListController;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// 画面操作から生まれるコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Add(TaskDraft),
    Edit(TaskId, TaskDraft),
    Toggle(TaskId),
    Delete(TaskId),
}

/// コマンドの実行結果（ステータス行に表示する）
#[derive(Debug, Clone)]
pub enum Outcome {
    Added(Task),
    Edited(Task),
    Toggled { id: TaskId, completed: bool },
    Deleted(TaskId),
    Failed { action: &'static str, error: TaskError },
}

/// コマンドをコントローラーで実行し、結果を画面側へ送る
/// 画面のループを止めないよう、呼び出し側で tokio タスクとして起動する
pub async fn dispatch(
    controller: TaskListController,
    command: Command,
    outcomes: UnboundedSender<Outcome>,
) {
    let outcome = execute(&controller, command).await;
    if let Some(outcome) = outcome {
        if outcomes.send(outcome).is_err() {
            debug!("画面が終了しているため結果を破棄します");
        }
    }
}

async fn execute(controller: &TaskListController, command: Command) -> Option<Outcome> {
    let outcome = match command {
        Command::Quit => return None,
        Command::Add(draft) => match controller.add(draft).await {
            Ok(task) => Outcome::Added(task),
            Err(error) => Outcome::Failed { action: "add", error },
        },
        Command::Edit(id, draft) => match controller.edit(&id, draft).await {
            Ok(task) => Outcome::Edited(task),
            Err(error) => Outcome::Failed { action: "edit", error },
        },
        Command::Toggle(id) => match controller.toggle(&id).await {
            Ok(completed) => Outcome::Toggled { id, completed },
            Err(error) => Outcome::Failed { action: "toggle", error },
        },
        Command::Delete(id) => match controller.delete(&id).await {
            Ok(()) => Outcome::Deleted(id),
            Err(error) => Outcome::Failed { action: "delete", error },
        },
    };
    Some(outcome)
}
