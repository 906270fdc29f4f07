use crate::countdown::Countdown;
use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 入力フォームの検証メッセージ
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in both the task name and the deadline!";

/// ストアが採番するタスクID（不透明な文字列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn from_string(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::InvalidTaskId(
                "TaskId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ID を持たないタスクドキュメント（作成時にストアへ渡す）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub text: String,
    pub completed: bool,
    pub deadline: String,
}

impl NewTask {
    pub fn from_draft(draft: ValidDraft) -> Self {
        Self {
            text: draft.text,
            completed: false,
            deadline: draft.deadline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub deadline: String,
}

impl Task {
    pub fn from_new(id: TaskId, new_task: NewTask) -> Self {
        Self {
            id,
            text: new_task.text,
            completed: new_task.completed,
            deadline: new_task.deadline,
        }
    }

    /// パッチの Some フィールドだけを上書きする
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(deadline) = &patch.deadline {
            self.deadline = deadline.clone();
        }
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        Countdown::until(&self.deadline, now)
    }

    /// 表示状態はキャッシュせず、呼び出しごとに現在時刻から判定する
    pub fn display_state(&self, now: DateTime<Utc>) -> DisplayState {
        if self.completed {
            DisplayState::Completed
        } else if self.countdown(now).is_expired() {
            DisplayState::Expired
        } else {
            DisplayState::Pending
        }
    }
}

/// 部分更新。None のフィールドは書き込まれない
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub deadline: Option<String>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// 編集用のパッチ（名前と締め切りのみ。completed は書き込まない）
    pub fn details(draft: ValidDraft) -> Self {
        Self {
            text: Some(draft.text),
            completed: None,
            deadline: Some(draft.deadline),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.deadline.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Completed,
    Expired,
    Pending,
}

/// 追加・編集フォームで入力された 2 つの文字列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub deadline: String,
}

/// 検証済みの入力。`TaskDraft::validate` からのみ生成される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    text: String,
    deadline: String,
}

impl ValidDraft {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn deadline(&self) -> &str {
        &self.deadline
    }
}

impl TaskDraft {
    pub fn new(text: impl Into<String>, deadline: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            deadline: deadline.into(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(task.text.clone(), task.deadline.clone())
    }

    /// 両方のフィールドが入力されていることだけを確認する（形式は検証しない）
    pub fn validate(self) -> Result<ValidDraft, DomainError> {
        if self.text.trim().is_empty() || self.deadline.trim().is_empty() {
            return Err(DomainError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        }
        Ok(ValidDraft {
            text: self.text,
            deadline: self.deadline,
        })
    }
}
