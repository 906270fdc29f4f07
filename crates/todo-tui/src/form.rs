use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use domain::{DomainError, Task, TaskDraft, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPurpose {
    Add,
    Edit(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Deadline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Pending,
    Cancelled,
    Submitted(TaskDraft),
}

/// 追加・編集フォーム（タスク名と締め切りの 2 項目）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub purpose: FormPurpose,
    pub name: String,
    pub deadline: String,
    pub focus: FormField,
    pub error: Option<String>,
}

impl TaskForm {
    pub fn add() -> Self {
        Self {
            purpose: FormPurpose::Add,
            name: String::new(),
            deadline: String::new(),
            focus: FormField::Name,
            error: None,
        }
    }

    /// 現在の値を入力済みにした編集フォーム
    pub fn edit(task: &Task) -> Self {
        Self {
            purpose: FormPurpose::Edit(task.id.clone()),
            name: task.text.clone(),
            deadline: task.deadline.clone(),
            focus: FormField::Name,
            error: None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.purpose {
            FormPurpose::Add => "Add a new task",
            FormPurpose::Edit(_) => "Edit task",
        }
    }

    pub fn confirm_label(&self) -> &'static str {
        match self.purpose {
            FormPurpose::Add => "Add",
            FormPurpose::Edit(_) => "Save",
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        match key.code {
            KeyCode::Esc => FormOutcome::Cancelled,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = match self.focus {
                    FormField::Name => FormField::Deadline,
                    FormField::Deadline => FormField::Name,
                };
                FormOutcome::Pending
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.field_mut().pop();
                FormOutcome::Pending
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.field_mut().push(c);
                self.error = None;
                FormOutcome::Pending
            }
            _ => FormOutcome::Pending,
        }
    }

    /// 未入力の項目があればフォームを開いたままメッセージを表示する
    fn submit(&mut self) -> FormOutcome {
        let draft = TaskDraft::new(self.name.clone(), self.deadline.clone());
        match draft.clone().validate() {
            Ok(_) => FormOutcome::Submitted(draft),
            Err(DomainError::Validation(message)) => {
                self.error = Some(message);
                FormOutcome::Pending
            }
            Err(other) => {
                self.error = Some(other.to_string());
                FormOutcome::Pending
            }
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Name => &mut self.name,
            FormField::Deadline => &mut self.deadline,
        }
    }
}
