use crate::actions::{Command, Outcome};
use crate::form::{FormOutcome, FormPurpose, TaskForm};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use domain::TaskId;
use ratatui::widgets::ListState;
use task_list::TaskView;

pub const DELETE_PROMPT: &str = "Delete this task? It will be removed permanently.";
pub const DELETED_MESSAGE: &str = "Deleted! The task was removed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Form(TaskForm),
    ConfirmDelete { id: TaskId, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

/// 画面の状態（選択位置、入力モード、ステータス行）
pub struct App {
    pub mode: Mode,
    pub list_state: ListState,
    pub status: Option<StatusMessage>,
    confirm_delete: bool,
}

impl App {
    pub fn new(confirm_delete: bool) -> Self {
        Self {
            mode: Mode::List,
            list_state: ListState::default(),
            status: None,
            confirm_delete,
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind: StatusKind::Error,
            text: text.into(),
        });
    }

    /// 一覧の件数が変わったときに選択位置を範囲内に収める
    pub fn clamp_selection(&mut self, len: usize) {
        match (self.list_state.selected(), len) {
            (_, 0) => self.list_state.select(None),
            (None, _) => self.list_state.select(Some(0)),
            (Some(i), len) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    pub fn selected<'a>(&self, tasks: &'a [TaskView]) -> Option<&'a TaskView> {
        self.list_state.selected().and_then(|i| tasks.get(i))
    }

    pub fn apply_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Added(task) => self.info(format!("Added \"{}\"", task.text)),
            Outcome::Edited(task) => self.info(format!("Saved \"{}\"", task.text)),
            Outcome::Toggled { completed, .. } => self.info(if completed {
                "Marked as done"
            } else {
                "Marked as not done"
            }),
            Outcome::Deleted(_) => self.info(DELETED_MESSAGE),
            Outcome::Failed { action, error } => self.error(format!("Could not {action} task: {error}")),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, tasks: &[TaskView]) -> Option<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Command::Quit);
        }

        match &mut self.mode {
            Mode::List => self.handle_list_key(key, tasks),
            Mode::Form(form) => match form.handle_key(key) {
                FormOutcome::Pending => None,
                FormOutcome::Cancelled => {
                    self.mode = Mode::List;
                    None
                }
                FormOutcome::Submitted(draft) => {
                    let command = match &form.purpose {
                        FormPurpose::Add => Command::Add(draft),
                        FormPurpose::Edit(id) => Command::Edit(id.clone(), draft),
                    };
                    self.mode = Mode::List;
                    Some(command)
                }
            },
            Mode::ConfirmDelete { id, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    let command = Command::Delete(id.clone());
                    self.mode = Mode::List;
                    Some(command)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.mode = Mode::List;
                    None
                }
                _ => None,
            },
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent, tasks: &[TaskView]) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
            KeyCode::Down | KeyCode::Char('j') => {
                if !tasks.is_empty() {
                    let next = self
                        .list_state
                        .selected()
                        .map(|i| (i + 1).min(tasks.len() - 1))
                        .unwrap_or(0);
                    self.list_state.select(Some(next));
                }
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !tasks.is_empty() {
                    let previous = self
                        .list_state
                        .selected()
                        .map(|i| i.saturating_sub(1))
                        .unwrap_or(0);
                    self.list_state.select(Some(previous));
                }
                None
            }
            KeyCode::Char('a') => {
                self.mode = Mode::Form(TaskForm::add());
                None
            }
            KeyCode::Char('e') => {
                if let Some(view) = self.selected(tasks) {
                    self.mode = Mode::Form(TaskForm::edit(&view.task));
                }
                None
            }
            KeyCode::Char(' ') | KeyCode::Enter => self
                .selected(tasks)
                .map(|view| Command::Toggle(view.task.id.clone())),
            KeyCode::Char('d') => {
                let view = self.selected(tasks)?;
                if self.confirm_delete {
                    self.mode = Mode::ConfirmDelete {
                        id: view.task.id.clone(),
                        text: view.task.text.clone(),
                    };
                    None
                } else {
                    Some(Command::Delete(view.task.id.clone()))
                }
            }
            _ => None,
        }
    }
}
