use crate::app::{App, Mode, StatusKind, DELETE_PROMPT};
use crate::form::{FormField, TaskForm};
use domain::{format_deadline, DisplayState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};
use task_list::TaskView;

const HELP: &str = "(a) Add  (e) Edit  (space) Toggle  (d) Delete  (q) Quit";

pub fn draw(frame: &mut Frame, app: &mut App, tasks: &[TaskView]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "📝 To-Do List",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM)),
        chunks[0],
    );

    let items: Vec<ListItem> = tasks.iter().map(task_item).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title("Tasks")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");
    frame.render_stateful_widget(list, chunks[1], &mut app.list_state);

    let footer = match &app.status {
        Some(status) => Paragraph::new(status.text.clone()).style(match status.kind {
            StatusKind::Info => Style::default().fg(Color::Cyan),
            StatusKind::Error => Style::default().fg(Color::Red),
        }),
        None => Paragraph::new(HELP).style(Style::default().fg(Color::Gray)),
    };
    frame.render_widget(
        footer.block(Block::default().borders(Borders::TOP)),
        chunks[2],
    );

    match &app.mode {
        Mode::List => {}
        Mode::Form(form) => draw_form(frame, form),
        Mode::ConfirmDelete { text, .. } => draw_confirm_delete(frame, text),
    }
}

fn state_color(state: DisplayState) -> Color {
    match state {
        DisplayState::Completed => Color::Green,
        DisplayState::Expired => Color::Red,
        DisplayState::Pending => Color::Yellow,
    }
}

fn task_item(view: &TaskView) -> ListItem<'static> {
    let color = state_color(view.state);
    let title_style = if view.task.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    };
    let checkbox = if view.task.completed { "[x] " } else { "[ ] " };

    ListItem::new(vec![
        Line::from(vec![
            Span::styled(checkbox, Style::default().fg(color)),
            Span::styled(view.task.text.clone(), title_style),
        ]),
        Line::from(format!(
            "    📅 Deadline: {}",
            format_deadline(&view.task.deadline)
        )),
        Line::from(Span::styled(
            format!("    ⏳ {}", view.countdown),
            Style::default().fg(color),
        )),
    ])
}

fn draw_form(frame: &mut Frame, form: &TaskForm) {
    let area = centered_rect(60, 12, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(form.title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    frame.render_widget(
        input_field("Task name", &form.name, form.focus == FormField::Name),
        rows[0],
    );
    frame.render_widget(
        input_field(
            "Deadline (YYYY-MM-DDTHH:MM)",
            &form.deadline,
            form.focus == FormField::Deadline,
        ),
        rows[1],
    );

    if let Some(error) = &form.error {
        frame.render_widget(
            Paragraph::new(error.clone()).style(Style::default().fg(Color::Red)),
            rows[2],
        );
    }

    frame.render_widget(
        Paragraph::new(format!(
            "(Enter) {}  (Tab) Switch field  (Esc) Cancel",
            form.confirm_label()
        ))
        .style(Style::default().fg(Color::Gray)),
        rows[3],
    );
}

fn input_field<'a>(title: &'a str, value: &'a str, focused: bool) -> Paragraph<'a> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Paragraph::new(value).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style),
    )
}

fn draw_confirm_delete(frame: &mut Frame, text: &str) {
    let area = centered_rect(70, 7, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(DELETE_PROMPT),
            Line::from(Span::styled(
                text.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("(y) Yes, delete", Style::default().fg(Color::Red)),
                Span::raw("   "),
                Span::styled("(n) Cancel", Style::default().fg(Color::Cyan)),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title("Delete task")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        ),
        area,
    );
}

/// 画面中央に幅 percent_x%、高さ height 行の領域を取る
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let width = u32::from(area.width) * u32::from(percent_x.min(100)) / 100;
    let width = u16::try_from(width).unwrap_or(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
