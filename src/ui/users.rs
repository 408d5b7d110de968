//! Users table and the create/edit form.
//!
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};

use crate::app::{AppState, Focus, FormRow, form_rows};
use crate::list::ListStatus;

/// Render the current page of users, or its loading/empty state.
pub fn render_users_table(f: &mut Frame, area: Rect, app: &AppState) {
    let snap = app.list.snapshot();
    let mut title = format!(
        "Users - page {}/{} ({} total)",
        snap.page_number(),
        snap.page_count(),
        snap.page.total_count
    );
    if let Some(err) = &snap.error {
        title.push_str(&format!(" [stale: {err}]"));
    }
    let border = if app.focus == Focus::Users { app.theme.highlight_fg } else { app.theme.border };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let placeholder = match snap.status() {
        ListStatus::Loading => Some("Loading..."),
        ListStatus::Empty => Some("No records"),
        ListStatus::Ready => None,
    };
    if let Some(text) = placeholder {
        let p = Paragraph::new(text).style(Style::default().fg(app.theme.muted)).block(block);
        f.render_widget(p, area);
        return;
    }

    let rows = snap.page.items.iter().enumerate().map(|(i, u)| {
        let style = if i == app.selected_user_index {
            Style::default().fg(app.theme.highlight_fg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.text)
        };
        let active = if u.is_active {
            Span::styled("Yes", Style::default().fg(app.theme.match_fg))
        } else {
            Span::styled("No", Style::default().fg(app.theme.error_fg))
        };
        Row::new(vec![
            Cell::from(u.first_name.clone()),
            Cell::from(u.last_name.clone()),
            Cell::from(u.user_type.clone()),
            Cell::from(u.department.clone()),
            Cell::from(u.email_address.clone()),
            Cell::from(active),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Percentage(40),
        Constraint::Length(6),
    ];
    let header = Row::new(vec!["First name", "Last name", "User type", "Department", "Email", "Active"])
        .style(Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD));

    let table = Table::new(rows, widths).header(header).block(block).column_spacing(1);
    f.render_widget(table, area);
}

/// Render the open user form as a centered modal.
pub fn render_user_form(f: &mut Frame, area: Rect, app: &AppState) {
    let snap = app.modal.snapshot();
    let (Some(mode), Some(form)) = (snap.mode(), snap.form.as_ref()) else {
        return;
    };

    let mut lines: Vec<Line> = Vec::new();
    for (idx, row) in form_rows(snap.roles.len()).into_iter().enumerate() {
        let cursor = if idx == app.form_row { "▶ " } else { "  " };
        let text = match row {
            FormRow::Text(field) => format!("{cursor}{:<14} {}", field.label(), form.text(field)),
            FormRow::Active => {
                format!("{cursor}{:<14} [{}]", "Active", if form.is_active { "x" } else { " " })
            }
            FormRow::Role(i) => {
                let role = snap.roles.get(i).map(String::as_str).unwrap_or("");
                let mark = if form.role_names.contains(role) { "x" } else { " " };
                format!("{cursor}{:<14} [{mark}] {role}", if i == 0 { "Roles" } else { "" })
            }
            FormRow::Group => format!(
                "{cursor}{:<14} {}",
                "Group",
                form.group_path.as_deref().unwrap_or("(Enter to pick)")
            ),
        };
        let style = if idx == app.form_row {
            Style::default().fg(app.theme.highlight_fg)
        } else {
            Style::default().fg(app.theme.text)
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    if !snap.field_errors.is_empty() || snap.error.is_some() {
        lines.push(Line::from(""));
    }
    for err in &snap.field_errors {
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(app.theme.error_fg))));
    }
    if let Some(err) = &snap.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(app.theme.error_fg))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter: save  Space: toggle  Esc: cancel",
        Style::default().fg(app.theme.muted),
    )));

    let title = if snap.busy { format!("{} (saving...)", mode.title()) } else { mode.title().to_string() };
    let height = (lines.len() as u16).saturating_add(2);
    let rect = crate::ui::components::centered_rect(64, height, area);
    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}
