//! Shared UI components (status bar, modal helpers).
//!
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app::{AppState, InputMode};

/// Render the bottom status bar with mode, counts and the last message.
pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::FilterUsers => "FILTER",
        InputMode::SearchGroups => "SEARCH(groups)",
        InputMode::Form => "FORM",
        InputMode::PickGroup => "PICK(group)",
        InputMode::ConfirmDelete => "CONFIRM",
    };
    let snap = app.list.snapshot();
    let loading = if snap.loading { "  loading" } else { "" };
    let status = app.status.as_deref().map(|s| format!("  | {s}")).unwrap_or_default();
    let msg = format!(
        "mode: {mode}  users:{}  groups shown:{}{loading}{status}",
        snap.page.total_count,
        app.tree_view.len(),
    );
    let p = Paragraph::new(msg).style(Style::default().fg(app.theme.status_fg).bg(app.theme.status_bg));
    f.render_widget(p, area);
}

/// Yes/no gate shown before a delete is sent.
pub fn render_delete_confirm(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(id) = app.modal.snapshot().pending_delete else {
        return;
    };
    let who = app
        .list
        .snapshot()
        .page
        .items
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.full_name())
        .unwrap_or_else(|| format!("user {id}"));
    let rect = centered_rect(52, 6, area);
    let p = Paragraph::new(format!("Do you want to delete {who}?\n\n  y / Enter: delete    n / Esc: cancel"))
        .style(Style::default().fg(app.theme.text))
        .block(
            Block::default()
                .title("Delete user")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.error_fg)),
        );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect { x, y, width: w, height: h }
}

/// `4923` -> `"4,923"`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
