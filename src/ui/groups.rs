//! Group tree pane.
//!
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use crate::app::{AppState, Focus, InputMode};
use crate::ui::components::format_count;

/// Render the searched tree with match highlighting and count badges.
pub fn render_group_tree(f: &mut Frame, area: Rect, app: &AppState) {
    let title = match app.input_mode {
        InputMode::PickGroup => "Pick user group (Enter: assign, Esc: back)".to_string(),
        _ if app.tree_query.is_empty() => "User groups".to_string(),
        _ => format!("User groups - \"{}\"", app.tree_query),
    };
    let border = if app.focus == Focus::Groups { app.theme.highlight_fg } else { app.theme.border };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    if app.tree_view.is_empty() {
        let p = Paragraph::new("No results").style(Style::default().fg(app.theme.muted)).block(block);
        f.render_widget(p, area);
        return;
    }

    let rows = app.tree_view.rows();
    // Keep the selected row on screen.
    let visible = area.height.saturating_sub(2) as usize;
    let start = if visible == 0 { 0 } else { (app.selected_group_index / visible) * visible };

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(start)
        .take(visible.max(1))
        .map(|(i, row)| {
            let node = row.node;
            let marker = if node.hidden_children > 0 {
                "▸"
            } else if node.children.is_empty() {
                "•"
            } else {
                "▾"
            };
            let mut name_style = Style::default().fg(app.theme.text);
            if node.matched {
                name_style = name_style.fg(app.theme.match_fg).add_modifier(Modifier::BOLD);
            }
            if i == app.selected_group_index && app.focus == Focus::Groups {
                name_style = name_style.add_modifier(Modifier::REVERSED);
            }
            ListItem::new(Line::from(vec![
                Span::raw(format!("{}{} ", "  ".repeat(row.depth), marker)),
                Span::styled(node.name.clone(), name_style),
                Span::styled(
                    format!("  {}", format_count(node.aggregate_count)),
                    Style::default().fg(app.theme.badge_fg),
                ),
            ]))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}
