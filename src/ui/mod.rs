//! Stateless rendering of the console screen.
//!
//! Every frame reads fresh controller snapshots and leaves state untouched.
//!
pub mod components;
pub mod groups;
pub mod users;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::keymap::{KeyAction, Keymap};
use crate::app::{AppState, InputMode};

pub fn render(f: &mut Frame, app: &AppState) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)].as_ref())
        .split(root[1]);

    let prompt = match app.input_mode {
        InputMode::FilterUsers => format!("  Filter users: {}_", app.filter_input),
        InputMode::SearchGroups | InputMode::PickGroup => {
            format!("  Search user group: {}_", app.tree_query)
        }
        InputMode::Normal | InputMode::Form | InputMode::ConfirmDelete => {
            let keyword = app.list.query().keyword;
            if keyword.is_empty() { String::new() } else { format!("  filter: \"{keyword}\"") }
        }
    };
    let header = Paragraph::new(format!("Users{prompt}   {}", key_hints(&app.keymap)))
    .block(
        Block::default()
            .title("usrdir-console")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    )
    .style(Style::default().fg(app.theme.header_fg).bg(app.theme.header_bg));
    f.render_widget(header, root[0]);

    users::render_users_table(f, body[0], app);
    groups::render_group_tree(f, body[1], app);
    components::render_status_bar(f, root[2], app);

    match app.input_mode {
        InputMode::Form => users::render_user_form(f, f.area(), app),
        InputMode::ConfirmDelete => components::render_delete_confirm(f, f.area(), app),
        _ => {}
    }
}

const HINTS: [(KeyAction, &str); 8] = [
    (KeyAction::NewUser, "new"),
    (KeyAction::EnterAction, "edit"),
    (KeyAction::DeleteSelection, "delete"),
    (KeyAction::StartFilter, "filter"),
    (KeyAction::SearchGroups, "groups"),
    (KeyAction::NextPage, "next page"),
    (KeyAction::SwitchFocus, "pane"),
    (KeyAction::Quit, "quit"),
];

/// Header hint line built from the live bindings; unbound actions are left out.
pub fn key_hints(keymap: &Keymap) -> String {
    HINTS
        .iter()
        .filter_map(|(action, label)| {
            let keys = keymap.keys_for(*action);
            (!keys.is_empty()).then(|| format!("{}: {label}", keys.join("/")))
        })
        .collect::<Vec<_>>()
        .join("  ")
}
