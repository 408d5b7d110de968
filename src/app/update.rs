use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::time::Duration;
use tracing::{debug, warn};

use crate::app::keymap::KeyAction;
use crate::app::{AppState, Focus, FormRow, InputMode, form_rows};
use crate::error::ConsoleError;
use crate::modal::{DeleteOutcome, OpenOutcome};
use crate::ui;

pub async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    if let Err(err) = app.list.refresh().await {
        app.status = Some(format!("Loading users failed: {err}"));
    }

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(app, key).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Apply one key press. Returns `true` when the application should exit.
pub async fn handle_key(app: &mut AppState, key: KeyEvent) -> bool {
    match app.input_mode {
        InputMode::Normal => return handle_normal(app, key).await,
        InputMode::FilterUsers => handle_filter(app, key).await,
        InputMode::SearchGroups => handle_tree_search(app, key),
        InputMode::Form => handle_form(app, key).await,
        InputMode::PickGroup => handle_pick_group(app, key),
        InputMode::ConfirmDelete => handle_confirm_delete(app, key).await,
    }
    false
}

async fn handle_normal(app: &mut AppState, key: KeyEvent) -> bool {
    let Some(action) = app.keymap.resolve(&key) else {
        return false;
    };
    match action {
        KeyAction::Quit => return true,
        KeyAction::Ignore => {}
        KeyAction::StartFilter => {
            app.filter_input = app.list.query().keyword;
            app.input_mode = InputMode::FilterUsers;
        }
        KeyAction::SearchGroups => {
            app.focus = Focus::Groups;
            app.input_mode = InputMode::SearchGroups;
        }
        KeyAction::SwitchFocus => {
            app.focus = match app.focus {
                Focus::Users => Focus::Groups,
                Focus::Groups => Focus::Users,
            };
        }
        KeyAction::NewUser => open_form(app, 0).await,
        KeyAction::EnterAction => match app.focus {
            Focus::Users => {
                if let Some(id) = selected_user_id(app) {
                    open_form(app, id).await;
                }
            }
            Focus::Groups => expand_selected_group(app),
        },
        KeyAction::DeleteSelection => {
            if app.focus == Focus::Users {
                if let Some(id) = selected_user_id(app) {
                    app.modal.request_delete(id);
                    app.input_mode = InputMode::ConfirmDelete;
                }
            }
        }
        KeyAction::MoveUp => move_selection(app, -1),
        KeyAction::MoveDown => move_selection(app, 1),
        KeyAction::PrevPage => {
            if let Some(res) = app.list.prev_page().await {
                report(app, res.err());
                app.selected_user_index = 0;
            }
        }
        KeyAction::NextPage => {
            if let Some(res) = app.list.next_page().await {
                report(app, res.err());
                app.selected_user_index = 0;
            }
        }
        KeyAction::Refresh => {
            let res = app.list.refresh().await;
            report(app, res.err());
            clamp_user_selection(app);
        }
    }
    false
}

async fn handle_filter(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            let keyword = app.filter_input.trim().to_string();
            let res = app.list.set_filter(keyword).await;
            report(app, res.err());
            app.selected_user_index = 0;
        }
        KeyCode::Backspace => {
            app.filter_input.pop();
        }
        KeyCode::Char(c) => app.filter_input.push(c),
        _ => {}
    }
}

fn handle_tree_search(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.tree_query.clear();
            app.research_tree();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.input_mode = InputMode::Normal,
        KeyCode::Up => move_selection(app, -1),
        KeyCode::Down => move_selection(app, 1),
        _ => edit_tree_query(app, key.code),
    }
}

async fn handle_form(app: &mut AppState, key: KeyEvent) {
    let snapshot = app.modal.snapshot();
    let Some(form) = snapshot.form.clone() else {
        app.input_mode = InputMode::Normal;
        return;
    };
    let rows = form_rows(snapshot.roles.len());
    let row = rows.get(app.form_row).copied().unwrap_or(FormRow::Group);

    match (key.code, row) {
        (KeyCode::Esc, _) => {
            app.modal.cancel();
            app.input_mode = InputMode::Normal;
        }
        (KeyCode::Up, _) => app.form_row = app.form_row.saturating_sub(1),
        (KeyCode::Down, _) => app.form_row = (app.form_row + 1).min(rows.len().saturating_sub(1)),
        (KeyCode::Enter, FormRow::Group) => {
            app.focus = Focus::Groups;
            app.input_mode = InputMode::PickGroup;
        }
        (KeyCode::Enter, _) => submit_form(app, form).await,
        (KeyCode::Char(' '), FormRow::Active) => {
            app.modal.update_form(|f| f.is_active = !f.is_active);
        }
        (KeyCode::Char(' '), FormRow::Role(i)) => {
            if let Some(role) = snapshot.roles.get(i) {
                app.modal.update_form(|f| f.toggle_role(role));
            }
        }
        (KeyCode::Char(c), FormRow::Text(field)) => {
            app.modal.update_form(|f| {
                if let Some(text) = f.text_mut(field) {
                    text.push(c);
                }
            });
        }
        (KeyCode::Backspace, FormRow::Text(field)) => {
            app.modal.update_form(|f| {
                if let Some(text) = f.text_mut(field) {
                    text.pop();
                }
            });
        }
        (KeyCode::Backspace, FormRow::Group) => {
            app.modal.update_form(|f| f.group_path = None);
        }
        _ => {}
    }
}

fn handle_pick_group(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.focus = Focus::Users;
            app.input_mode = InputMode::Form;
        }
        KeyCode::Enter => {
            let Some(id) = app.tree_view.rows().get(app.selected_group_index).map(|row| row.node.id)
            else {
                return;
            };
            // Only leaf groups hold members.
            if !app.tree.node(id).is_some_and(|n| n.is_leaf()) {
                app.status = Some("Users can only be added to a leaf group".to_string());
                return;
            }
            if let Some(path) = app.tree.path_of(id) {
                app.modal.assign_group(path);
            }
            app.status = None;
            app.focus = Focus::Users;
            app.input_mode = InputMode::Form;
        }
        KeyCode::Up => move_selection(app, -1),
        KeyCode::Down => move_selection(app, 1),
        _ => edit_tree_query(app, key.code),
    }
}

async fn handle_confirm_delete(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            let group = pending_user_group(app);
            match app.modal.confirm_delete().await {
                Ok(DeleteOutcome::Deleted(id)) => {
                    move_group_membership(app, group.as_deref(), None);
                    app.status = Some(format!("Deleted user {id}"));
                }
                Ok(_) => {}
                Err(err) => app.status = Some(format!("Delete failed: {err}")),
            }
            clamp_user_selection(app);
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.modal.dismiss_delete();
            app.input_mode = InputMode::Normal;
        }
        _ => {}
    }
}

async fn open_form(app: &mut AppState, id: i64) {
    match app.modal.open(id).await {
        Ok(OpenOutcome::Opened(mode)) => {
            debug!(?mode, "form opened");
            app.form_origin_group = app.modal.snapshot().form.and_then(|f| f.group_path);
            app.form_row = 0;
            app.input_mode = InputMode::Form;
        }
        Ok(OpenOutcome::Discarded) => {}
        Err(err) => app.status = Some(format!("Cannot open user: {err}")),
    }
}

async fn submit_form(app: &mut AppState, form: crate::modal::UserForm) {
    match app.modal.submit(form).await {
        Ok(saved) => {
            let previous = app.form_origin_group.take();
            move_group_membership(app, previous.as_deref(), saved.group_path.as_deref());
            app.status = Some(format!("Saved {}", saved.full_name()));
            app.input_mode = InputMode::Normal;
            clamp_user_selection(app);
        }
        Err(ConsoleError::Validation(errors)) => {
            let msgs: Vec<String> = errors.iter().map(ToString::to_string).collect();
            app.status = Some(msgs.join("; "));
        }
        Err(err) => app.status = Some(format!("Save failed: {err}")),
    }
}

/// Keep leaf badges in step with where saved users point.
fn move_group_membership(app: &mut AppState, from: Option<&str>, to: Option<&str>) {
    if from == to {
        return;
    }
    for (path, delta) in [(from, -1), (to, 1)] {
        let Some(id) = path.and_then(|p| app.tree.find_by_path(p)) else {
            continue;
        };
        if let Err(err) = app.tree.adjust_leaf_count(id, delta) {
            warn!(error = %err, "group count not adjusted");
        }
    }
    let selected = app.selected_group_index;
    app.research_tree();
    app.selected_group_index = selected.min(app.tree_view.len().saturating_sub(1));
}

/// Group of the user awaiting delete confirmation, as last listed.
fn pending_user_group(app: &AppState) -> Option<String> {
    let id = app.modal.snapshot().pending_delete?;
    app.list
        .snapshot()
        .page
        .items
        .into_iter()
        .find(|u| u.id == id)
        .and_then(|u| u.group_path)
}

fn expand_selected_group(app: &mut AppState) {
    let target = app
        .tree_view
        .rows()
        .get(app.selected_group_index)
        .filter(|row| row.node.hidden_children > 0)
        .map(|row| row.node.id);
    if let Some(view) = target.and_then(|id| app.tree.subtree(id)) {
        app.tree_view = view;
        app.selected_group_index = 0;
    }
}

fn edit_tree_query(app: &mut AppState, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            app.tree_query.pop();
        }
        KeyCode::Char(c) => app.tree_query.push(c),
        _ => return,
    }
    app.research_tree();
}

fn move_selection(app: &mut AppState, delta: isize) {
    let (index, len) = match app.focus {
        Focus::Users => (&mut app.selected_user_index, app.list.snapshot().page.items.len()),
        Focus::Groups => (&mut app.selected_group_index, app.tree_view.len()),
    };
    if len == 0 {
        *index = 0;
        return;
    }
    *index = index.saturating_add_signed(delta).min(len - 1);
}

fn clamp_user_selection(app: &mut AppState) {
    let len = app.list.snapshot().page.items.len();
    app.selected_user_index = app.selected_user_index.min(len.saturating_sub(1));
}

fn selected_user_id(app: &AppState) -> Option<i64> {
    app.list
        .snapshot()
        .page
        .items
        .get(app.selected_user_index)
        .map(|u| u.id)
}

fn report(app: &mut AppState, err: Option<ConsoleError>) {
    if let Some(err) = err {
        app.status = Some(format!("Loading users failed: {err}"));
    }
}
