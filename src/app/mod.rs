//! Application state types and entry glue.
//!
//! Holds the controllers the screen drives plus the purely visual state
//! (focus, selection, text being typed). Rendering reads controller snapshots;
//! key handling in [`update`] turns keystrokes into controller operations.
//!
pub mod keymap;
pub mod update;

use std::sync::Arc;

use ratatui::style::Color;

use crate::config::{ConsoleConfig, ThemeName};
use crate::directory::DirectoryService;
use crate::error::FormField;
use crate::list::UserList;
use crate::modal::UserModal;
use crate::tree::{EntityTreeIndex, SearchView};

/// Collaborator type the screen runs against.
pub type Directory = dyn DirectoryService;

/// Which pane receives navigation keys.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Focus {
    Users,
    Groups,
}

/// Current input mode for key handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    FilterUsers,
    SearchGroups,
    Form,
    /// Choosing a group for the open form from the tree pane.
    PickGroup,
    ConfirmDelete,
}

/// One selectable line of the user form.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormRow {
    Text(FormField),
    Active,
    Role(usize),
    Group,
}

/// Form lines for a role list of `role_count` entries.
pub fn form_rows(role_count: usize) -> Vec<FormRow> {
    let mut rows = vec![
        FormRow::Text(FormField::FirstName),
        FormRow::Text(FormField::LastName),
        FormRow::Text(FormField::UserType),
        FormRow::Text(FormField::Department),
        FormRow::Text(FormField::EmailAddress),
        FormRow::Active,
    ];
    rows.extend((0..role_count).map(FormRow::Role));
    rows.push(FormRow::Group);
    rows
}

/// Color palette for theming the TUI.
#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub text: Color,
    pub muted: Color,
    pub title: Color,
    pub border: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub status_bg: Color,
    pub status_fg: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    /// Group names that matched the tree search.
    pub match_fg: Color,
    pub badge_fg: Color,
    pub error_fg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            text: Color::Gray,
            muted: Color::DarkGray,
            title: Color::Cyan,
            border: Color::Gray,
            header_bg: Color::Black,
            header_fg: Color::Cyan,
            status_bg: Color::DarkGray,
            status_fg: Color::Black,
            highlight_fg: Color::Yellow,
            highlight_bg: Color::Reset,
            match_fg: Color::LightGreen,
            badge_fg: Color::LightBlue,
            error_fg: Color::LightRed,
        }
    }

    /// Catppuccin Mocha.
    pub fn mocha() -> Self {
        Self {
            text: Color::Rgb(0xcd, 0xd6, 0xf4),         // text
            muted: Color::Rgb(0x7f, 0x84, 0x9c),        // overlay1
            title: Color::Rgb(0xcb, 0xa6, 0xf7),        // mauve
            border: Color::Rgb(0x58, 0x5b, 0x70),       // surface2
            header_bg: Color::Rgb(0x31, 0x32, 0x44),    // surface0
            header_fg: Color::Rgb(0xb4, 0xbe, 0xfe),    // lavender
            status_bg: Color::Rgb(0x45, 0x47, 0x5a),    // surface1
            status_fg: Color::Rgb(0xcd, 0xd6, 0xf4),    // text
            highlight_fg: Color::Rgb(0xf9, 0xe2, 0xaf), // yellow
            highlight_bg: Color::Rgb(0x45, 0x47, 0x5a), // surface1
            match_fg: Color::Rgb(0xa6, 0xe3, 0xa1),     // green
            badge_fg: Color::Rgb(0x89, 0xb4, 0xfa),     // blue
            error_fg: Color::Rgb(0xf3, 0x8b, 0xa8),     // red
        }
    }

    pub fn named(name: ThemeName) -> Self {
        match name {
            ThemeName::Mocha => Self::mocha(),
            ThemeName::Dark => Self::dark(),
        }
    }
}

pub struct AppState {
    pub list: Arc<UserList<Directory>>,
    pub modal: Arc<UserModal<Directory>>,
    pub tree: EntityTreeIndex,
    pub tree_view: SearchView,
    pub tree_query: String,
    pub filter_input: String,
    pub focus: Focus,
    pub input_mode: InputMode,
    /// Row within the current users page.
    pub selected_user_index: usize,
    /// Row within the flattened tree view.
    pub selected_group_index: usize,
    pub form_row: usize,
    /// Group path the open form had when it was loaded.
    pub form_origin_group: Option<String>,
    pub theme: Theme,
    pub keymap: keymap::Keymap,
    pub status: Option<String>,
}

impl AppState {
    pub fn new(
        service: Arc<Directory>,
        tree: EntityTreeIndex,
        config: &ConsoleConfig,
        keymap: keymap::Keymap,
    ) -> Self {
        let list = Arc::new(UserList::new(service.clone(), config.page_size));
        let modal = Arc::new(UserModal::new(service, list.clone()));
        let tree_view = tree.search("");
        Self {
            list,
            modal,
            tree,
            tree_view,
            tree_query: String::new(),
            filter_input: String::new(),
            focus: Focus::Users,
            input_mode: InputMode::Normal,
            selected_user_index: 0,
            selected_group_index: 0,
            form_row: 0,
            form_origin_group: None,
            theme: Theme::named(config.theme),
            keymap,
            status: None,
        }
    }

    /// Recompute the tree view for the current query.
    pub fn research_tree(&mut self) {
        self.tree_view = self.tree.search_auto(&self.tree_query);
        self.selected_group_index = 0;
    }
}

/// Re-export the application event loop entry function.
pub use update::run_app as run;
