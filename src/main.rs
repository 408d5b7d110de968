//! usrdir-console binary entry point.
//!
//! Loads configuration and seed data, initializes the terminal in raw mode,
//! runs the TUI event loop, and restores the terminal state on exit.
//!
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use usrdir_console::app::{self, AppState, keymap::Keymap};
use usrdir_console::config::ConsoleConfig;
use usrdir_console::directory::{DirectorySeed, DirectoryService, InMemoryDirectory};
use usrdir_console::tree::{EntityTreeIndex, GroupSource};

#[derive(Parser, Debug)]
#[command(name = "usrdir-console", version, about = "Terminal console for a user directory")]
struct Cli {
    /// Config file (key = value)
    #[arg(long, env = "USRDIR_CONFIG", default_value = "console.conf")]
    config: String,

    /// JSON seed with roles and users; the bundled sample is used otherwise
    #[arg(long, env = "USRDIR_USERS")]
    users: Option<PathBuf>,

    /// JSON forest of user groups
    #[arg(long, env = "USRDIR_GROUPS")]
    groups: Option<PathBuf>,

    #[arg(long)]
    page_size: Option<usize>,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut config: ConsoleConfig) -> ConsoleConfig {
        if let Some(users) = self.users {
            config.users_file = Some(users);
        }
        if let Some(groups) = self.groups {
            config.groups_file = Some(groups);
        }
        if let Some(size) = self.page_size.filter(|s| *s > 0) {
            config.page_size = size;
        }
        if let Some(log_file) = self.log_file {
            config.log_file = log_file;
        }
        config
    }
}

/// The terminal owns stdout, so logs go to a file.
fn init_tracing(config: &ConsoleConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("open log file {}", config.log_file.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter.as_str().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn load_directory(config: &ConsoleConfig) -> Result<InMemoryDirectory> {
    let seed = match &config.users_file {
        Some(path) => DirectorySeed::from_file(path),
        None => DirectorySeed::sample(),
    }
    .map_err(|e| anyhow::anyhow!("load users: {e}"))?;
    Ok(InMemoryDirectory::new(seed))
}

fn load_groups(config: &ConsoleConfig) -> Result<EntityTreeIndex> {
    let forest = match &config.groups_file {
        Some(path) => GroupSource::forest_from_file(path),
        None => GroupSource::sample_forest(),
    }
    .map_err(|e| anyhow::anyhow!("load groups: {e}"))?;
    Ok(EntityTreeIndex::build(&forest))
}

/// Initialize a Crossterm-backed `ratatui` terminal in raw mode.
fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Program entry point: run the TUI and report any top-level error to stderr.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = cli.apply(ConsoleConfig::load_or_init(&config_path));
    init_tracing(&config)?;

    let service: Arc<dyn DirectoryService> = Arc::new(load_directory(&config)?);
    let tree = load_groups(&config)?;
    info!(groups = tree.len(), page_size = config.page_size, "console starting");
    let mut state = AppState::new(service, tree, &config, Keymap::load_or_init("keybinds.conf"));

    let mut terminal = init_terminal().context("init terminal")?;

    let res = app::run(&mut terminal, &mut state).await;

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    if let Err(err) = res {
        eprintln!("application error: {err}");
    }
    info!("console stopped");
    Ok(())
}
