//! Console configuration: parse/write `console.conf`.
//!
//! The file uses `key = value` lines; `#` starts a comment and unknown keys are
//! skipped. Command-line flags override whatever the file says.
//!
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::list::DEFAULT_PAGE_SIZE;

pub const APP_DIR: &str = "usrdir-console";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ThemeName {
    #[default]
    Mocha,
    Dark,
}

impl ThemeName {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mocha" => Some(ThemeName::Mocha),
            "dark" => Some(ThemeName::Dark),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ThemeName::Mocha => "mocha",
            ThemeName::Dark => "dark",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Rows per users page; always > 0.
    pub page_size: usize,
    /// Directory seed (JSON). The built-in sample is used when unset.
    pub users_file: Option<PathBuf>,
    /// Group forest (JSON). The built-in sample is used when unset.
    pub groups_file: Option<PathBuf>,
    pub log_file: PathBuf,
    pub log_filter: String,
    pub theme: ThemeName,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            users_file: None,
            groups_file: None,
            log_file: PathBuf::from("usrdir-console.log"),
            log_filter: "info".to_string(),
            theme: ThemeName::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load from `path`, falling back to the per-user config dir; write defaults when neither exists.
    pub fn load_or_init(path: &str) -> Self {
        if Path::new(path).exists() {
            return Self::from_file(path).unwrap_or_default();
        }
        if let Some(existing) = config_file_read_path("console.conf") {
            return Self::from_file(&existing).unwrap_or_default();
        }
        let cfg = Self::default();
        if let Err(err) = cfg.write_file(path) {
            warn!(path, error = %err, "could not write default console config");
        }
        cfg
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        Some(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut cfg = Self::default();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let key = parts.next().map(str::trim).unwrap_or("");
            let val = parts.next().map(str::trim).unwrap_or("");
            if key.is_empty() || val.is_empty() {
                continue;
            }
            match key {
                "page_size" => match val.parse::<usize>() {
                    Ok(n) if n > 0 => cfg.page_size = n,
                    _ => warn!(value = val, "ignoring invalid page_size"),
                },
                "users_file" => cfg.users_file = Some(PathBuf::from(val)),
                "groups_file" => cfg.groups_file = Some(PathBuf::from(val)),
                "log_file" => cfg.log_file = PathBuf::from(val),
                "log_filter" => cfg.log_filter = val.to_string(),
                "theme" => {
                    if let Some(theme) = ThemeName::parse(val) {
                        cfg.theme = theme;
                    }
                }
                _ => {}
            }
        }
        cfg
    }

    pub fn write_file(&self, path: &str) -> std::io::Result<()> {
        use std::fmt::Write as _;
        let mut buf = String::new();
        buf.push_str("# usrdir-console configuration\n");
        buf.push_str("# users_file / groups_file: JSON seeds; leave unset for the built-in sample\n\n");
        let _ = writeln!(&mut buf, "page_size = {}", self.page_size);
        if let Some(p) = &self.users_file {
            let _ = writeln!(&mut buf, "users_file = {}", p.display());
        }
        if let Some(p) = &self.groups_file {
            let _ = writeln!(&mut buf, "groups_file = {}", p.display());
        }
        let _ = writeln!(&mut buf, "log_file = {}", self.log_file.display());
        let _ = writeln!(&mut buf, "log_filter = {}", self.log_filter);
        let _ = writeln!(&mut buf, "theme = {}", self.theme.as_str());
        std::fs::write(path, buf)
    }
}

/// Look for `name` under `$XDG_CONFIG_HOME/usrdir-console/` then `$HOME/.config/usrdir-console/`.
pub fn config_file_read_path(name: &str) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg).join(APP_DIR).join(name));
    }
    if let Some(home) = std::env::var_os("HOME") {
        candidates.push(PathBuf::from(home).join(".config").join(APP_DIR).join(name));
    }
    candidates
        .into_iter()
        .find(|p| p.exists())
        .map(|p| p.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_known_keys_and_skips_noise() {
        let cfg = ConsoleConfig::parse(
            "# comment\n\
             page_size = 25\n\
             users_file = /srv/users.json\n\
             theme = DARK\n\
             bogus = 1\n\
             log_filter = usrdir_console=debug\n\
             = orphan\n",
        );
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.users_file, Some(PathBuf::from("/srv/users.json")));
        assert_eq!(cfg.groups_file, None);
        assert_eq!(cfg.theme, ThemeName::Dark);
        assert_eq!(cfg.log_filter, "usrdir_console=debug");
    }

    #[test]
    fn zero_page_size_keeps_default() {
        let cfg = ConsoleConfig::parse("page_size = 0\n");
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
    }
}
