//! Per-user configuration.
//!
//! Everything lives in `~/.friendlyshell`: the optional `config.toml`, the
//! command history and the log file. The folder may hold secrets typed at
//! the prompt, so it is only readable by its owner.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ShellError};

pub const CONFIG_FOLDER_NAME: &str = ".friendlyshell";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const HISTORY_FILE_NAME: &str = "history";
pub const LOG_FILE_NAME: &str = "friendlyshell.log";

/// Key bindings of the interactive prompt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    Emacs,
    Vi,
}

impl From<EditMode> for rustyline::EditMode {
    fn from(mode: EditMode) -> Self {
        match mode {
            EditMode::Emacs => rustyline::EditMode::Emacs,
            EditMode::Vi => rustyline::EditMode::Vi,
        }
    }
}

/// How tab completion presents multiple candidates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStyle {
    /// List all candidates below the prompt
    #[default]
    List,
    /// Cycle through candidates on each tab press
    Circular,
}

impl From<CompletionStyle> for rustyline::CompletionType {
    fn from(style: CompletionStyle) -> Self {
        match style {
            CompletionStyle::List => rustyline::CompletionType::List,
            CompletionStyle::Circular => rustyline::CompletionType::Circular,
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of history entries kept
    pub history_size: usize,

    /// Persist history between sessions
    pub save_history: bool,

    pub edit_mode: EditMode,

    pub completion: CompletionStyle,

    /// `tracing` filter directives for the log file
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_size: 1000,
            save_history: true,
            edit_mode: EditMode::default(),
            completion: CompletionStyle::default(),
            log_filter: "debug".to_string(),
        }
    }
}

/// Settings plus the folder they were loaded from.
///
/// A configuration without a folder keeps nothing on disk: no history and no
/// log file.
#[derive(Debug, Clone, Default)]
pub struct ShellConfig {
    folder: Option<PathBuf>,
    settings: Settings,
}

impl ShellConfig {
    /// Loads the configuration from `~/.friendlyshell`.
    pub fn load() -> Result<Self> {
        Self::load_from(default_folder()?)
    }

    /// Loads the configuration from `folder`, creating it when missing.
    pub fn load_from(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        ensure_folder(&folder)?;

        let config_path = folder.join(CONFIG_FILE_NAME);
        let settings = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading configuration");
            let content = fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| ShellError::Config {
                path: config_path.clone(),
                message: e.message().to_string(),
            })?
        } else {
            Settings::default()
        };

        Ok(Self {
            folder: Some(folder),
            settings,
        })
    }

    /// In-memory configuration, nothing is read from or written to disk.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            folder: None,
            settings,
        }
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Where the command history is kept, if it should be kept at all.
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.settings.save_history {
            return None;
        }
        self.folder.as_ref().map(|folder| folder.join(HISTORY_FILE_NAME))
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.folder.as_ref().map(|folder| folder.join(LOG_FILE_NAME))
    }
}

/// `~/.friendlyshell` for the current user
pub fn default_folder() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(CONFIG_FOLDER_NAME))
        .ok_or(ShellError::NoHomeDirectory)
}

fn ensure_folder(folder: &Path) -> Result<()> {
    if folder.is_dir() {
        return Ok(());
    }
    debug!(path = %folder.display(), "Creating configuration folder");

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(folder)?;
    }
    #[cfg(not(unix))]
    fs::create_dir_all(folder)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = ShellConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.settings(), &Settings::default());
        assert_eq!(config.settings().history_size, 1000);
        assert_eq!(config.history_path(), Some(dir.path().join("history")));
        assert_eq!(config.log_path(), Some(dir.path().join("friendlyshell.log")));
    }

    #[test]
    fn test_parse_partial_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
edit_mode = "vi"
completion = "circular"
save_history = false
"#,
        )
        .unwrap();

        let config = ShellConfig::load_from(dir.path()).unwrap();
        let settings = config.settings();
        assert_eq!(settings.edit_mode, EditMode::Vi);
        assert_eq!(settings.completion, CompletionStyle::Circular);
        assert_eq!(settings.history_size, 1000);
        assert_eq!(config.history_path(), None);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "edit_mode = \"nano\"").unwrap();

        let err = ShellConfig::load_from(dir.path()).unwrap_err();
        match err {
            ShellError::Config { path, .. } => assert!(path.ends_with(CONFIG_FILE_NAME)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_folder_is_created() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("nested").join(CONFIG_FOLDER_NAME);
        ShellConfig::load_from(&folder).unwrap();
        assert!(folder.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&folder).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_in_memory_config_has_no_files() {
        let config = ShellConfig::default();
        assert!(config.folder().is_none());
        assert!(config.history_path().is_none());
        assert!(config.log_path().is_none());
    }
}
