//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--disable-ext`, `PATH`)
//! 2. `$PP_CONFIG` environment variable (path to config file)
//! 3. Project-local `.project-picker.toml` in the current working directory
//! 4. Global `~/.config/project-picker/config.toml`
//! 5. Built-in defaults
//!
//! Also home to [`SessionState`], the little bit of state remembered between
//! runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::fs::gateway::DEFAULT_IGNORE_DIRS;

const APP_DIR: &str = "project-picker";

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory when no path is given and no session applies.
    pub default_path: Option<String>,
    /// Confirm before delete operations.
    pub confirm_delete: Option<bool>,
    /// Reopen the last root when started without a path.
    pub restore_last_root: Option<bool>,
}

/// Tree panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Directories always listed first.
    pub dirs_first: Option<bool>,
}

/// Extension filter and scan settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Folder names skipped by scans, deep selection and copies.
    pub ignore_dirs: Option<Vec<String>>,
    /// Extensions switched off right after loading a root.
    pub disabled_extensions: Option<Vec<String>>,
}

/// Log file settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset.
    pub level: Option<String>,
    /// Directory for the rolling log files.
    pub dir: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub filter: FilterConfig,
    pub log: LogConfig,
}

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// The CLI `--config` path is applied separately, on top of these.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("PP_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".project-picker.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_DIR).join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr,
/// since logging is not running yet).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                confirm_delete: other.general.confirm_delete.or(self.general.confirm_delete),
                restore_last_root: other
                    .general
                    .restore_last_root
                    .or(self.general.restore_last_root),
            },
            tree: TreeConfig {
                dirs_first: other.tree.dirs_first.or(self.tree.dirs_first),
            },
            filter: FilterConfig {
                ignore_dirs: other
                    .filter
                    .ignore_dirs
                    .clone()
                    .or(self.filter.ignore_dirs),
                disabled_extensions: other
                    .filter
                    .disabled_extensions
                    .clone()
                    .or(self.filter.disabled_extensions),
            },
            log: LogConfig {
                level: other.log.level.clone().or(self.log.level),
                dir: other.log.dir.clone().or(self.log.dir),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so later files overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn confirm_delete(&self) -> bool {
        self.general.confirm_delete.unwrap_or(true)
    }

    pub fn restore_last_root(&self) -> bool {
        self.general.restore_last_root.unwrap_or(true)
    }

    pub fn default_path(&self) -> Option<PathBuf> {
        self.general.default_path.as_ref().map(PathBuf::from)
    }

    pub fn dirs_first(&self) -> bool {
        self.tree.dirs_first.unwrap_or(true)
    }

    pub fn ignore_dirs(&self) -> Vec<String> {
        match &self.filter.ignore_dirs {
            Some(dirs) => dirs.clone(),
            None => DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn disabled_extensions(&self) -> Vec<String> {
        self.filter.disabled_extensions.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// `None` only when no data directory can be determined.
    pub fn log_dir(&self) -> Option<PathBuf> {
        match &self.log.dir {
            Some(dir) => Some(PathBuf::from(dir)),
            None => data_dir().map(|d| d.join("logs")),
        }
    }
}

fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

// ── Session state ────────────────────────────────────────────────────────────

/// Values remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub last_root: Option<PathBuf>,
}

impl SessionState {
    pub fn default_path() -> Option<PathBuf> {
        data_dir().map(|d| d.join("session.toml"))
    }

    /// Missing or unreadable files give an empty session.
    pub fn load_from(path: &Path) -> SessionState {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return SessionState::default(),
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
            SessionState::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(cfg.confirm_delete());
        assert!(cfg.restore_last_root());
        assert!(cfg.dirs_first());
        assert_eq!(cfg.default_path(), None);
        assert_eq!(cfg.log_level(), "info");
        assert!(cfg.disabled_extensions().is_empty());
        assert!(cfg.ignore_dirs().contains(&"node_modules".to_string()));
        assert_eq!(cfg.ignore_dirs().len(), DEFAULT_IGNORE_DIRS.len());
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
default_path = "/work"
confirm_delete = false
restore_last_root = false

[tree]
dirs_first = false

[filter]
ignore_dirs = ["vendor"]
disabled_extensions = ["lock", ".md"]

[log]
level = "debug"
dir = "/tmp/pp-logs"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.default_path(), Some(PathBuf::from("/work")));
        assert!(!cfg.confirm_delete());
        assert!(!cfg.restore_last_root());
        assert!(!cfg.dirs_first());
        assert_eq!(cfg.ignore_dirs(), vec!["vendor".to_string()]);
        assert_eq!(cfg.disabled_extensions(), vec!["lock".to_string(), ".md".to_string()]);
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.log_dir(), Some(PathBuf::from("/tmp/pp-logs")));
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[tree]
dirs_first = false
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(!cfg.dirs_first());
        assert!(cfg.confirm_delete());
        assert_eq!(cfg.log_level(), "info");
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert!(cfg.confirm_delete());
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                confirm_delete: Some(true),
                default_path: Some("/base".into()),
                ..Default::default()
            },
            filter: FilterConfig {
                disabled_extensions: Some(vec!["md".into()]),
                ..Default::default()
            },
            ..Default::default()
        };

        let over = AppConfig {
            general: GeneralConfig {
                confirm_delete: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(!merged.confirm_delete()); // overridden
        assert_eq!(merged.default_path(), Some(PathBuf::from("/base"))); // from base
        assert_eq!(merged.disabled_extensions(), vec!["md".to_string()]);
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            log: LogConfig {
                level: Some("warn".into()),
                dir: None,
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert_eq!(merged.log_level(), "warn");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[filter]
disabled_extensions = ["json"]
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.disabled_extensions(), vec!["json".to_string()]);
        assert!(cfg.dirs_first());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[general]
confirm_delete = false

[filter]
disabled_extensions = ["md"]
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            filter: FilterConfig {
                disabled_extensions: Some(vec!["txt".into()]),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.disabled_extensions(), vec!["txt".to_string()]);
        assert!(!cfg.confirm_delete());
    }

    #[test]
    fn test_session_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.toml");
        let state = SessionState {
            last_root: Some(PathBuf::from("/projects/demo")),
        };
        state.save_to(&path).expect("save");
        assert_eq!(SessionState::load_from(&path), state);
    }

    #[test]
    fn test_session_missing_or_corrupt_is_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("none.toml");
        assert_eq!(SessionState::load_from(&missing), SessionState::default());
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "last_root = [").expect("write");
        assert_eq!(SessionState::load_from(&bad), SessionState::default());
    }
}
