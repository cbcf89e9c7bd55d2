//! Application configuration for brandctx.
//!
//! User config lives at `~/.brandctx/brandctx.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brandctx.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brandctx";

/// Placeholder returned by the prompt projection before onboarding.
pub const DEFAULT_PROMPT_PLACEHOLDER: &str = "No company context available yet. \
Complete onboarding to personalize generated content.";

// ---------------------------------------------------------------------------
// Config structs (matching brandctx.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Persistence backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Prompt projection settings.
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// Which persistence backend holds the Context Document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON file per key in a directory.
    #[default]
    File,
    /// Embedded libSQL database.
    Sqlite,
    /// In-process only; nothing survives the process.
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ContextError::config(format!(
                "unknown storage backend '{other}': expected file, sqlite, or memory"
            ))),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend implementation.
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory (file backend) or database file (sqlite backend).
    /// A leading `~` is expanded to the home directory.
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// The single logical key holding the serialized document.
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: default_storage_path(),
            key: default_storage_key(),
        }
    }
}

impl StorageConfig {
    /// The storage path with `~` expanded.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        expand_home(&self.path)
    }
}

fn default_storage_path() -> String {
    "~/.brandctx/data".into()
}
fn default_storage_key() -> String {
    "company-context".into()
}

/// `[prompt]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Text returned by the prompt projection when no document is loaded.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
        }
    }
}

fn default_placeholder() -> String {
    DEFAULT_PROMPT_PLACEHOLDER.into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brandctx/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ContextError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brandctx/brandctx.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with(['/', '\\']) => rest.trim_start_matches(['/', '\\']),
        // `~user/...` and names that merely start with `~` are left alone.
        _ => return Ok(PathBuf::from(path)),
    };
    let home =
        dirs::home_dir().ok_or_else(|| ContextError::config("could not determine home directory"))?;
    Ok(home.join(rest))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ContextError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ContextError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContextError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContextError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContextError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("backend = \"file\""));
        assert!(toml_str.contains("company-context"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.storage.backend, BackendKind::File);
        assert_eq!(parsed.storage.key, "company-context");
        assert_eq!(parsed.prompt.placeholder, DEFAULT_PROMPT_PLACEHOLDER);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[storage]
backend = "sqlite"
path = "/tmp/brandctx/context.db"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.key, "company-context");
        assert_eq!(
            config.storage.resolved_path().unwrap(),
            PathBuf::from("/tmp/brandctx/context.db")
        );
    }

    #[test]
    fn unknown_backend_rejected() {
        let result = toml::from_str::<AppConfig>("[storage]\nbackend = \"redis\"\n");
        assert!(result.is_err());
        assert!("redis".parse::<BackendKind>().is_err());
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
    }

    #[test]
    fn tilde_expansion() {
        let expanded = expand_home("~/.brandctx/data").expect("expand");
        assert!(expanded.ends_with(".brandctx/data"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn tilde_only_expands_for_current_user() {
        assert_eq!(expand_home("~other/x").unwrap(), PathBuf::from("~other/x"));
        assert_eq!(expand_home("~backup").unwrap(), PathBuf::from("~backup"));
        assert_eq!(expand_home("data/dir").unwrap(), PathBuf::from("data/dir"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~").unwrap(), home);
        }
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let result = load_config_from(Path::new("/nonexistent/brandctx.toml"));
        assert!(matches!(result, Err(ContextError::Io { .. })));
    }
}
