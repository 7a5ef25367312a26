//! Configuration for the onboard client.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ONBOARD_HOME, ONBOARD_API_URL)
//! 2. Config file (.onboard/config.yaml)
//! 3. Defaults (~/.onboard, http://localhost:1337/api)
//!
//! Config file discovery:
//! - Searches current directory and parents for .onboard/config.yaml
//! - Paths in config file are relative to the .onboard/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_API_URL: &str = "http://localhost:1337/api";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub session: Option<SessionConfig>,
    #[serde(default)]
    pub journal: Option<JournalConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Token file (relative to config file)
    pub token_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    /// Signal journal JSONL file (relative to config file)
    pub path: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to onboard home (session token, journal)
    pub home: PathBuf,
    /// Remote API settings
    pub api: ApiSettings,
    /// Session token file
    pub session_token_file: PathBuf,
    /// Where to write the signal journal, if anywhere
    pub journal_path: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".onboard").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Merge file settings and environment overrides on top of defaults
fn resolve(
    file: Option<(&Path, ConfigFile)>,
    env_home: Option<String>,
    env_api_url: Option<String>,
    default_home: PathBuf,
) -> ResolvedConfig {
    let Some((config_path, config)) = file else {
        let home = env_home.map(PathBuf::from).unwrap_or(default_home);
        let api = ApiSettings {
            base_url: env_api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            ..ApiSettings::default()
        };
        return ResolvedConfig {
            session_token_file: home.join("session.token"),
            journal_path: None,
            home,
            api,
            config_file: None,
        };
    };

    // Relative paths are resolved against .onboard/
    let base_dir = config_path.parent().unwrap_or(Path::new("."));

    let home = if let Some(env_home) = env_home {
        PathBuf::from(env_home)
    } else if let Some(ref home) = config.home {
        resolve_path(base_dir, home)
    } else {
        default_home
    };

    let api = ApiSettings {
        base_url: env_api_url
            .or_else(|| config.api.as_ref().and_then(|a| a.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        timeout_seconds: config
            .api
            .as_ref()
            .and_then(|a| a.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
    };

    let session_token_file = config
        .session
        .as_ref()
        .and_then(|s| s.token_file.as_deref())
        .map(|p| resolve_path(base_dir, p))
        .unwrap_or_else(|| home.join("session.token"));

    let journal_path = config
        .journal
        .as_ref()
        .and_then(|j| j.path.as_deref())
        .map(|p| resolve_path(base_dir, p));

    ResolvedConfig {
        home,
        api,
        session_token_file,
        journal_path,
        config_file: Some(config_path.to_path_buf()),
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".onboard");

    let file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(
        file.as_ref().map(|(path, config)| (path.as_path(), config.clone())),
        std::env::var("ONBOARD_HOME").ok(),
        std::env::var("ONBOARD_API_URL").ok(),
        default_home,
    ))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
