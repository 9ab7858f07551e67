use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_WORKERS: usize = 4;

const ENV_CONFIG: &str = "GITRELLO_CONFIG";
const ENV_APP_KEY: &str = "GITRELLO_APPKEY";
const ENV_TRELLO_TOKEN: &str = "GITRELLO_TRELLO_TOKEN";
const ENV_BOARD_ID: &str = "GITRELLO_BOARDID";
const ENV_SYNC_TIMEOUT: &str = "GITRELLO_SYNC_TIMEOUT";
const ENV_GITHUB_TOKEN: &str = "GITRELLO_GITHUB_TOKEN";
const ENV_WORKERS: &str = "GITRELLO_WORKERS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("no lists configured; add a [lists] table mapping list names to search queries")]
    NoLists,
    #[error("list name cannot be blank")]
    BlankListName,
    #[error("list '{0}' has an empty search query")]
    EmptyQuery(String),
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

/// On-disk shape of `config.toml`. Every field is optional here; presence is
/// checked by [`Config::from_sources`] after environment overrides apply.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub board_id: Option<String>,
    pub sync_interval_secs: Option<u64>,
    pub workers: Option<usize>,
    #[serde(default)]
    pub reconcile_lists_each_pass: bool,
    pub trello: Option<FileTrelloConfig>,
    pub github: Option<FileGitHubConfig>,
    #[serde(default)]
    pub lists: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FileTrelloConfig {
    pub api_key: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FileGitHubConfig {
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct TrelloCredentials {
    pub api_key: String,
    pub token: String,
}

/// One tracked board list and the search that populates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSpec {
    pub name: String,
    pub query: String,
}

/// Validated, immutable runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub trello: TrelloCredentials,
    pub board_id: String,
    pub github_token: Option<String>,
    /// Sorted by name; names are unique.
    pub lists: Vec<ListSpec>,
    pub sync_interval: Duration,
    pub workers: usize,
    pub reconcile_lists_each_pass: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("board_id", &self.board_id)
            .field("trello", &"<redacted>")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("lists", &self.lists)
            .field("sync_interval", &self.sync_interval)
            .field("workers", &self.workers)
            .field("reconcile_lists_each_pass", &self.reconcile_lists_each_pass)
            .finish()
    }
}

impl Config {
    /// Merge the file with environment overrides and validate the result.
    /// `env` returns the value of a variable, if set.
    pub fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let trello = file.trello.unwrap_or_default();

        let api_key = env(ENV_APP_KEY)
            .or(trello.api_key)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("trello.api_key / GITRELLO_APPKEY"))?;
        let token = env(ENV_TRELLO_TOKEN)
            .or(trello.token)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("trello.token / GITRELLO_TRELLO_TOKEN"))?;
        let board_id = env(ENV_BOARD_ID)
            .or(file.board_id)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("board_id / GITRELLO_BOARDID"))?;
        let github_token = env(ENV_GITHUB_TOKEN)
            .or(file.github.and_then(|g| g.token))
            .filter(|v| !v.trim().is_empty());

        let sync_interval_secs = match env(ENV_SYNC_TIMEOUT) {
            Some(raw) => parse_positive(ENV_SYNC_TIMEOUT, &raw)?,
            None => file.sync_interval_secs.unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
        };
        if sync_interval_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "sync_interval_secs",
                value: "0".into(),
            });
        }

        let workers = match env(ENV_WORKERS) {
            Some(raw) => parse_positive(ENV_WORKERS, &raw)? as usize,
            None => file.workers.unwrap_or(DEFAULT_WORKERS),
        };
        if workers == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "workers",
                value: "0".into(),
            });
        }

        if file.lists.is_empty() {
            return Err(ConfigError::NoLists);
        }
        let mut lists = Vec::with_capacity(file.lists.len());
        for (name, query) in file.lists {
            if name.trim().is_empty() {
                return Err(ConfigError::BlankListName);
            }
            if query.trim().is_empty() {
                return Err(ConfigError::EmptyQuery(name));
            }
            lists.push(ListSpec { name, query });
        }

        Ok(Config {
            trello: TrelloCredentials { api_key, token },
            board_id,
            github_token,
            lists,
            sync_interval: Duration::from_secs(sync_interval_secs),
            workers,
            reconcile_lists_each_pass: file.reconcile_lists_each_pass,
        })
    }

    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.lists.iter().map(|l| l.name.as_str())
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gitrello")
        .join("config.toml")
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration from `explicit` (or `$GITRELLO_CONFIG`, or the default
/// location) and the process environment. A path the user named must exist;
/// the default location may be absent.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));

    let file = match named {
        Some(path) => read_file_config(&path)?,
        None => {
            let path = default_config_path();
            if path.exists() {
                read_file_config(&path)?
            } else {
                FileConfig::default()
            }
        }
    };

    Config::from_sources(file, |key| std::env::var(key).ok())
}
