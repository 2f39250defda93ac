use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default = "default_notes")]
    pub notes: CollectionConfig,
    #[serde(default = "default_journal")]
    pub journal: CollectionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            notes: default_notes(),
            journal: default_journal(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    /// `owner/name` on the content host.
    #[serde(default = "default_repository")]
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Name of the environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            repository: default_repository(),
            branch: default_branch(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reads the credential from the configured environment variable.
    /// Unset and blank values both mean "no credential".
    pub fn credential(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Which files of the remote tree make up a collection.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub prefix: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl CollectionConfig {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix) && path.ends_with(&self.suffix)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Seconds a loaded snapshot is reused; 0 reloads on every request.
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cache_ttl_secs: 0,
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}
fn default_repository() -> String {
    "ahson01/public-stuff".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_token_env() -> String {
    "GITHUB_API_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_concurrency() -> usize {
    8
}
fn default_suffix() -> String {
    ".md".to_string()
}
fn default_notes() -> CollectionConfig {
    CollectionConfig::new("notes/", ".md")
}
fn default_journal() -> CollectionConfig {
    CollectionConfig::new("journal/", ".md")
}
fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    let remote = &config.remote;
    let mut parts = remote.repository.split('/');
    let well_formed = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    );
    if !well_formed {
        return Err(Error::Config(format!(
            "remote.repository must be 'owner/name', got '{}'",
            remote.repository
        )));
    }
    if remote.branch.is_empty() {
        return Err(Error::Config("remote.branch must not be empty".into()));
    }
    if remote.timeout_secs == 0 {
        return Err(Error::Config("remote.timeout_secs must be > 0".into()));
    }
    if remote.concurrency == 0 {
        return Err(Error::Config("remote.concurrency must be > 0".into()));
    }
    for (name, collection) in [("notes", &config.notes), ("journal", &config.journal)] {
        if collection.prefix.is_empty() {
            return Err(Error::Config(format!("{name}.prefix must not be empty")));
        }
    }
    Ok(())
}
