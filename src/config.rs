use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ACCESS_KEY: &str = "app:app";
pub const DEFAULT_SECRET_KEY: &str = "secret";
pub const DEFAULT_ENDPOINT: &str = "https://paraio.com";

pub const ENV_ACCESS_KEY: &str = "PARA_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "PARA_SECRET_KEY";
pub const ENV_ENDPOINT: &str = "PARA_ENDPOINT";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub client: ClientConfig,
    /// Where this config was loaded from and is saved to.
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CredentialsConfig {
    #[serde(default = "default_access_key")]
    pub access_key: String,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token; takes over from request signing when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            access_key: default_access_key(),
            secret_key: default_secret_key(),
            endpoint: default_endpoint(),
            jwt: None,
        }
    }
}

fn default_access_key() -> String {
    DEFAULT_ACCESS_KEY.to_string()
}
fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestConfig {
    /// Byte ceiling for one batch, and the text size above which a file is
    /// chunked.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_batch_size() -> u64 {
    350 * 1024
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay; doubles on every further attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    1000
}

/// Credential values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub endpoint: Option<String>,
}

impl Config {
    /// Layer environment variables, then `overrides`, over the file values.
    pub fn apply_overrides<F>(&mut self, env: F, overrides: &CredentialOverrides)
    where
        F: Fn(&str) -> Option<String>,
    {
        let creds = &mut self.credentials;
        let pick = |flag: &Option<String>, var: &str| {
            flag.clone()
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };
        if let Some(v) = pick(&overrides.access_key, ENV_ACCESS_KEY) {
            creds.access_key = v;
        }
        if let Some(v) = pick(&overrides.secret_key, ENV_SECRET_KEY) {
            creds.secret_key = v;
        }
        if let Some(v) = pick(&overrides.endpoint, ENV_ENDPOINT) {
            creds.endpoint = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingest.max_batch_size == 0 {
            bail!("ingest.max_batch_size must be > 0");
        }
        let endpoint = &self.credentials.endpoint;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            bail!(
                "credentials.endpoint must be an http:// or https:// URL, got '{}'",
                endpoint
            );
        }
        if self.credentials.access_key.is_empty() {
            bail!("credentials.access_key must not be empty");
        }
        Ok(())
    }
}

/// `$HOME/.config/para-cli/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set; pass --config")?;
    Ok(PathBuf::from(home).join(".config/para-cli/config.toml"))
}

/// Expand a leading `~/` against `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Read `path` (defaults when it does not exist), apply environment and
/// command-line overrides, and validate.
pub fn load_config(path: &Path, overrides: &CredentialOverrides) -> Result<Config> {
    let mut config = read_config_file(&expand_tilde(path))?;
    config.apply_overrides(|var| std::env::var(var).ok(), overrides);
    config.validate()?;
    Ok(config)
}

/// The file's own values, without environment or flag overrides.
fn read_config_file(path: &Path) -> Result<Config> {
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        Config::default()
    };
    config.path = path.to_path_buf();
    Ok(config)
}

/// Apply `update` to the values stored at `path` and write them back.
///
/// Overrides from the environment or the command line are never persisted;
/// only what `update` changes lands in the file.
pub fn update_config_file<F>(path: &Path, update: F) -> Result<()>
where
    F: FnOnce(&mut Config),
{
    let mut stored = read_config_file(path)?;
    update(&mut stored);
    save_config(&stored)
}

/// Write `config` to its path, creating parent directories. The file holds
/// secrets and is only readable by its owner on unix.
pub fn save_config(config: &Config) -> Result<()> {
    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    write_private(&config.path, &content)
        .with_context(|| format!("Failed to write config file: {}", config.path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    std::fs::write(path, content)
}
