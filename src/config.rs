//! Configuration file parser for ~/.config/tumbledash/config.toml.
//!
//! Unlike most settings, the OAuth credentials have no usable default, so a
//! missing file is an error rather than `Config::default()`. Every other key is
//! optional. Unknown keys are accepted but logged as potential typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::DEFAULT_SELF_LINK;
use crate::paginate::{DEFAULT_PAGE_SIZE, DEFAULT_POST_COUNT};
use crate::tumblr::{OAuthCredentials, DEFAULT_API_BASE_URL};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Missing credential `{0}`: set it under [credentials] or via {1}")]
    MissingCredential(&'static str, &'static str),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// OAuth credentials as written in the config file.
///
/// Each value may instead come from the environment; see [`Config::credentials`].
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub token: Option<String>,
    pub token_secret: Option<String>,
}

/// Only reports which credentials are present, never their values.
impl std::fmt::Debug for CredentialsSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CredentialsSection")
            .field("consumer_key", &mask(&self.consumer_key))
            .field("consumer_secret", &mask(&self.consumer_secret))
            .field("token", &mask(&self.token))
            .field("token_secret", &mask(&self.token_secret))
            .finish()
    }
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsSection,

    /// Number of dashboard posts to include in the feed.
    pub post_count: u32,

    /// Posts requested per API call, at most 20 (the API limit).
    pub page_size: u32,

    /// Dashboard position of the first post to fetch.
    pub starting_offset: u32,

    /// Maximum API calls in flight. 1 fetches strictly one page at a time.
    pub concurrency: usize,

    pub api_base_url: String,

    /// Public URL of the generated feed, used for the atom self link.
    pub feed_self_url: String,

    pub output_path: PathBuf,

    /// Where `--dump` writes the raw post JSON.
    pub dump_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: CredentialsSection::default(),
            post_count: DEFAULT_POST_COUNT,
            page_size: DEFAULT_PAGE_SIZE,
            starting_offset: 0,
            concurrency: 1,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            feed_self_url: DEFAULT_SELF_LINK.to_string(),
            output_path: PathBuf::from("dashboard.xml"),
            dump_path: PathBuf::from("dash_output.json"),
        }
    }
}

const CREDENTIAL_ENV_VARS: [(&str, &str); 4] = [
    ("consumer_key", "TUMBLR_CONSUMER_KEY"),
    ("consumer_secret", "TUMBLR_CONSUMER_SECRET"),
    ("token", "TUMBLR_TOKEN"),
    ("token_secret", "TUMBLR_TOKEN_SECRET"),
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::NotFound)`
    /// - Empty file → defaults (credentials must then come from the environment)
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Size is checked before reading the file
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "credentials",
                "post_count",
                "page_size",
                "starting_offset",
                "concurrency",
                "api_base_url",
                "feed_self_url",
                "output_path",
                "dump_path",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), post_count = config.post_count, "Loaded configuration");
        Ok(config)
    }

    /// Resolves the OAuth credentials, preferring environment variables over
    /// the config file.
    pub fn credentials(&self) -> Result<OAuthCredentials, ConfigError> {
        self.credentials_with_env(|name| std::env::var(name).ok())
    }

    fn credentials_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<OAuthCredentials, ConfigError> {
        let section = &self.credentials;
        let resolve = |index: usize, from_file: &Option<String>| {
            let (field, var) = CREDENTIAL_ENV_VARS[index];
            env(var)
                .filter(|v| !v.is_empty())
                .or_else(|| from_file.clone().filter(|v| !v.is_empty()))
                .map(SecretString::from)
                .ok_or(ConfigError::MissingCredential(field, var))
        };

        Ok(OAuthCredentials {
            consumer_key: resolve(0, &section.consumer_key)?,
            consumer_secret: resolve(1, &section.consumer_secret)?,
            token: resolve(2, &section.token)?,
            token_secret: resolve(3, &section.token_secret)?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
