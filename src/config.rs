//! Configuration management for the overdue flagger.
//!
//! Configuration is read once at startup from environment variables:
//! - `ASANA_PAT` - Required. Personal access token sent as a bearer credential.
//! - `ASANA_PROJECT_GID` - Required. The project to scan.
//! - `FLAG_STRATEGY` - Optional. `tag`, `custom_field` or `name_prefix`.
//!   Defaults to `custom_field`.
//! - `OVERDUE_TAG_NAME` - Optional. Tag strategy: tag to find or create. Defaults to `Overdue`.
//! - `CUSTOM_FIELD_GID` - Required for `custom_field`. The enum custom field to set.
//! - `OVERDUE_OPTION_GID` - Required for `custom_field`. The enum option meaning "overdue".
//! - `OVERDUE_NAME_PREFIX` - Optional. Name-prefix strategy marker. Defaults to `[OVERDUE] `.
//! - `DRY_RUN` - Optional. Report intended mutations without issuing them. Defaults to `false`.
//! - `ASANA_BASE_URL` - Optional. API root. Defaults to `https://app.asana.com/api/1.0`.
//! - `ASANA_PAGE_SIZE` - Optional. Page size for listings (1-100). Defaults to `100`.
//! - `ASANA_MAX_RATE_LIMIT_RETRIES` - Optional. Give up after this many consecutive 429s.
//!   Unset means retry forever.

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";
pub const DEFAULT_TAG_NAME: &str = "Overdue";
pub const DEFAULT_NAME_PREFIX: &str = "[OVERDUE] ";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// How overdue-ness is recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagConfig {
    /// Add/remove a workspace tag (found or created by name).
    Tag { tag_name: String },

    /// Set an enum custom field to a specific option.
    CustomField { field_gid: String, option_gid: String },

    /// Prepend a marker to the task name.
    NamePrefix { prefix: String },
}

impl FlagConfig {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            FlagConfig::Tag { .. } => "tag",
            FlagConfig::CustomField { .. } => "custom_field",
            FlagConfig::NamePrefix { .. } => "name_prefix",
        }
    }
}

/// Runtime configuration for a single reconciliation run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Asana personal access token
    pub access_token: String,

    /// Project to scan
    pub project_gid: String,

    /// API root, without trailing slash
    pub base_url: String,

    /// `limit` sent with every paged listing
    pub page_size: u32,

    /// Selected flag strategy and its identifiers
    pub flag: FlagConfig,

    /// When set, mutating calls are logged instead of issued
    pub dry_run: bool,

    /// Optional cap on consecutive rate-limit retries (None = unbounded)
    pub max_rate_limit_retries: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if a required variable is not set, and
    /// `ConfigError::InvalidValue` if a value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup (used by `from_env` and tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values are treated as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require =
            |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let access_token = require("ASANA_PAT")?;
        let project_gid = require("ASANA_PROJECT_GID")?;

        let strategy = get("FLAG_STRATEGY").unwrap_or_else(|| "custom_field".to_string());
        let flag = match strategy.trim().to_ascii_lowercase().as_str() {
            "tag" => FlagConfig::Tag {
                tag_name: get("OVERDUE_TAG_NAME").unwrap_or_else(|| DEFAULT_TAG_NAME.to_string()),
            },
            "custom_field" | "custom-field" => FlagConfig::CustomField {
                field_gid: require("CUSTOM_FIELD_GID")?,
                option_gid: require("OVERDUE_OPTION_GID")?,
            },
            "name_prefix" | "name-prefix" => FlagConfig::NamePrefix {
                // Not trimmed: trailing whitespace is part of the marker.
                prefix: lookup("OVERDUE_NAME_PREFIX")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_NAME_PREFIX.to_string()),
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "FLAG_STRATEGY".to_string(),
                    format!(
                        "unknown strategy '{}' (expected tag, custom_field or name_prefix)",
                        other
                    ),
                ))
            }
        };

        let dry_run = match get("DRY_RUN") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::InvalidValue("DRY_RUN".to_string(), raw.clone()))?,
            None => false,
        };

        let base_url = get("ASANA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let page_size = match get("ASANA_PAGE_SIZE") {
            Some(raw) => {
                let size = raw.trim().parse::<u32>().map_err(|e| {
                    ConfigError::InvalidValue("ASANA_PAGE_SIZE".to_string(), format!("{}", e))
                })?;
                if !(1..=100).contains(&size) {
                    return Err(ConfigError::InvalidValue(
                        "ASANA_PAGE_SIZE".to_string(),
                        format!("{} is outside 1..=100", size),
                    ));
                }
                size
            }
            None => DEFAULT_PAGE_SIZE,
        };

        let max_rate_limit_retries = get("ASANA_MAX_RATE_LIMIT_RETRIES")
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|e| {
                    ConfigError::InvalidValue(
                        "ASANA_MAX_RATE_LIMIT_RETRIES".to_string(),
                        format!("{}", e),
                    )
                })
            })
            .transpose()?;

        Ok(Self {
            access_token,
            project_gid,
            base_url,
            page_size,
            flag,
            dry_run,
            max_rate_limit_retries,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(access_token: String, project_gid: String, flag: FlagConfig) -> Self {
        Self {
            access_token,
            project_gid,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            flag,
            dry_run: false,
            max_rate_limit_retries: None,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
