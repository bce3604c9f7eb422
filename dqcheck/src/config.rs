//! Configuration loading for the data-quality runner.
//!
//! Two layers, loaded once per run and read-only afterwards:
//! 1. Environment variables (optionally seeded from a `.env` file by the
//!    binary) carry database endpoints/credentials and mail transport
//!    settings.
//! 2. An optional `dqcheck.toml` in the working directory carries the
//!    disabled check list and report truncation limits.
//!
//! Required keys are validated here so a misconfigured run aborts before any
//! check executes.

use std::path::Path;

use serde::Deserialize;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "dqcheck.toml";

/// Default number of scalar list items rendered per issue.
pub const DEFAULT_MAX_LIST_ITEMS: usize = 10;

/// Default number of table rows rendered per issue.
pub const DEFAULT_MAX_TABLE_ROWS: usize = 10;

// ---------------------------------------------------------------------------
// Settings structs
// ---------------------------------------------------------------------------

/// Connection settings for one MySQL database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Account user name.
    pub user: String,
    /// Account password (may be empty).
    pub password: String,
    /// Database (schema) name.
    pub database: String,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
        }
    }
}

/// Microsoft Graph mail transport settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailSettings {
    /// Azure AD application (client) id.
    pub client_id: String,
    /// Azure AD client secret.
    pub client_secret: String,
    /// Azure AD tenant id.
    pub tenant_id: String,
    /// Mailbox the report is sent from.
    pub sender: String,
    /// Report recipients.
    pub recipients: Vec<String>,
}

/// Check selection settings from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSettings {
    /// Checks subtracted from every run, resolved case-insensitively
    /// against logical names and source identifiers.
    pub disabled: Vec<String>,
}

/// Report rendering limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    /// Maximum scalar list items rendered before truncation.
    pub max_list_items: usize,
    /// Maximum table rows rendered before truncation.
    pub max_table_rows: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            max_list_items: DEFAULT_MAX_LIST_ITEMS,
            max_table_rows: DEFAULT_MAX_TABLE_ROWS,
        }
    }
}

/// Complete runner configuration, passed by reference into every check and
/// into the reporter. No global state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Storefront (Magento) database.
    pub magento: DbSettings,
    /// ERP database.
    pub erp: DbSettings,
    /// Mail transport settings.
    pub email: EmailSettings,
    /// Check selection settings.
    pub checks: CheckSettings,
    /// Report rendering limits.
    pub report: ReportSettings,
}

// ---------------------------------------------------------------------------
// TOML deserialization helpers
// ---------------------------------------------------------------------------

/// Raw TOML structure for `dqcheck.toml`.
#[derive(Debug, Deserialize)]
struct TomlConfigFile {
    checks: Option<TomlChecksSection>,
    report: Option<TomlReportSection>,
}

/// The `[checks]` section.
#[derive(Debug, Deserialize)]
struct TomlChecksSection {
    disabled: Option<Vec<String>>,
}

/// The `[report]` section.
#[derive(Debug, Deserialize)]
struct TomlReportSection {
    max_list_items: Option<usize>,
    max_table_rows: Option<usize>,
}

/// Apply a parsed config file onto an [`AppConfig`], overriding set values.
fn apply_toml_file(config: &mut AppConfig, file: &TomlConfigFile) {
    if let Some(ref checks) = file.checks {
        if let Some(ref v) = checks.disabled {
            config.checks.disabled = v.clone();
        }
    }
    if let Some(ref report) = file.report {
        if let Some(v) = report.max_list_items {
            config.report.max_list_items = v;
        }
        if let Some(v) = report.max_table_rows {
            config.report.max_table_rows = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Environment loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration: required environment variables plus the optional
    /// `dqcheck.toml` found in `root`.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or malformed, or
    /// when a present config file cannot be read or parsed. A missing config
    /// file is not an error.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_env_with(|key| std::env::var(key).ok())?;
        config.apply_file(root)?;
        Ok(config)
    }

    /// Merge the optional `dqcheck.toml` under `root` into this config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] or [`ConfigError::ParseError`] when
    /// the file exists but is unusable.
    pub fn apply_file(&mut self, root: &Path) -> Result<(), ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e.to_string()))?;
        let parsed: TomlConfigFile = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e.to_string()))?;
        apply_toml_file(self, &parsed);
        Ok(())
    }

    /// Build the environment-sourced part of the config through a lookup
    /// function (`std::env::var` in production, a map in tests).
    fn from_env_with(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            magento: db_settings_from_env(&get, "MAGENTO_DB")?,
            erp: db_settings_from_env(&get, "ERP_DB")?,
            email: email_settings_from_env(&get)?,
            checks: CheckSettings::default(),
            report: ReportSettings::default(),
        })
    }
}

/// Read one database's settings from `{prefix}_HOST` through `{prefix}_NAME`.
///
/// Host and port have defaults; user and database name are required. The
/// password may legitimately be empty.
fn db_settings_from_env(
    get: &impl Fn(&str) -> Option<String>,
    prefix: &str,
) -> Result<DbSettings, ConfigError> {
    let port_key = format!("{prefix}_PORT");
    let port = match get(&port_key) {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidVar(port_key, e.to_string()))?,
        None => 3306,
    };
    Ok(DbSettings {
        host: get(&format!("{prefix}_HOST")).unwrap_or_else(|| "localhost".to_owned()),
        port,
        user: required_var(get, &format!("{prefix}_USER"))?,
        password: get(&format!("{prefix}_PASSWORD")).unwrap_or_default(),
        database: required_var(get, &format!("{prefix}_NAME"))?,
    })
}

/// Read the Graph mail transport settings. All keys are required and the
/// recipient list must be non-empty after splitting.
fn email_settings_from_env(
    get: &impl Fn(&str) -> Option<String>,
) -> Result<EmailSettings, ConfigError> {
    let recipients = split_recipients(&required_var(get, "EMAIL_RECIPIENTS")?);
    if recipients.is_empty() {
        return Err(ConfigError::InvalidVar(
            "EMAIL_RECIPIENTS".to_owned(),
            "expected a comma-separated list with at least one address".to_owned(),
        ));
    }
    Ok(EmailSettings {
        client_id: required_var(get, "MSAL_CLIENT_ID")?,
        client_secret: required_var(get, "MSAL_CLIENT_SECRET")?,
        tenant_id: required_var(get, "MSAL_TENANT_ID")?,
        sender: required_var(get, "EMAIL_SENDER")?,
        recipients,
    })
}

/// Fetch a variable that must be present and non-blank.
fn required_var(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    match get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(key.to_owned())),
    }
}

/// Split a comma-separated recipient list, trimming whitespace and dropping
/// empty entries.
fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable was missing or blank.
    #[error("Missing required environment variable '{0}'")]
    MissingVar(String),

    /// An environment variable was present but malformed.
    #[error("Invalid value for environment variable '{0}': {1}")]
    InvalidVar(String, String),

    /// Failed to read a configuration file.
    #[error("Failed to read config file '{0}': {1}")]
    ReadError(String, String),

    /// Failed to parse a configuration file.
    #[error("Failed to parse config file '{0}': {1}")]
    ParseError(String, String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
