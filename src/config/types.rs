use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::images::DeclaredDimension;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub accounts: AccountsConfig,

    #[serde(default)]
    pub avatar: AvatarConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database() -> PathBuf {
    PathBuf::from("readcomics.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            storage: StorageConfig::default(),
            accounts: AccountsConfig::default(),
            avatar: AvatarConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory uploaded media is written to
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// URL prefix media is served under
    #[serde(default = "default_media_url")]
    pub media_url: String,

    /// URL prefix of bundled static assets (fallback avatars)
    #[serde(default = "default_static_url")]
    pub static_url: String,
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}
fn default_media_url() -> String {
    "/media/".to_string()
}
fn default_static_url() -> String {
    "/static/".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            media_url: default_media_url(),
            static_url: default_static_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountsConfig {
    /// Whether new users may sign up
    #[serde(default = "default_allow_registration")]
    pub allow_registration: bool,

    /// Minimum seconds between two `last_active` writes for the same user
    #[serde(default = "default_last_active_timeout")]
    pub last_active_timeout_secs: u64,

    /// Days an e-mail confirmation key stays valid
    #[serde(default = "default_confirmation_days")]
    pub email_confirmation_days: u32,

    /// bcrypt cost for new password hashes
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

fn default_allow_registration() -> bool {
    true
}
fn default_last_active_timeout() -> u64 {
    300
}
fn default_confirmation_days() -> u32 {
    3
}
fn default_password_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            allow_registration: default_allow_registration(),
            last_active_timeout_secs: default_last_active_timeout(),
            email_confirmation_days: default_confirmation_days(),
            password_hash_cost: default_password_hash_cost(),
        }
    }
}

/// Declaration of the user photo thumbnail field.
///
/// Without an `[avatar]` section the field is 40 pixels wide. Inside a
/// present section an omitted dimension stays undeclared, so a section
/// with neither dimension fails the startup checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvatarConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_width: Option<DeclaredDimension>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_height: Option<DeclaredDimension>,

    /// Storage key prefix for uploaded photos
    #[serde(default = "default_upload_prefix")]
    pub upload_prefix: String,
}

fn default_upload_prefix() -> String {
    "avatars".to_string()
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            thumb_width: Some(DeclaredDimension::Int(40)),
            thumb_height: None,
            upload_prefix: default_upload_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Level for failures seen by the instrumentation wrapper
    #[serde(default)]
    pub error_level: ErrorLevel,

    /// Include the full error source chain in failure events
    #[serde(default)]
    pub trace: bool,

    /// Operations routed through the wrapper; empty means all of them
    #[serde(default)]
    pub operations: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            error_level: ErrorLevel::default(),
            trace: false,
            operations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

impl From<ErrorLevel> for tracing::Level {
    fn from(level: ErrorLevel) -> Self {
        match level {
            ErrorLevel::Error => tracing::Level::ERROR,
            ErrorLevel::Warn => tracing::Level::WARN,
            ErrorLevel::Info => tracing::Level::INFO,
            ErrorLevel::Debug => tracing::Level::DEBUG,
        }
    }
}
