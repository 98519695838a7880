mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::images::{check_dimensions, CheckMessage};

/// Name the avatar field reports its check messages under.
pub const AVATAR_FIELD: &str = "avatar";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./readcomics.toml",
        "./config.toml",
        "~/.config/readcomics/config.toml",
        "/etc/readcomics/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Run the declaration checks for every thumbnail field in the config.
pub fn run_checks(config: &Config) -> Vec<CheckMessage> {
    check_dimensions(
        AVATAR_FIELD,
        config.avatar.thumb_width.as_ref(),
        config.avatar.thumb_height.as_ref(),
    )
}

/// Whether `op` names an operation the instrumentation wrapper can route.
pub fn known_operation(op: &str) -> bool {
    crate::accounts::INSTRUMENTED_OPERATIONS.contains(&op)
        || crate::catalog::INSTRUMENTED_OPERATIONS.contains(&op)
}

/// Validate configuration
///
/// Thumbnail declaration problems are not fatal here; they are reported by
/// [`run_checks`] so every message can be shown at once.
fn validate_config(config: &Config) -> Result<()> {
    if config.storage.media_root.as_os_str().is_empty() {
        anyhow::bail!("storage.media_root cannot be empty");
    }

    if config.storage.media_url.is_empty() {
        anyhow::bail!("storage.media_url cannot be empty");
    }

    if config.accounts.last_active_timeout_secs == 0 {
        anyhow::bail!("accounts.last_active_timeout_secs cannot be 0");
    }

    if !(4..=31).contains(&config.accounts.password_hash_cost) {
        anyhow::bail!("accounts.password_hash_cost must be between 4 and 31");
    }

    if config.avatar.upload_prefix.trim_matches('/').is_empty() {
        anyhow::bail!("avatar.upload_prefix cannot be empty");
    }

    for op in &config.logging.operations {
        if !known_operation(op) {
            tracing::warn!("logging.operations lists unknown operation '{}'", op);
        }
    }

    for message in run_checks(config) {
        tracing::warn!(code = message.code, "{}", message);
    }

    Ok(())
}
