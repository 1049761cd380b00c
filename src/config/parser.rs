use crate::config::types::{Config, DispatchMode};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Overrides the database path
pub const ENV_DATABASE: &str = "RIPPLE_DATABASE";
/// Sets a peer unit and switches dispatch to remote mode
pub const ENV_PEER: &str = "RIPPLE_PEER";
/// Overrides the listener bind address
pub const ENV_BIND: &str = "RIPPLE_BIND";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides (`RIPPLE_DATABASE`, `RIPPLE_PEER`, `RIPPLE_BIND`) are
/// applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Applies environment overrides using the given lookup
///
/// The lookup is injected so callers (and tests) need not mutate the
/// process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
        tracing::debug!("{} overrides database path", ENV_DATABASE);
        config.output.database_path = path;
    }

    if let Some(peer) = lookup(ENV_PEER).filter(|v| !v.is_empty()) {
        tracing::debug!("{} set, dispatching links to {}", ENV_PEER, peer);
        config.dispatch.mode = DispatchMode::Remote;
        config.dispatch.peer = Some(peer);
    }

    if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.is_empty()) {
        config.server.bind = bind;
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Stored on each session row so runs with different settings can be told apart.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
