use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable consulted when the config leaves `api-key` empty
pub const STEAM_API_KEY_ENV: &str = "STEAM_API_KEY";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use steamgraph::config::load_config;
///
/// let config = load_config(Path::new("steamgraph.toml")).unwrap();
/// println!("Crawl workers: {}", config.crawler.worker_count);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let mut config: Config = toml::from_str(&content)?;

    apply_env_fallbacks(&mut config, std::env::var(STEAM_API_KEY_ENV).ok());

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Fills the api key from the environment when the file leaves it empty
///
/// A key present in the file always wins over the environment.
fn apply_env_fallbacks(config: &mut Config, env_api_key: Option<String>) {
    if config.steam_api.api_key.trim().is_empty() {
        if let Some(key) = env_api_key {
            config.steam_api.api_key = key;
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that crawls started from different configs can be
/// told apart.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load or parse the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
