use crate::config::types::{Config, IdentityConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

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
/// use wenshu_trawl::config::load_config;
///
/// let config = load_config(Path::new("wenshu.toml")).unwrap();
/// println!("Max pages: {}", config.crawl.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is recorded with each run in the ledger so runs made under different
/// settings can be told apart.
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
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Reads the identity token cookie header
///
/// `cookie-header` wins over `cookie-file`. Returns `None` when neither is set.
pub fn load_identity_token(identity: &IdentityConfig) -> Result<Option<String>, ConfigError> {
    if let Some(header) = &identity.cookie_header {
        return Ok(Some(header.trim().to_string()));
    }

    match &identity.cookie_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let header = content.trim();
            if header.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "cookie-file '{}' is empty",
                    path
                )));
            }
            Ok(Some(header.to_string()))
        }
        None => Ok(None),
    }
}
