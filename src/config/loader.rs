//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for per-peer base URL overrides.
pub const PEER_URL_ENV_PREFIX: &str = "PATIENT_RECORDS_PEER_";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, std::env::vars());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Environment variable that overrides `peer`'s base URL.
///
/// `user-service` → `PATIENT_RECORDS_PEER_USER_SERVICE_URL`.
pub fn peer_url_env_var(peer: &str) -> String {
    let upper: String = peer
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{}{}_URL", PEER_URL_ENV_PREFIX, upper)
}

/// Override peer base URLs from `vars`.
pub fn apply_env_overrides<I>(config: &mut ServiceConfig, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(key, _)| key.starts_with(PEER_URL_ENV_PREFIX))
        .collect();

    for peer in &mut config.peers {
        let key = peer_url_env_var(&peer.name);
        if let Some((_, value)) = vars.iter().find(|(k, _)| *k == key) {
            tracing::info!(peer = %peer.name, base_url = %value, "Peer base URL overridden from environment");
            peer.base_url = value.clone();
        }
    }
}
