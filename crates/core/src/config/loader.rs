use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides, e.g. `WAVPIPE_RUNNER__CONCURRENCY=4`.
const ENV_PREFIX: &str = "WAVPIPE_";

/// Extracts a `Config` from `base` with environment overrides on top.
fn extract(base: Figment) -> Result<Config, ConfigError> {
    base.merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    extract(Figment::new().merge(Toml::file(path)))
}

/// Load configuration from an optional file.
///
/// Without a file, built-in defaults are used; environment overrides apply
/// either way.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => extract(Figment::from(Serialized::defaults(Config::default()))),
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
