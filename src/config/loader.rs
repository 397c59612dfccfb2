/// Layered configuration loading: defaults, optional TOML file, CATCHUP_* env
use std::path::Path;

use crate::error::{CatchupError, Result};
use crate::types::CatchupConfig;

pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<CatchupConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CatchupError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        builder = builder.add_source(
            config::File::from(path).format(config::FileFormat::Toml),
        );
    }

    // CATCHUP_MAX_WORKERS=10, CATCHUP_RETRY__MAX_ATTEMPTS=5
    builder = builder.add_source(
        config::Environment::with_prefix("CATCHUP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config: CatchupConfig = builder
        .build()?
        .try_deserialize()
        .map_err(|e| CatchupError::ConfigError(format!("Failed to parse config: {}", e)))?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &CatchupConfig) -> Result<()> {
    if config.base_url.is_empty() {
        return Err(CatchupError::ConfigError("base_url is empty".to_string()));
    }

    if config.max_workers == 0 {
        return Err(CatchupError::ConfigError("max_workers must be >= 1".to_string()));
    }

    if config.batch_size == 0 {
        return Err(CatchupError::ConfigError("batch_size must be >= 1".to_string()));
    }

    if config.fetch_timeout_secs == 0 {
        return Err(CatchupError::ConfigError("fetch_timeout_secs must be >= 1".to_string()));
    }

    if config.retry.max_attempts == 0 {
        return Err(CatchupError::ConfigError("retry.max_attempts must be >= 1".to_string()));
    }

    if config.db_pool_size == 0 {
        return Err(CatchupError::ConfigError("db_pool_size must be >= 1".to_string()));
    }

    if config.refresh_chunk_days < 1 {
        return Err(CatchupError::ConfigError(format!(
            "Invalid refresh_chunk_days: {}",
            config.refresh_chunk_days
        )));
    }

    // Both names are interpolated into SQL
    for (field, value) in [
        ("tick_table", &config.tick_table),
        ("refresh_function", &config.refresh_function),
    ] {
        if !is_sql_identifier(value) {
            return Err(CatchupError::ConfigError(format!(
                "{} is not a plain SQL identifier: {:?}",
                field, value
            )));
        }
    }

    Ok(())
}

fn is_sql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    value
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}
