// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PlandagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PlandagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_engine(cfg)?;
    validate_retry(cfg)?;
    validate_cache(cfg)?;
    validate_tools(cfg)?;
    Ok(())
}

fn validate_engine(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.max_concurrency == 0 {
        return Err(PlandagError::ConfigError(
            "[engine].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.engine.call_timeout_ms == 0 {
        return Err(PlandagError::ConfigError(
            "[engine].call_timeout_ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_retry(cfg: &RawConfigFile) -> Result<()> {
    // strategy is strongly typed and checked during deserialization.
    if cfg.retry.max_attempts == 0 {
        return Err(PlandagError::ConfigError(
            "[retry].max_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    // A zero base would make every backoff delay equal.
    if cfg.retry.base_delay_ms == 0 {
        return Err(PlandagError::ConfigError(
            "[retry].base_delay_ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_cache(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cache.ttl_secs == 0 {
        return Err(PlandagError::ConfigError(
            "[cache].ttl_secs must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    for (kind, ep) in cfg.tools.iter() {
        let url = ep.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PlandagError::ConfigError(format!(
                "[tools.{}].url must be an http(s) URL (got '{}')",
                kind, ep.url
            )));
        }
    }
    Ok(())
}
