//! Shim configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{Convention, DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY};

/// Environment variable selecting the [`Convention`].
pub const CONVENTION_ENV: &str = "CREDSHIM_CONVENTION";
/// Environment variable setting the fixed-buffer capacity in bytes.
pub const BUFFER_CAPACITY_ENV: &str = "CREDSHIM_BUFFER_CAPACITY";

/// Errors raised while loading a [`ShimConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq, uniffi::Error)]
#[uniffi(flat_error)]
pub enum ConfigError {
    /// The convention name is not one of the supported conventions.
    #[error("invalid_convention: {0}")]
    InvalidConvention(String),
    /// The buffer capacity is not a number.
    #[error("invalid_buffer_capacity: {0}")]
    InvalidCapacity(String),
    /// The buffer capacity is zero or above the supported maximum.
    #[error("buffer_capacity_out_of_range: {0} (expected 1..={MAX_BUFFER_CAPACITY})")]
    CapacityOutOfRange(usize),
}

/// Selects the backing-store convention and sizes the fixed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShimConfig {
    /// Convention used to talk to the backing store.
    pub convention: Convention,
    /// Capacity of the retrieval buffer under the fixed-buffer convention.
    pub buffer_capacity: usize,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            convention: Convention::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ShimConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their default.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(CONVENTION_ENV) {
            config.convention = Convention::from_str(value.trim())
                .map_err(|_| ConfigError::InvalidConvention(value.clone()))?;
        }
        if let Some(value) = lookup(BUFFER_CAPACITY_ENV) {
            config.buffer_capacity = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidCapacity(value.clone()))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks that the buffer capacity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CapacityOutOfRange`] for a zero or oversized
    /// capacity.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 || self.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(ConfigError::CapacityOutOfRange(self.buffer_capacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ShimConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, ShimConfig::default());
        assert_eq!(config.convention, Convention::ObjectHandle);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    }

    #[test]
    fn test_reads_both_variables() {
        let config = ShimConfig::from_lookup(lookup(&[
            (CONVENTION_ENV, "fixed-buffer"),
            (BUFFER_CAPACITY_ENV, " 128 "),
        ]))
        .expect("config");
        assert_eq!(config.convention, Convention::FixedBuffer);
        assert_eq!(config.buffer_capacity, 128);
    }

    #[test]
    fn test_rejects_unknown_convention() {
        let err = ShimConfig::from_lookup(lookup(&[(CONVENTION_ENV, "pipe")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidConvention("pipe".to_string()));
    }

    #[test]
    fn test_rejects_bad_capacity() {
        let err = ShimConfig::from_lookup(lookup(&[(BUFFER_CAPACITY_ENV, "big")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidCapacity("big".to_string()));

        let err = ShimConfig::from_lookup(lookup(&[(BUFFER_CAPACITY_ENV, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::CapacityOutOfRange(0));
    }

    #[test]
    fn test_json_with_partial_fields() {
        let config: ShimConfig =
            serde_json::from_str(r#"{"convention":"borrowed-handle"}"#).expect("json");
        assert_eq!(config.convention, Convention::BorrowedHandle);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);

        assert!(serde_json::from_str::<ShimConfig>(r#"{"capacity":1}"#).is_err());
    }
}
