//! Environment variable helpers shared by the pool config and service config.

use std::str::FromStr;

/// Read `key` strictly: unset yields `default`, but a present value that fails
/// to parse is reported instead of silently ignored.
pub fn parse_env_strict<T: FromStr>(key: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}
