//! Environment-variable configuration, loaded once at startup.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for environment variable {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub migration_dir: PathBuf,
    pub force_apply: bool,
    pub apply_only: bool,
    pub env_name: String,
    pub database: DatabaseConfig,
    pub http_host: String,
    pub http_port: u16,
}

impl Config {
    /// Loads configuration from the process environment, applying `.env` first via
    /// `dotenvy::dotenv()` (ignored if absent).
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            migration_dir: PathBuf::from(required("MIGRATION_DIR")?),
            force_apply: bool_var("MIGRATION_FORCE_APPLY")?.unwrap_or(false),
            apply_only: bool_var("MIGRATION_APPLY_ONLY")?.unwrap_or(false),
            env_name: optional("ENV_NAME").unwrap_or_default(),
            database: DatabaseConfig {
                host: optional("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: int_var("DB_PORT")?.unwrap_or(5432),
                user: required("DB_USER")?,
                password: required("DB_PASSWORD")?,
                database: required("DB_DATABASE")?,
                max_connections: int_var("DB_MAX_CONNECTIONS")?.unwrap_or(100),
            },
            http_host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: int_var("PORT")?.unwrap_or(8080),
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok()
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn bool_var(name: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = optional(name) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(Some(true)),
        "0" | "false" | "no" | "" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: "expected a boolean (true/false/1/0/yes/no)",
        }),
    }
}

fn int_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    let Some(raw) = optional(name) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            reason: "expected an integer",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_var_accepts_common_spellings() {
        // SAFETY: test runs single-threaded within this process's env mutation window.
        unsafe {
            std::env::set_var("FLEETMIG_TEST_BOOL", "yes");
        }
        assert_eq!(bool_var("FLEETMIG_TEST_BOOL").unwrap(), Some(true));
        unsafe {
            std::env::remove_var("FLEETMIG_TEST_BOOL");
        }
    }

    #[test]
    fn bool_var_rejects_unknown_spellings() {
        unsafe {
            std::env::set_var("FLEETMIG_TEST_BOOL_BAD", "maybe");
        }
        assert!(bool_var("FLEETMIG_TEST_BOOL_BAD").is_err());
        unsafe {
            std::env::remove_var("FLEETMIG_TEST_BOOL_BAD");
        }
    }

    #[test]
    fn int_var_parses_present_value() {
        unsafe {
            std::env::set_var("FLEETMIG_TEST_INT", "42");
        }
        assert_eq!(int_var::<u16>("FLEETMIG_TEST_INT").unwrap(), Some(42));
        unsafe {
            std::env::remove_var("FLEETMIG_TEST_INT");
        }
    }

    #[test]
    fn missing_optional_int_is_none() {
        assert_eq!(int_var::<u16>("FLEETMIG_TEST_INT_ABSENT").unwrap(), None);
    }
}
