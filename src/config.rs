use log::*;
use std::env;
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/**
 * Runtime settings, read from the environment (and `.env` by way of dotenv)
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /**
     * A postgres connection string, or `memory:` for the in-process store
     */
    pub database_url: String,
    pub listen_addr: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /**
     * Build the configuration from any key lookup, `from_env` uses the process
     * environment
     */
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let listen_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| {
            debug!("LISTEN_ADDR not set, using default: {}", DEFAULT_LISTEN_ADDR);
            DEFAULT_LISTEN_ADDR.to_string()
        });

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        value,
                    })
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "memory:")])).unwrap();
        assert_eq!("memory:", config.database_url);
        assert_eq!(DEFAULT_LISTEN_ADDR, config.listen_addr);
        assert_eq!(DEFAULT_MAX_CONNECTIONS, config.max_connections);
    }

    #[test]
    fn test_database_url_required() {
        assert_eq!(
            Err(ConfigError::Missing("DATABASE_URL")),
            Config::from_lookup(lookup(&[]))
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/polls"),
            ("LISTEN_ADDR", "0.0.0.0:9000"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!("0.0.0.0:9000", config.listen_addr);
        assert_eq!(12, config.max_connections);
    }

    #[test]
    fn test_invalid_pool_size() {
        for bad in &["zero", "0", "-1"] {
            let err = Config::from_lookup(lookup(&[
                ("DATABASE_URL", "memory:"),
                ("DATABASE_MAX_CONNECTIONS", *bad),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }));
        }
    }
}
