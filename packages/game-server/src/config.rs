use std::env;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

use tracing::Level;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Invalid { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Completed games table. Games are kept in memory when unset.
    pub games_table: Option<String>,
    /// Friendships table. Friend status is kept in memory when unset.
    pub friendships_table: Option<String>,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT".to_string(),
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let log_level = match non_empty("LOG_LEVEL") {
            Some(value) => Level::from_str(&value).map_err(|_| ConfigError::Invalid {
                key: "LOG_LEVEL".to_string(),
                value,
            })?,
            None => Level::INFO,
        };

        Ok(Config {
            port,
            games_table: non_empty("GAMES_TABLE"),
            friendships_table: non_empty("FRIENDSHIPS_TABLE"),
            log_level,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn uses_dynamodb(&self) -> bool {
        self.games_table.is_some() || self.friendships_table.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.games_table.is_none());
        assert!(!config.uses_dynamodb());
        assert_eq!(config.server_addr().port(), 8080);
    }

    #[test]
    fn test_reads_all_settings() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "3000"),
            ("GAMES_TABLE", "games"),
            ("FRIENDSHIPS_TABLE", "friendships"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.games_table.as_deref(), Some("games"));
        assert_eq!(config.friendships_table.as_deref(), Some("friendships"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert!(config.uses_dynamodb());
    }

    #[test]
    fn test_blank_table_means_in_memory() {
        let config = Config::from_lookup(lookup(&[("GAMES_TABLE", "  ")])).unwrap();

        assert!(config.games_table.is_none());
    }

    #[rstest]
    #[case("PORT", "eighty")]
    #[case("PORT", "70000")]
    #[case("LOG_LEVEL", "loud")]
    fn test_invalid_values(#[case] key: &str, #[case] value: &str) {
        let result = Config::from_lookup(lookup(&[(key, value)]));

        assert_eq!(
            result,
            Err(ConfigError::Invalid {
                key: key.to_string(),
                value: value.to_string()
            })
        );
    }
}
