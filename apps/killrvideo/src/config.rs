//! Configuration for the killrvideo CLI

use core_config::{ConfigError, FromEnv, env_or_default};
use cql_schema::catalogue;
use database::cassandra::CassandraConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Connection settings; the session is opened without a keyspace
    pub cassandra: CassandraConfig,
    /// Keyspace to provision, `CASSANDRA_KEYSPACE` or `killrvideo`
    pub keyspace: String,
}

/// Keyspace to provision, without reading any connection setting
pub fn keyspace_from_env() -> String {
    env_or_default("CASSANDRA_KEYSPACE", catalogue::KEYSPACE)
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let cassandra = CassandraConfig::from_env()?;

        Ok(Self {
            cassandra: cassandra.without_keyspace(),
            keyspace: keyspace_from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_defaults_to_catalogue() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("10.0.0.1:9042")),
                ("CASSANDRA_KEYSPACE", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.keyspace, "killrvideo");
                assert!(config.cassandra.keyspace.is_none());
            },
        );
    }

    #[test]
    fn test_configured_keyspace_is_provisioned_not_selected() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("10.0.0.1:9042")),
                ("CASSANDRA_KEYSPACE", Some("killrvideo_staging")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.keyspace, "killrvideo_staging");
                assert!(config.cassandra.keyspace.is_none());
            },
        );
    }

    #[test]
    fn test_keyspace_needs_no_contact_points() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", None),
                ("CASSANDRA_KEYSPACE", Some("killrvideo_dev")),
            ],
            || assert_eq!(keyspace_from_env(), "killrvideo_dev"),
        );
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", None::<&str>),
                ("CASSANDRA_KEYSPACE", None),
            ],
            || assert_eq!(keyspace_from_env(), "killrvideo"),
        );
    }

    #[test]
    fn test_missing_contact_points() {
        temp_env::with_var_unset("CASSANDRA_CONTACT_POINTS", || {
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::MissingEnvVar(key)) if key == "CASSANDRA_CONTACT_POINTS"
            ));
        });
    }
}
