#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_list, env_parse};

/// Datacenter name used by a default single-node Cassandra install
pub const DEFAULT_DATACENTER: &str = "datacenter1";

/// Cassandra connection settings
///
/// Consumed by [`connect_from_config`](super::connect_from_config). The schema
/// layer never reads these values; it only receives the resulting session.
///
/// # Example
///
/// ```ignore
/// use database::cassandra::CassandraConfig;
///
/// let config = CassandraConfig::with_keyspace(vec!["127.0.0.1:9042"], "killrvideo")
///     .with_datacenter("datacenter1")
///     .with_credentials("cassandra", "cassandra");
///
/// // From environment variables (requires `config` feature)
/// let config = CassandraConfig::from_env()?;
/// ```
#[derive(Clone, Debug)]
pub struct CassandraConfig {
    /// Contact points (host:port pairs)
    pub contact_points: Vec<String>,

    /// Keyspace selected on the session after connecting
    pub keyspace: Option<String>,

    /// Local datacenter for DC-aware load balancing
    pub local_datacenter: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Per-request timeout in seconds, applied through the default execution profile
    pub request_timeout_secs: u64,

    /// Enable TLS (requires the `tls` feature)
    pub ssl_enabled: bool,

    /// PEM file with the CA used to verify node certificates
    pub ssl_ca_cert: Option<String>,
}

impl CassandraConfig {
    /// Create a config with contact points and defaults for everything else
    pub fn new<S: Into<String>>(contact_points: Vec<S>) -> Self {
        Self {
            contact_points: contact_points.into_iter().map(|s| s.into()).collect(),
            ..Self::default()
        }
    }

    /// Create a config that selects `keyspace` once connected
    pub fn with_keyspace<S: Into<String>>(
        contact_points: Vec<S>,
        keyspace: impl Into<String>,
    ) -> Self {
        Self {
            keyspace: Some(keyspace.into()),
            ..Self::new(contact_points)
        }
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.local_datacenter = Some(datacenter.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Enable TLS, verifying nodes against the given CA file
    pub fn with_ssl(mut self, ca_cert: impl Into<String>) -> Self {
        self.ssl_enabled = true;
        self.ssl_ca_cert = Some(ca_cert.into());
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Same settings without a keyspace, for keyspace-level DDL
    pub fn without_keyspace(&self) -> Self {
        Self {
            keyspace: None,
            ..self.clone()
        }
    }

    pub fn contact_points(&self) -> &[String] {
        &self.contact_points
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["127.0.0.1:9042".to_string()],
            keyspace: None,
            local_datacenter: Some(DEFAULT_DATACENTER.to_string()),
            username: None,
            password: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            ssl_enabled: false,
            ssl_ca_cert: None,
        }
    }
}

/// Load CassandraConfig from environment variables
///
/// - `CASSANDRA_CONTACT_POINTS` (required) - comma-separated host:port list
/// - `CASSANDRA_KEYSPACE` (optional)
/// - `CASSANDRA_DATACENTER` (optional, default: datacenter1)
/// - `CASSANDRA_USERNAME` / `CASSANDRA_PASSWORD` (optional)
/// - `CASSANDRA_CONNECT_TIMEOUT_SECS` (optional, default: 10)
/// - `CASSANDRA_REQUEST_TIMEOUT_SECS` (optional, default: 30)
/// - `CASSANDRA_SSL_ENABLED` (optional, default: false)
/// - `CASSANDRA_SSL_CA_CERT` (optional) - CA bundle path, required when SSL is enabled
#[cfg(feature = "config")]
impl FromEnv for CassandraConfig {
    fn from_env() -> Result<Self, ConfigError> {
        if std::env::var("CASSANDRA_CONTACT_POINTS").is_err() {
            return Err(ConfigError::MissingEnvVar(
                "CASSANDRA_CONTACT_POINTS".to_string(),
            ));
        }

        let contact_points = env_list("CASSANDRA_CONTACT_POINTS");
        if contact_points.is_empty() {
            return Err(ConfigError::ParseError {
                key: "CASSANDRA_CONTACT_POINTS".to_string(),
                details: "No valid contact points provided".to_string(),
            });
        }

        let ssl_enabled = env_parse("CASSANDRA_SSL_ENABLED", false)?;
        let ssl_ca_cert = std::env::var("CASSANDRA_SSL_CA_CERT").ok();
        if ssl_enabled && ssl_ca_cert.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "CASSANDRA_SSL_CA_CERT".to_string(),
            ));
        }

        Ok(Self {
            contact_points,
            keyspace: std::env::var("CASSANDRA_KEYSPACE").ok(),
            local_datacenter: Some(
                std::env::var("CASSANDRA_DATACENTER")
                    .unwrap_or_else(|_| DEFAULT_DATACENTER.to_string()),
            ),
            username: std::env::var("CASSANDRA_USERNAME").ok(),
            password: std::env::var("CASSANDRA_PASSWORD").ok(),
            connect_timeout_secs: env_parse("CASSANDRA_CONNECT_TIMEOUT_SECS", 10)?,
            request_timeout_secs: env_parse("CASSANDRA_REQUEST_TIMEOUT_SECS", 30)?,
            ssl_enabled,
            ssl_ca_cert,
        })
    }
}
