use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::errors::{ExecutionError, NewSessionError};
use scylla::policies::load_balancing::DefaultPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use super::CassandraConfig;
use crate::common::{RetryConfig, retry, retry_with_backoff};

/// Error type for Cassandra connection handling
#[derive(Debug, thiserror::Error)]
pub enum CassandraError {
    #[error("Cassandra session error: {0}")]
    Session(#[from] NewSessionError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Keyspace error: {0}")]
    KeyspaceError(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

/// Shared handle to a connected session
///
/// The session closes its connections when the last handle is dropped.
pub type CassandraSession = Arc<Session>;

const VERIFY_QUERY: &str = "SELECT release_version FROM system.local";

/// Connect to Cassandra with default settings
///
/// # Example
/// ```ignore
/// use database::cassandra::connect;
///
/// let session = connect(&["127.0.0.1:9042"]).await?;
/// ```
pub async fn connect(
    contact_points: &[impl AsRef<str>],
) -> Result<CassandraSession, CassandraError> {
    let config = CassandraConfig::new(
        contact_points
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect(),
    );
    connect_from_config(&config).await
}

/// Connect using a CassandraConfig
///
/// Builds the session (credentials, DC-aware load balancing, request timeout,
/// optional TLS), selects the configured keyspace and verifies the connection
/// against `system.local`.
///
/// # Example
/// ```ignore
/// use database::cassandra::{CassandraConfig, connect_from_config};
/// use core_config::FromEnv;
///
/// let config = CassandraConfig::from_env()?;
/// let session = connect_from_config(&config).await?;
/// ```
#[instrument(skip(config), fields(contact_points = ?config.contact_points, keyspace = ?config.keyspace))]
pub async fn connect_from_config(
    config: &CassandraConfig,
) -> Result<CassandraSession, CassandraError> {
    info!("Connecting to Cassandra");

    let mut builder = SessionBuilder::new()
        .known_nodes(&config.contact_points)
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .default_execution_profile_handle(execution_profile(config).into_handle());

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        builder = builder.user(username, password);
    }

    if let Some(ref keyspace) = config.keyspace {
        builder = builder.use_keyspace(keyspace, true);
    }

    if config.ssl_enabled {
        builder = with_tls(builder, config)?;
    }

    let session: Session = builder.build().await?;

    session
        .query_unpaged(VERIFY_QUERY, &[])
        .await
        .map_err(|e| CassandraError::ConnectionFailed(e.to_string()))?;

    info!("Successfully connected to Cassandra");
    Ok(Arc::new(session))
}

fn execution_profile(config: &CassandraConfig) -> ExecutionProfile {
    let mut policy = DefaultPolicy::builder().token_aware(true);
    if let Some(ref datacenter) = config.local_datacenter {
        policy = policy.prefer_datacenter(datacenter.clone());
    }

    ExecutionProfile::builder()
        .load_balancing_policy(policy.build())
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)))
        .build()
}

#[cfg(feature = "tls")]
fn with_tls(
    builder: SessionBuilder,
    config: &CassandraConfig,
) -> Result<SessionBuilder, CassandraError> {
    use openssl::ssl::{SslContextBuilder, SslMethod, SslVerifyMode};

    let ca_cert = config
        .ssl_ca_cert
        .as_deref()
        .ok_or_else(|| CassandraError::Tls("SSL enabled but no CA certificate configured".to_string()))?;

    let mut context = SslContextBuilder::new(SslMethod::tls())
        .map_err(|e| CassandraError::Tls(e.to_string()))?;
    context
        .set_ca_file(ca_cert)
        .map_err(|e| CassandraError::Tls(format!("{ca_cert}: {e}")))?;
    context.set_verify(SslVerifyMode::PEER);

    Ok(builder.tls_context(Some(context.build())))
}

#[cfg(not(feature = "tls"))]
fn with_tls(
    _builder: SessionBuilder,
    _config: &CassandraConfig,
) -> Result<SessionBuilder, CassandraError> {
    Err(CassandraError::Tls(
        "SSL enabled but the `tls` feature is not compiled in".to_string(),
    ))
}

/// Connect with retries, for nodes that may still be starting
///
/// Intended for test harnesses and container start-up. Interactive tools
/// should call [`connect_from_config`] and fail fast.
pub async fn connect_with_retry(
    contact_points: &[impl AsRef<str>],
    retry_config: Option<RetryConfig>,
) -> Result<CassandraSession, CassandraError> {
    let config = CassandraConfig::new(
        contact_points
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect(),
    );
    connect_from_config_with_retry(&config, retry_config).await
}

/// Connect from config with retries
pub async fn connect_from_config_with_retry(
    config: &CassandraConfig,
    retry_config: Option<RetryConfig>,
) -> Result<CassandraSession, CassandraError> {
    match retry_config {
        Some(policy) => retry_with_backoff(|| connect_from_config(config), policy).await,
        None => retry(|| connect_from_config(config)).await,
    }
}

/// Switch the session's current keyspace
pub async fn use_keyspace(session: &Session, keyspace: &str) -> Result<(), CassandraError> {
    session
        .use_keyspace(keyspace, true)
        .await
        .map_err(|e| CassandraError::KeyspaceError(e.to_string()))?;

    info!(keyspace, "Using keyspace");
    Ok(())
}
