//! PostgreSQL client implementation
//!
//! This module provides the pooled client shared by the source reader and the
//! warehouse writer.

use crate::adapters::secrets::DatabaseCredentials;
use crate::config::DatabaseConfig;
use crate::domain::{QuarryError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// Bundled warehouse DDL
pub const WAREHOUSE_SCHEMA_SQL: &str = include_str!("../../../migrations/001_warehouse_schema.sql");

/// PostgreSQL client for Quarry
///
/// Wraps a connection pool; every connection handed out has the configured
/// statement timeout applied.
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Statement timeout in seconds
    statement_timeout_seconds: u64,

    /// `user@host:port/database`
    target: String,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// # Arguments
    ///
    /// * `config` - Pool, timeout and TLS settings
    /// * `credentials` - Connection parameters from the secret provider
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS connector or the pool cannot be built.
    pub async fn new(config: &DatabaseConfig, credentials: &DatabaseCredentials) -> Result<Self> {
        let timeout = Duration::from_secs(config.connection_timeout_seconds);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&credentials.host)
            .port(credentials.port)
            .user(&credentials.user)
            .password(credentials.password.expose_secret().as_str())
            .dbname(&credentials.database)
            .application_name("quarry")
            .connect_timeout(timeout)
            .ssl_mode(ssl_mode(&config.ssl_mode)?);

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = if config.ssl_mode == "disable" {
            Manager::from_config(pg_config, NoTls, manager_config)
        } else {
            Manager::from_config(pg_config, tls_connector(&config.ssl_mode)?, manager_config)
        };

        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| QuarryError::Database(format!("Failed to create connection pool: {e}")))?;

        Ok(Self {
            pool,
            statement_timeout_seconds: config.statement_timeout_seconds,
            target: credentials.redacted(),
        })
    }

    /// Test the connection to PostgreSQL
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Connection`] if no connection can be opened.
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| QuarryError::Connection(format!("Connection test failed: {}", describe(&e))))?;

        tracing::info!(target_db = %self.target, "PostgreSQL connection test successful");
        Ok(())
    }

    /// Get a connection from the pool with the statement timeout applied
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Connection`] if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            QuarryError::Connection(format!(
                "Failed to get connection to {}: {e}",
                self.target
            ))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| QuarryError::Database(format!("Failed to set statement timeout: {}", describe(&e))))?;

        Ok(client)
    }

    /// Execute a query and return rows
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| QuarryError::Database(format!("Query failed: {}", describe(&e))))
    }

    /// Redacted connection target, safe for logs
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Maps a libpq-style `sslmode` onto the driver's TLS negotiation mode
fn ssl_mode(mode: &str) -> Result<SslMode> {
    match mode {
        "disable" => Ok(SslMode::Disable),
        "allow" | "prefer" => Ok(SslMode::Prefer),
        "require" | "verify-ca" | "verify-full" => Ok(SslMode::Require),
        other => Err(QuarryError::Configuration(format!(
            "Unsupported ssl_mode '{other}'"
        ))),
    }
}

/// Builds the TLS connector for a non-`disable` ssl mode
///
/// `allow`, `prefer` and `require` encrypt without verifying the server; `verify-ca`
/// checks the chain but not the host name; `verify-full` checks both.
fn tls_connector(mode: &str) -> Result<MakeTlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();
    match mode {
        "verify-full" => {}
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        _ => {
            builder.danger_accept_invalid_certs(true);
        }
    }
    let connector = builder
        .build()
        .map_err(|e| QuarryError::Configuration(format!("Failed to build TLS connector: {e}")))?;
    Ok(MakeTlsConnector::new(connector))
}

/// Server-side message when present, driver message otherwise
pub(crate) fn describe(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{}: {}", db.code().code(), db.message()),
        None => err.to_string(),
    }
}
