//! Database credential providers
//!
//! A [`SecretProvider`] returns the host, port, user, password and database name
//! for one database. Failure to retrieve credentials is fatal at startup.
//!
//! Secret documents (the `file` provider) use the same keys as the `env` provider
//! without the prefix:
//!
//! ```json
//! {"DB_HOST": "db.internal", "DB_PORT": "5432", "DB_USER": "etl",
//!  "DB_PASSWORD": "...", "DB_NAME": "totesys"}
//! ```

use crate::config::{secret_string, CredentialSource, CredentialsConfig, SecretString};
use crate::domain::{QuarryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_PORT: u16 = 5432;

/// Which database a set of credentials is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseRole {
    /// Operational source database
    Source,
    /// Analytical warehouse
    Warehouse,
}

impl DatabaseRole {
    /// Environment prefix used when the configuration does not set one
    pub fn default_env_prefix(&self) -> &'static str {
        match self {
            DatabaseRole::Source => "DB_",
            DatabaseRole::Warehouse => "WAREHOUSE_DB_",
        }
    }
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseRole::Source => f.write_str("source"),
            DatabaseRole::Warehouse => f.write_str("warehouse"),
        }
    }
}

/// Connection parameters for one database
#[derive(Clone)]
pub struct DatabaseCredentials {
    /// Host name
    pub host: String,
    /// TCP port
    pub port: u16,
    /// User name
    pub user: String,
    /// Password (redacted in Debug output)
    pub password: SecretString,
    /// Database name
    pub database: String,
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl DatabaseCredentials {
    /// `user@host:port/database`, safe for logs
    pub fn redacted(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }

    /// Builds credentials from a key/value lookup using `{prefix}HOST` style keys
    fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |suffix: &str| {
            let key = format!("{prefix}{suffix}");
            lookup(&key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| QuarryError::Configuration(format!("Missing credential {key}")))
        };

        let port = match lookup(&format!("{prefix}PORT")).filter(|v| !v.is_empty()) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                QuarryError::Configuration(format!("{prefix}PORT is not a valid port: '{raw}'"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: get("HOST")?,
            port,
            user: get("USER")?,
            password: secret_string(get("PASSWORD")?),
            database: get("NAME")?,
        })
    }
}

/// Source of database credentials
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetches the credentials
    async fn credentials(&self) -> Result<DatabaseCredentials>;
}

/// Reads `{prefix}HOST`, `{prefix}PORT`, `{prefix}USER`, `{prefix}PASSWORD`, `{prefix}NAME`
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    prefix: String,
}

impl EnvSecretProvider {
    /// Creates a provider for the given variable prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn credentials(&self) -> Result<DatabaseCredentials> {
        DatabaseCredentials::from_lookup(&self.prefix, |key| std::env::var(key).ok())
    }
}

/// Reads a JSON secret document from disk
#[derive(Debug, Clone)]
pub struct JsonFileSecretProvider {
    path: PathBuf,
    prefix: String,
}

impl JsonFileSecretProvider {
    /// Creates a provider reading `path`, with keys named `{prefix}HOST` etc.
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl SecretProvider for JsonFileSecretProvider {
    async fn credentials(&self) -> Result<DatabaseCredentials> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            QuarryError::Configuration(format!(
                "Failed to read secret document {}: {e}",
                self.path.display()
            ))
        })?;
        let doc: HashMap<String, serde_json::Value> = serde_json::from_str(&raw).map_err(|e| {
            QuarryError::Configuration(format!(
                "Secret document {} is not a JSON object: {e}",
                self.path.display()
            ))
        })?;

        DatabaseCredentials::from_lookup(&self.prefix, |key| {
            doc.get(key).and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        })
    }
}

/// Credentials written directly in the configuration file
#[derive(Debug, Clone)]
pub struct InlineSecretProvider {
    credentials: DatabaseCredentials,
}

impl InlineSecretProvider {
    /// Wraps fixed credentials
    pub fn new(credentials: DatabaseCredentials) -> Self {
        Self { credentials }
    }

    fn from_config(config: &CredentialsConfig) -> Result<Self> {
        let missing = |name: &str| {
            QuarryError::Configuration(format!("Inline credentials missing '{name}'"))
        };
        let password = config.password.as_ref().ok_or_else(|| missing("password"))?;
        Ok(Self::new(DatabaseCredentials {
            host: config.host.clone().ok_or_else(|| missing("host"))?,
            port: config.port.unwrap_or(DEFAULT_PORT),
            user: config.user.clone().ok_or_else(|| missing("user"))?,
            password: password.clone(),
            database: config.database.clone().ok_or_else(|| missing("database"))?,
        }))
    }
}

#[async_trait]
impl SecretProvider for InlineSecretProvider {
    async fn credentials(&self) -> Result<DatabaseCredentials> {
        Ok(self.credentials.clone())
    }
}

/// Create the credential provider selected by configuration
pub fn create_secret_provider(
    config: &CredentialsConfig,
    role: DatabaseRole,
) -> Result<Arc<dyn SecretProvider>> {
    let prefix = config
        .env_prefix
        .clone()
        .unwrap_or_else(|| role.default_env_prefix().to_string());

    match config.provider {
        CredentialSource::Env => Ok(Arc::new(EnvSecretProvider::new(prefix))),
        CredentialSource::File => {
            let path = config.path.as_ref().ok_or_else(|| {
                QuarryError::Configuration(format!("{role}.credentials.path is not set"))
            })?;
            Ok(Arc::new(JsonFileSecretProvider::new(path, prefix)))
        }
        CredentialSource::Inline => Ok(Arc::new(InlineSecretProvider::from_config(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_complete() {
        let creds = DatabaseCredentials::from_lookup(
            "DB_",
            lookup(&[
                ("DB_HOST", "db.internal"),
                ("DB_PORT", "6543"),
                ("DB_USER", "etl"),
                ("DB_PASSWORD", "pw"),
                ("DB_NAME", "totesys"),
            ]),
        )
        .unwrap();

        assert_eq!(creds.port, 6543);
        assert_eq!(creds.redacted(), "etl@db.internal:6543/totesys");
        assert_eq!(creds.password.expose_secret().as_str(), "pw");
        assert!(!format!("{creds:?}").contains("pw\""));
    }

    #[test]
    fn test_from_lookup_defaults_port_and_reports_missing() {
        let creds = DatabaseCredentials::from_lookup(
            "X_",
            lookup(&[
                ("X_HOST", "h"),
                ("X_USER", "u"),
                ("X_PASSWORD", "p"),
                ("X_NAME", "d"),
            ]),
        )
        .unwrap();
        assert_eq!(creds.port, 5432);

        let err = DatabaseCredentials::from_lookup("X_", lookup(&[("X_HOST", "h")])).unwrap_err();
        assert!(err.to_string().contains("X_USER"));

        let err = DatabaseCredentials::from_lookup(
            "X_",
            lookup(&[
                ("X_HOST", "h"),
                ("X_PORT", "not-a-port"),
                ("X_USER", "u"),
                ("X_PASSWORD", "p"),
                ("X_NAME", "d"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, QuarryError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_json_file_provider() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"WAREHOUSE_DB_HOST":"dw","WAREHOUSE_DB_PORT":5433,"WAREHOUSE_DB_USER":"loader",
               "WAREHOUSE_DB_PASSWORD":"secret","WAREHOUSE_DB_NAME":"warehouse"}}"#
        )
        .unwrap();

        let provider = JsonFileSecretProvider::new(file.path(), "WAREHOUSE_DB_");
        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds.host, "dw");
        assert_eq!(creds.port, 5433);
        assert_eq!(creds.database, "warehouse");
    }

    #[tokio::test]
    async fn test_json_file_provider_missing_file_is_configuration_error() {
        let provider = JsonFileSecretProvider::new("/nonexistent/quarry.json", "DB_");
        let err = provider.credentials().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_factory_inline() {
        let config = CredentialsConfig {
            provider: CredentialSource::Inline,
            host: Some("localhost".to_string()),
            user: Some("etl".to_string()),
            password: Some(secret_string("pw".to_string())),
            database: Some("dw".to_string()),
            ..CredentialsConfig::default()
        };
        let provider = create_secret_provider(&config, DatabaseRole::Warehouse).unwrap();
        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds.redacted(), "etl@localhost:5432/dw");
    }

    #[test]
    fn test_default_prefixes() {
        assert_eq!(DatabaseRole::Source.default_env_prefix(), "DB_");
        assert_eq!(DatabaseRole::Warehouse.default_env_prefix(), "WAREHOUSE_DB_");
    }
}
