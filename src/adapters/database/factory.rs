//! Database client factory
//!
//! This module provides factory functions to create the source and warehouse
//! clients from configuration. Credentials are resolved first; failing to get
//! them is a fatal startup error.

use crate::adapters::database::traits::SourceDatabase;
use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLSource, PostgreSQLWarehouse};
use crate::adapters::secrets::{create_secret_provider, DatabaseRole};
use crate::config::{DatabaseConfig, QuarryConfig};
use crate::domain::Result;
use std::sync::Arc;

async fn create_client(config: &DatabaseConfig, role: DatabaseRole) -> Result<PostgreSQLClient> {
    let provider = create_secret_provider(&config.credentials, role)?;
    let credentials = provider.credentials().await?;

    tracing::info!(
        role = %role,
        target_db = %credentials.redacted(),
        ssl_mode = %config.ssl_mode,
        "Creating PostgreSQL client"
    );
    PostgreSQLClient::new(config, &credentials).await
}

/// Create the operational source reader
///
/// # Errors
///
/// Returns an error if credentials cannot be retrieved or the pool cannot be built
pub async fn create_source(config: &QuarryConfig) -> Result<Arc<dyn SourceDatabase>> {
    let client = create_client(&config.source, DatabaseRole::Source).await?;
    Ok(Arc::new(PostgreSQLSource::new(client)))
}

/// Create the warehouse writer
///
/// # Errors
///
/// Returns an error if credentials cannot be retrieved or the pool cannot be built
pub async fn create_warehouse(config: &QuarryConfig) -> Result<PostgreSQLWarehouse> {
    let client = create_client(&config.warehouse, DatabaseRole::Warehouse).await?;
    Ok(PostgreSQLWarehouse::new(client))
}
