//! PostgreSQL source reader

use crate::adapters::database::traits::{RawRow, SourceDatabase};
use crate::adapters::postgresql::client::{describe, PostgreSQLClient};
use crate::core::extract::ExtractQuery;
use crate::domain::{QuarryError, Result};
use async_trait::async_trait;
use tokio_postgres::types::ToSql;

/// Operational source database backed by PostgreSQL
pub struct PostgreSQLSource {
    client: PostgreSQLClient,
}

impl PostgreSQLSource {
    /// Wraps a pooled client
    pub fn new(client: PostgreSQLClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceDatabase for PostgreSQLSource {
    async fn fetch(&self, query: &ExtractQuery) -> Result<Vec<RawRow>> {
        let rows = match query.parameter() {
            Some(since) => {
                let params: [&(dyn ToSql + Sync); 1] = [&since];
                self.client.query(query.sql(), &params).await?
            }
            None => self.client.query(query.sql(), &[]).await?,
        };

        let width = query.columns().len();
        rows.iter()
            .map(|row| {
                (0..width)
                    .map(|i| {
                        row.try_get::<_, Option<String>>(i).map_err(|e| {
                            QuarryError::extraction(
                                query.table().as_str(),
                                format!("column {}: {}", query.columns()[i], describe(&e)),
                            )
                        })
                    })
                    .collect::<Result<RawRow>>()
            })
            .collect()
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }
}
