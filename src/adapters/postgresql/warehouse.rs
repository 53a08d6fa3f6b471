//! PostgreSQL warehouse writer
//!
//! Rows arrive as JSON objects and are projected through `json_populate_record`,
//! so the warehouse column types drive the conversion of every cell.

use crate::adapters::database::traits::{WarehouseConnection, WarehouseTransaction};
use crate::adapters::postgresql::client::{describe, PostgreSQLClient};
use crate::core::extract::query::quote_ident;
use crate::domain::{QuarryError, Result, TableKind, WarehouseSchema, WarehouseTable};
use async_trait::async_trait;
use deadpool_postgres::{Object, Transaction};
use serde_json::Value;
use tokio_postgres::types::ToSql;

/// Warehouse backed by PostgreSQL
pub struct PostgreSQLWarehouse {
    client: PostgreSQLClient,
}

impl PostgreSQLWarehouse {
    /// Wraps a pooled client
    pub fn new(client: PostgreSQLClient) -> Self {
        Self { client }
    }

    /// Checks out the connection a load run holds until it finishes
    pub async fn connect(&self) -> Result<PgWarehouseConnection> {
        let conn = self.client.get_connection().await?;
        tracing::debug!(target_db = %self.client.target(), "Warehouse connection acquired");
        Ok(PgWarehouseConnection { conn })
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }
}

/// One pooled warehouse connection
pub struct PgWarehouseConnection {
    conn: Object,
}

#[async_trait]
impl WarehouseConnection for PgWarehouseConnection {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn WarehouseTransaction + Send + 'a>> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| QuarryError::Database(format!("BEGIN failed: {}", describe(&e))))?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn apply_schema(&mut self, ddl: &str) -> Result<()> {
        self.conn
            .batch_execute(ddl)
            .await
            .map_err(|e| QuarryError::Database(format!("Failed to apply schema: {}", describe(&e))))?;
        tracing::info!("Warehouse schema applied");
        Ok(())
    }
}

/// An open PostgreSQL transaction
pub struct PgTransaction<'a> {
    tx: Transaction<'a>,
}

#[async_trait]
impl<'a> WarehouseTransaction for PgTransaction<'a> {
    async fn insert_row(&mut self, table: WarehouseTable, row: &Value) -> Result<()> {
        let sql = insert_statement(table.schema());
        let params: [&(dyn ToSql + Sync); 1] = [row];
        self.tx
            .execute(sql.as_str(), &params)
            .await
            .map_err(|e| QuarryError::load(table.as_str(), describe(&e)))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| QuarryError::Database(format!("COMMIT failed: {}", describe(&e))))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| QuarryError::Database(format!("ROLLBACK failed: {}", describe(&e))))
    }
}

/// Builds the single-row INSERT for a warehouse table
///
/// Dimensions upsert on their key. Facts skip a row version that is already
/// stored, so replaying a committed batch adds nothing; the generated surrogate
/// key is left to the warehouse.
pub fn insert_statement(schema: &WarehouseSchema) -> String {
    let columns = schema
        .insert_columns()
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");
    let table = quote_ident(schema.name);
    let conflict = schema
        .conflict_columns()
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {table} ({columns}) SELECT {columns} FROM json_populate_record(NULL::{table}, $1::json)"
    );

    let updates = match schema.kind {
        TableKind::Dimension => schema
            .insert_columns()
            .into_iter()
            .filter(|c| *c != schema.key)
            .map(|c| format!("{0} = EXCLUDED.{0}", quote_ident(c)))
            .collect::<Vec<_>>(),
        TableKind::Fact => Vec::new(),
    };
    if updates.is_empty() {
        sql.push_str(&format!(" ON CONFLICT ({conflict}) DO NOTHING"));
    } else {
        sql.push_str(&format!(
            " ON CONFLICT ({conflict}) DO UPDATE SET {}",
            updates.join(", ")
        ));
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::postgresql::WAREHOUSE_SCHEMA_SQL;

    #[test]
    fn test_dimension_upserts_on_key() {
        let sql = insert_statement(WarehouseTable::DimCurrency.schema());
        assert_eq!(
            sql,
            "INSERT INTO \"dim_currency\" (\"currency_id\", \"currency_code\", \"currency_name\") \
             SELECT \"currency_id\", \"currency_code\", \"currency_name\" \
             FROM json_populate_record(NULL::\"dim_currency\", $1::json) \
             ON CONFLICT (\"currency_id\") DO UPDATE SET \
             \"currency_code\" = EXCLUDED.\"currency_code\", \"currency_name\" = EXCLUDED.\"currency_name\""
        );
    }

    #[test]
    fn test_fact_omits_generated_key_and_skips_stored_versions() {
        let sql = insert_statement(WarehouseTable::FactPayment.schema());
        assert!(!sql.contains("payment_record_id"));
        assert!(sql.contains("\"payment_id\""));
        assert!(sql.ends_with(
            " ON CONFLICT (\"payment_id\", \"last_updated_date\", \"last_updated_time\") DO NOTHING"
        ));
    }

    #[test]
    fn test_bundled_schema_backs_every_conflict_target() {
        for table in WarehouseTable::ALL {
            let schema = table.schema();
            if schema.kind == TableKind::Fact {
                let constraint = format!("UNIQUE ({})", schema.conflict_columns().join(", "));
                assert!(WAREHOUSE_SCHEMA_SQL.contains(&constraint), "{table}: {constraint}");
            }
        }
    }

    #[test]
    fn test_every_statement_binds_one_parameter() {
        for table in WarehouseTable::ALL {
            let sql = insert_statement(table.schema());
            assert_eq!(sql.matches("$1").count(), 1, "{table}");
        }
    }
}
