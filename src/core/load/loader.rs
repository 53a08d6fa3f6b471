//! Load stage
//!
//! Inserts transformed batches into the warehouse. Each batch is loaded inside its
//! own transaction: either every row commits or none is visible. Dimensions are
//! loaded before facts.

use crate::adapters::database::WarehouseConnection;
use crate::adapters::notify::notify_quietly;
use crate::adapters::postgresql::WAREHOUSE_SCHEMA_SQL;
use crate::core::load::outcome::{BatchOutcome, FailedBatch, TableLoad};
use crate::core::pipeline::PipelineContext;
use crate::core::staging::read_batch;
use crate::core::status::StageStatus;
use crate::core::transform::{target_for, TransformResponse};
use crate::domain::{Result, SourceTable, StagedBatch, TableKind, WarehouseTable};
use crate::{log_stage_complete, log_stage_start, log_table_failure};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Instant;

/// Load invocation payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Transformed batch keys per table name
    #[serde(default)]
    pub output_s3_keys: BTreeMap<String, Vec<String>>,
}

impl From<&TransformResponse> for LoadRequest {
    fn from(response: &TransformResponse) -> Self {
        Self {
            output_s3_keys: response.output_s3_keys.clone(),
        }
    }
}

/// Load result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResponse {
    /// 200 all loaded, 207 partially loaded, 500 nothing loaded
    pub status_code: u16,
    /// Overall outcome
    pub status: StageStatus,
    /// Rows committed across all tables
    pub rows_loaded: usize,
    /// Warehouse tables whose every batch committed
    pub loaded_tables: Vec<String>,
    /// Batches rolled back or rejected
    pub failed_batches: Vec<FailedBatch>,
    /// Names in the payload with no warehouse table
    pub skipped_tables: Vec<String>,
}

/// Warehouse table for a payload name: a warehouse name, or a source name with a target
pub fn resolve_table(name: &str) -> Option<WarehouseTable> {
    WarehouseTable::from_str(name).ok().or_else(|| {
        SourceTable::from_str(name)
            .ok()
            .and_then(target_for)
    })
}

/// Builds the JSON object sent for one row
///
/// Empty strings become null and the generated surrogate column is left out.
pub fn row_object(table: WarehouseTable, columns: &[String], row: &[Value]) -> Value {
    let generated = table.schema().generated;
    let mut object = Map::with_capacity(columns.len());
    for (column, cell) in columns.iter().zip(row) {
        if Some(column.as_str()) == generated {
            continue;
        }
        let value = match cell {
            Value::String(s) if s.is_empty() => Value::Null,
            other => other.clone(),
        };
        object.insert(column.clone(), value);
    }
    Value::Object(object)
}

/// Header columns outside the table's schema
fn unknown_columns(table: WarehouseTable, batch: &StagedBatch) -> Vec<String> {
    let schema = table.schema();
    batch
        .columns()
        .iter()
        .filter(|c| !schema.contains(c))
        .cloned()
        .collect()
}

/// Inserts every row of `batch` in one transaction
///
/// Stops at the first failing row and rolls back; nothing from the batch is then
/// visible.
pub async fn load_batch(
    conn: &mut dyn WarehouseConnection,
    table: WarehouseTable,
    batch: &StagedBatch,
) -> BatchOutcome {
    let unknown = unknown_columns(table, batch);
    if !unknown.is_empty() {
        return BatchOutcome::failed(format!(
            "columns not in {table}: {}",
            unknown.join(", ")
        ));
    }

    let mut tx = match conn.begin().await {
        Ok(tx) => tx,
        Err(e) => return BatchOutcome::failed(e.to_string()),
    };

    for (index, row) in batch.rows().iter().enumerate() {
        let object = row_object(table, batch.columns(), row);
        if let Err(e) = tx.insert_row(table, &object).await {
            tracing::warn!(table = %table, row = index, error = %e, "Row insert failed; rolling back batch");
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(table = %table, error = %rollback, "Rollback failed");
            }
            return BatchOutcome::Failed {
                row_index: Some(index),
                reason: e.to_string(),
            };
        }
    }

    match tx.commit().await {
        Ok(()) => BatchOutcome::Loaded { rows: batch.len() },
        Err(e) => BatchOutcome::failed(e.to_string()),
    }
}

/// Load stage
pub struct Loader<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> Loader<'a> {
    /// Creates a loader
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// Runs the stage and sends the outcome notification
    pub async fn run(
        &self,
        warehouse: &mut dyn WarehouseConnection,
        request: &LoadRequest,
    ) -> Result<LoadResponse> {
        match self.execute(warehouse, request).await {
            Ok(response) => {
                if response.status != StageStatus::Skipped {
                    let summary = format!(
                        "Loaded {} rows into {} tables ({} batches failed).",
                        response.rows_loaded,
                        response.loaded_tables.len(),
                        response.failed_batches.len()
                    );
                    let subject = response.status.notification_subject("Load");
                    notify_quietly(self.ctx.notifier(), &subject, &summary).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, "Load failed");
                notify_quietly(self.ctx.notifier(), "Load Failed", &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Runs the stage
    pub async fn execute(
        &self,
        warehouse: &mut dyn WarehouseConnection,
        request: &LoadRequest,
    ) -> Result<LoadResponse> {
        let start = Instant::now();
        let (plan, skipped_tables) = plan_load(request);

        if plan.is_empty() {
            tracing::info!("No transformed batches in payload; nothing to load");
            return Ok(LoadResponse {
                status_code: 200,
                status: StageStatus::Skipped,
                rows_loaded: 0,
                loaded_tables: Vec::new(),
                failed_batches: Vec::new(),
                skipped_tables,
            });
        }

        if self.ctx.config().load.apply_schema && !self.ctx.dry_run() {
            tracing::info!("Applying warehouse schema");
            warehouse.apply_schema(WAREHOUSE_SCHEMA_SQL).await?;
        }

        log_stage_start!("load", plan.len());

        let mut loaded_tables = Vec::new();
        let mut failed_batches = Vec::new();
        let mut rows_loaded = 0;
        let mut failed_tables = 0;

        for (table, keys) in &plan {
            let mut tally = TableLoad::default();
            for key in keys {
                let outcome = self.load_key(warehouse, *table, key).await;
                tally.add(&outcome);
                if let BatchOutcome::Failed { row_index, reason } = outcome {
                    log_table_failure!("load", table, &reason);
                    failed_batches.push(FailedBatch {
                        table: table.to_string(),
                        key: key.clone(),
                        row_index,
                        reason,
                    });
                }
            }

            rows_loaded += tally.rows;
            if tally.fully_loaded() {
                tracing::info!(table = %table, rows = tally.rows, batches = tally.loaded_batches, "Table loaded");
                loaded_tables.push(table.to_string());
            } else {
                failed_tables += 1;
            }
        }

        log_stage_complete!("load", rows_loaded, failed_tables, start.elapsed());

        let status_code = match (loaded_tables.is_empty(), failed_batches.is_empty()) {
            (_, true) => 200,
            (false, false) => 207,
            (true, false) => 500,
        };

        Ok(LoadResponse {
            status_code,
            status: StageStatus::from_counts(plan.len(), failed_tables),
            rows_loaded,
            loaded_tables,
            failed_batches,
            skipped_tables,
        })
    }

    async fn load_key(
        &self,
        warehouse: &mut dyn WarehouseConnection,
        table: WarehouseTable,
        key: &str,
    ) -> BatchOutcome {
        let batch = match read_batch(self.ctx.store().as_ref(), key).await {
            Ok((batch, _)) => batch,
            Err(e) => return BatchOutcome::failed(e.to_string()),
        };

        if self.ctx.dry_run() {
            let unknown = unknown_columns(table, &batch);
            if !unknown.is_empty() {
                return BatchOutcome::failed(format!("columns not in {table}: {}", unknown.join(", ")));
            }
            tracing::info!(table = %table, key = key, rows = batch.len(), "Dry run: batch not loaded");
            return BatchOutcome::Loaded { rows: batch.len() };
        }

        let outcome = load_batch(warehouse, table, &batch).await;
        if outcome.is_loaded() {
            tracing::debug!(table = %table, key = key, rows = batch.len(), "Batch committed");
        }
        outcome
    }
}

/// Resolves payload names and orders tables dimensions first
fn plan_load(request: &LoadRequest) -> (Vec<(WarehouseTable, Vec<String>)>, Vec<String>) {
    let mut resolved: BTreeMap<WarehouseTable, Vec<String>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (name, keys) in &request.output_s3_keys {
        match resolve_table(name) {
            Some(table) => resolved.entry(table).or_default().extend(keys.iter().cloned()),
            None => {
                tracing::warn!(table = %name, "No warehouse table for staged name; skipping");
                skipped.push(name.clone());
            }
        }
    }

    let mut plan: Vec<_> = resolved
        .into_iter()
        .filter(|(_, keys)| !keys.is_empty())
        .collect();
    plan.sort_by_key(|(table, _)| (table.kind() == TableKind::Fact, *table));
    (plan, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_table_accepts_warehouse_and_source_names() {
        assert_eq!(resolve_table("dim_staff"), Some(WarehouseTable::DimStaff));
        assert_eq!(resolve_table("sales_order"), Some(WarehouseTable::FactSalesOrder));
        assert_eq!(resolve_table("address"), Some(WarehouseTable::DimLocation));
        assert_eq!(resolve_table("department"), None);
        assert_eq!(resolve_table("dim_department"), None);
    }

    #[test]
    fn test_row_object_nulls_empty_strings_and_drops_surrogate() {
        let table = WarehouseTable::FactPayment;
        let columns: Vec<String> = table.schema().columns.iter().map(|c| c.to_string()).collect();
        let mut row = vec![Value::Null; columns.len()];
        row[1] = json!(7);
        row[6] = json!("");

        let object = row_object(table, &columns, &row);
        let map = object.as_object().unwrap();

        assert!(!map.contains_key("payment_record_id"));
        assert_eq!(map.get("payment_id"), Some(&json!(7)));
        assert_eq!(map.get(columns[6].as_str()), Some(&Value::Null));
        assert_eq!(map.len(), columns.len() - 1);
    }

    #[test]
    fn test_plan_orders_dimensions_first_and_skips_unknown() {
        let request = LoadRequest {
            output_s3_keys: BTreeMap::from([
                ("fact_payment".to_string(), vec!["a".to_string()]),
                ("dim_currency".to_string(), vec!["b".to_string()]),
                ("dim_department".to_string(), vec!["c".to_string()]),
                ("dim_date".to_string(), vec!["d".to_string()]),
            ]),
        };
        let (plan, skipped) = plan_load(&request);
        let kinds: Vec<TableKind> = plan.iter().map(|(t, _)| t.kind()).collect();

        assert_eq!(
            kinds,
            vec![TableKind::Dimension, TableKind::Dimension, TableKind::Fact]
        );
        assert_eq!(skipped, vec!["dim_department".to_string()]);
    }
}
