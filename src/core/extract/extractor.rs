//! Incremental extractor
//!
//! For each requested table: read the rows changed since the table's watermark,
//! stage them as one raw batch, and advance the watermark to the greatest
//! change-timestamp actually extracted. A failing table is skipped and reported;
//! the watermark map is saved once, after every table has been attempted.

use crate::adapters::database::{RawRow, SourceDatabase};
use crate::adapters::notify::notify_quietly;
use crate::core::extract::query::ExtractQuery;
use crate::core::pipeline::PipelineContext;
use crate::core::staging::write_batch;
use crate::core::state::watermark::{parse_timestamp, Since, WatermarkState};
use crate::core::state::StateManager;
use crate::core::status::StageStatus;
use crate::domain::{BatchStage, QuarryError, Result, SourceTable, StagedBatch};
use crate::{log_stage_complete, log_stage_start, log_table_failure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Extraction invocation payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// Tables to extract; absent means the configured set
    #[serde(default)]
    pub tables: Option<Vec<String>>,
}

/// Extraction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    /// Overall outcome
    pub status: StageStatus,
    /// Rows staged across all tables
    pub rows: usize,
    /// Data keys of the batches staged in this cycle, per source table
    pub s3_keys: BTreeMap<String, Vec<String>>,
    /// Tables that failed and were skipped
    #[serde(default)]
    pub failed_tables: Vec<String>,
    /// Watermark map as saved at the end of the cycle
    #[serde(default)]
    pub watermarks: BTreeMap<String, String>,
}

/// What one table contributed to the cycle
#[derive(Debug)]
struct TableExtract {
    rows: usize,
    key: Option<String>,
    max_change: Option<DateTime<Utc>>,
}

/// Extraction stage
pub struct Extractor<'a> {
    ctx: &'a PipelineContext,
    source: Arc<dyn SourceDatabase>,
    state: StateManager,
}

impl<'a> Extractor<'a> {
    /// Creates an extractor reading from `source`
    pub fn new(ctx: &'a PipelineContext, source: Arc<dyn SourceDatabase>) -> Self {
        let state = StateManager::new(ctx.store().clone(), ctx.config().storage.state_key.clone());
        Self { ctx, source, state }
    }

    /// Runs one extraction cycle and sends the outcome notification
    pub async fn run(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        match self.execute(request).await {
            Ok(response) => {
                let summary = format!(
                    "Ingested {} rows from {} tables ({} failed).",
                    response.rows,
                    response.s3_keys.len(),
                    response.failed_tables.len()
                );
                let subject = response.status.notification_subject("Ingestion");
                notify_quietly(self.ctx.notifier(), &subject, &summary).await;
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, "Ingestion failed");
                notify_quietly(self.ctx.notifier(), "Ingestion Failed", &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Runs one extraction cycle
    ///
    /// # Errors
    ///
    /// Rejects table names outside the allow-list before any I/O. Failing to load
    /// or save the watermark map is fatal; per-table failures are not.
    pub async fn execute(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        let start = Instant::now();
        let tables = self.resolve_tables(request)?;
        log_stage_start!("extract", tables.len());

        let mut state = self.state.load().await?;
        let created_at = Utc::now();

        let mut s3_keys: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut failed_tables = Vec::new();
        let mut total_rows = 0;

        for table in &tables {
            match self.extract_table(*table, &state, created_at).await {
                Ok(extract) => {
                    total_rows += extract.rows;
                    if let Some(key) = extract.key {
                        s3_keys.entry(table.to_string()).or_default().push(key);
                    }
                    if let Some(max) = extract.max_change {
                        if state.advance(table.as_str(), max) {
                            tracing::debug!(table = %table, watermark = ?state.get(table.as_str()), "Watermark advanced");
                        }
                    }
                }
                Err(e) => {
                    log_table_failure!("extract", table, &e);
                    failed_tables.push(table.to_string());
                }
            }
        }

        if self.ctx.dry_run() {
            tracing::info!("Dry run: watermark state not saved");
        } else {
            self.state.save(&state).await?;
        }

        log_stage_complete!("extract", total_rows, failed_tables.len(), start.elapsed());

        Ok(ExtractResponse {
            status: StageStatus::from_counts(tables.len(), failed_tables.len()),
            rows: total_rows,
            s3_keys,
            failed_tables,
            watermarks: state
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    fn resolve_tables(&self, request: &ExtractRequest) -> Result<Vec<SourceTable>> {
        match &request.tables {
            Some(names) => names.iter().map(|n| SourceTable::from_str(n)).collect(),
            None => self.ctx.config().extract.resolved_tables(),
        }
    }

    async fn extract_table(
        &self,
        table: SourceTable,
        state: &WatermarkState,
        created_at: DateTime<Utc>,
    ) -> Result<TableExtract> {
        let since = state.since(table.as_str());
        match &since {
            Since::Never => tracing::info!(table = %table, "Extracting (full load)"),
            Since::After(ts) => tracing::info!(table = %table, since = %ts, "Extracting incrementally"),
            Since::Unparseable(raw) => tracing::warn!(
                table = %table,
                watermark = %raw,
                "Unparseable watermark; falling back to full load"
            ),
        }

        let query = ExtractQuery::build(table, since.lower_bound());
        let rows = self
            .source
            .fetch(&query)
            .await
            .map_err(|e| match e {
                QuarryError::Extraction { .. } => e,
                other => QuarryError::extraction(table.as_str(), other.to_string()),
            })?;

        if rows.is_empty() {
            tracing::info!(table = %table, "No new rows");
            return Ok(TableExtract {
                rows: 0,
                key: None,
                max_change: None,
            });
        }

        let batch = to_batch(table, rows)?;
        let max_change = max_change_timestamp(table, &batch);

        let key = if self.ctx.dry_run() {
            tracing::info!(table = %table, rows = batch.len(), "Dry run: batch not staged");
            None
        } else {
            let key = write_batch(
                self.ctx.store().as_ref(),
                &self.ctx.config().storage.raw_prefix,
                table.as_str(),
                BatchStage::Raw,
                &batch,
                created_at,
                table.schema().change_column,
            )
            .await
            .map_err(|e| QuarryError::extraction(table.as_str(), e.to_string()))?;
            tracing::info!(table = %table, rows = batch.len(), key = %key, "Staged raw batch");
            Some(key)
        };

        Ok(TableExtract {
            rows: batch.len(),
            key,
            max_change,
        })
    }
}

/// Turns driver rows into a raw batch with the table's declared header
fn to_batch(table: SourceTable, rows: Vec<RawRow>) -> Result<StagedBatch> {
    let mut batch = StagedBatch::new(table.schema().columns.iter().copied());
    for row in rows {
        let cells = row
            .into_iter()
            .map(|cell| cell.map_or(Value::Null, Value::String))
            .collect();
        batch
            .push_row(cells)
            .map_err(|e| QuarryError::extraction(table.as_str(), e.to_string()))?;
    }
    Ok(batch)
}

/// Greatest parseable change-timestamp in a batch
fn max_change_timestamp(table: SourceTable, batch: &StagedBatch) -> Option<DateTime<Utc>> {
    let index = batch.column_index(table.schema().change_column?)?;
    let mut unparseable = 0usize;

    let max = batch
        .rows()
        .iter()
        .filter_map(|row| match row.get(index).and_then(Value::as_str) {
            Some(raw) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    unparseable += 1;
                }
                parsed
            }
            None => {
                unparseable += 1;
                None
            }
        })
        .max();

    if unparseable > 0 {
        tracing::warn!(
            table = %table,
            rows = unparseable,
            "Rows with unparseable change-timestamp do not advance the watermark"
        );
    }
    max
}
