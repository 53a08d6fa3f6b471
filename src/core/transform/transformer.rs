//! Transform stage
//!
//! Reads the raw batches of one extraction cycle, maps them onto the warehouse
//! star schema and stages one transformed batch per produced target. Each target
//! succeeds or fails on its own.

use crate::adapters::notify::notify_quietly;
use crate::core::extract::ExtractResponse;
use crate::core::pipeline::PipelineContext;
use crate::core::staging::{read_batch, write_batch};
use crate::core::status::StageStatus;
use crate::core::transform::dimensions;
use crate::core::transform::facts;
use crate::core::transform::lookups::Lookups;
use crate::domain::batch::DATA_FILE;
use crate::domain::{
    BatchStage, QuarryError, Record, Result, SourceRow, SourceTable, StagedBatch, TableKind,
    WarehouseTable,
};
use crate::{log_stage_complete, log_stage_start, log_table_failure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Instant;

/// Transform invocation payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Raw batch keys per source table
    #[serde(default)]
    pub s3_keys: BTreeMap<String, Vec<String>>,
}

impl From<&ExtractResponse> for TransformRequest {
    fn from(response: &ExtractResponse) -> Self {
        Self {
            s3_keys: response.s3_keys.clone(),
        }
    }
}

/// Transform result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResponse {
    /// Overall outcome
    pub status: StageStatus,
    /// Transformed batch keys per warehouse table
    pub output_s3_keys: BTreeMap<String, Vec<String>>,
    /// Records produced across all targets
    pub num_records: usize,
    /// Targets that failed this cycle
    #[serde(default)]
    pub failed_tables: Vec<String>,
    /// Explanation for a skipped run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TransformResponse {
    fn skipped(message: &str) -> Self {
        Self {
            status: StageStatus::Skipped,
            output_s3_keys: BTreeMap::new(),
            num_records: 0,
            failed_tables: Vec::new(),
            message: Some(message.to_string()),
        }
    }
}

/// Source table feeding each directly mapped target, dimensions first
pub const TARGET_SOURCES: [(WarehouseTable, SourceTable); 10] = [
    (WarehouseTable::DimCounterparty, SourceTable::Counterparty),
    (WarehouseTable::DimCurrency, SourceTable::Currency),
    (WarehouseTable::DimDesign, SourceTable::Design),
    (WarehouseTable::DimLocation, SourceTable::Address),
    (WarehouseTable::DimPaymentType, SourceTable::PaymentType),
    (WarehouseTable::DimStaff, SourceTable::Staff),
    (WarehouseTable::DimTransaction, SourceTable::Transaction),
    (WarehouseTable::FactSalesOrder, SourceTable::SalesOrder),
    (WarehouseTable::FactPurchaseOrder, SourceTable::PurchaseOrder),
    (WarehouseTable::FactPayment, SourceTable::Payment),
];

/// Warehouse target produced from a source table, if any
pub fn target_for(source: SourceTable) -> Option<WarehouseTable> {
    TARGET_SOURCES
        .iter()
        .find(|(_, s)| *s == source)
        .map(|(t, _)| *t)
}

/// Maps the rows of `target`'s source onto `target`
pub fn map_target(
    target: WarehouseTable,
    rows: &[SourceRow<'_>],
    lookups: &Lookups,
) -> Result<Vec<Record>> {
    match target {
        WarehouseTable::DimCounterparty => dimensions::dim_counterparty(rows, lookups),
        WarehouseTable::DimCurrency => dimensions::dim_currency(rows),
        WarehouseTable::DimDesign => dimensions::dim_design(rows),
        WarehouseTable::DimLocation => dimensions::dim_location(rows),
        WarehouseTable::DimPaymentType => dimensions::dim_payment_type(rows),
        WarehouseTable::DimStaff => dimensions::dim_staff(rows, lookups),
        WarehouseTable::DimTransaction => dimensions::dim_transaction(rows),
        WarehouseTable::FactSalesOrder => facts::fact_sales_order(rows),
        WarehouseTable::FactPurchaseOrder => facts::fact_purchase_order(rows),
        WarehouseTable::FactPayment => facts::fact_payment(rows),
        WarehouseTable::DimDate => Err(QuarryError::transform(
            target.as_str(),
            "derived from fact records, not from a source table",
        )),
    }
}

/// Collapses dimension records sharing a key; the last one wins, first position kept
pub fn dedup_by_key(records: Vec<Record>) -> Vec<Record> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Record> = Vec::with_capacity(records.len());
    for record in records {
        let key = record.key().to_string();
        match positions.get(&key) {
            Some(&i) => out[i] = record,
            None => {
                positions.insert(key, out.len());
                out.push(record);
            }
        }
    }
    out
}

fn needs_lookups(target: WarehouseTable) -> bool {
    matches!(
        target,
        WarehouseTable::DimCounterparty | WarehouseTable::DimStaff
    )
}

fn source_rows(batches: &[StagedBatch]) -> Vec<SourceRow<'_>> {
    batches
        .iter()
        .flat_map(|b| b.rows().iter().map(move |r| SourceRow::new(b.columns(), r)))
        .collect()
}

/// Transform stage
pub struct Transformer<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> Transformer<'a> {
    /// Creates a transformer
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// Runs the stage and sends the outcome notification
    pub async fn run(&self, request: &TransformRequest) -> Result<TransformResponse> {
        match self.execute(request).await {
            Ok(response) => {
                if response.status != StageStatus::Skipped {
                    let summary = format!(
                        "Transformed {} records into {} tables ({} failed).",
                        response.num_records,
                        response.output_s3_keys.len(),
                        response.failed_tables.len()
                    );
                    let subject = response.status.notification_subject("Transform");
                    notify_quietly(self.ctx.notifier(), &subject, &summary).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, "Transform failed");
                notify_quietly(self.ctx.notifier(), "Transform Failed", &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Runs the stage
    pub async fn execute(&self, request: &TransformRequest) -> Result<TransformResponse> {
        let start = Instant::now();
        let inputs = self.parse_inputs(request);
        if inputs.values().all(Vec::is_empty) {
            tracing::info!("No raw batches in payload; nothing to transform");
            return Ok(TransformResponse::skipped(
                "No data to transform (empty s3_keys from ingestion)",
            ));
        }
        log_stage_start!("transform", inputs.len());

        let mut raw: HashMap<SourceTable, Result<Vec<StagedBatch>>> = HashMap::new();
        for (table, keys) in &inputs {
            raw.insert(*table, self.read_batches(keys).await);
        }
        let lookups = self.load_lookups(&inputs).await;
        let created_at = Utc::now();

        let mut output_s3_keys = BTreeMap::new();
        let mut failed_tables = Vec::new();
        let mut num_records = 0;
        let mut attempted = 0;
        let mut fact_records: Vec<Record> = Vec::new();

        for (target, source) in TARGET_SOURCES {
            let Some(batches) = raw.get(&source) else {
                continue;
            };
            attempted += 1;

            let produced = match (batches, &lookups) {
                (Err(e), _) => Err(QuarryError::transform(
                    target.as_str(),
                    format!("cannot read {source} batches: {e}"),
                )),
                (Ok(_), Err(e)) if needs_lookups(target) => Err(QuarryError::transform(
                    target.as_str(),
                    format!("lookups unavailable: {e}"),
                )),
                (Ok(batches), lookups) => {
                    let empty = Lookups::new();
                    let lookups = lookups.as_ref().unwrap_or(&empty);
                    map_target(target, &source_rows(batches), lookups)
                }
            };

            let records = match produced {
                Ok(records) if target.kind() == TableKind::Dimension => dedup_by_key(records),
                Ok(records) => {
                    fact_records.extend(records.iter().cloned());
                    records
                }
                Err(e) => {
                    log_table_failure!("transform", target, &e);
                    failed_tables.push(target.to_string());
                    continue;
                }
            };

            match self.stage(target, records, created_at).await {
                Ok((count, key)) => {
                    num_records += count;
                    if let Some(key) = key {
                        output_s3_keys.insert(target.to_string(), vec![key]);
                    }
                }
                Err(e) => {
                    log_table_failure!("transform", target, &e);
                    failed_tables.push(target.to_string());
                }
            }
        }

        if !fact_records.is_empty() {
            attempted += 1;
            let target = WarehouseTable::DimDate;
            let staged = match dimensions::dim_date(&fact_records) {
                Ok(records) => self.stage(target, records, created_at).await,
                Err(e) => Err(e),
            };
            match staged {
                Ok((count, key)) => {
                    num_records += count;
                    if let Some(key) = key {
                        output_s3_keys.insert(target.to_string(), vec![key]);
                    }
                }
                Err(e) => {
                    log_table_failure!("transform", target, &e);
                    failed_tables.push(target.to_string());
                }
            }
        }

        log_stage_complete!("transform", num_records, failed_tables.len(), start.elapsed());

        Ok(TransformResponse {
            status: StageStatus::from_counts(attempted, failed_tables.len()),
            output_s3_keys,
            num_records,
            failed_tables,
            message: None,
        })
    }

    /// Payload entries keyed by allow-listed source table
    fn parse_inputs(&self, request: &TransformRequest) -> BTreeMap<SourceTable, Vec<String>> {
        let mut inputs = BTreeMap::new();
        for (name, keys) in &request.s3_keys {
            match SourceTable::from_str(name) {
                Ok(table) if !keys.is_empty() => {
                    inputs.insert(table, keys.clone());
                }
                Ok(_) => {}
                Err(_) => tracing::warn!(table = %name, "Ignoring batches for unknown source table"),
            }
        }
        inputs
    }

    async fn read_batches(&self, keys: &[String]) -> Result<Vec<StagedBatch>> {
        let mut batches = Vec::with_capacity(keys.len());
        for key in keys {
            let (batch, _) = read_batch(self.ctx.store().as_ref(), key).await?;
            batches.push(batch);
        }
        Ok(batches)
    }

    /// Loads address and department rows: staged history plus this cycle's batches
    ///
    /// An unreadable batch is skipped; the joins it would have fed resolve to null.
    async fn load_lookups(&self, inputs: &BTreeMap<SourceTable, Vec<String>>) -> Result<Lookups> {
        let prefix = self.ctx.config().storage.raw_prefix.trim_end_matches('/');
        let mut lookups = Lookups::new();

        for table in SourceTable::ALL.into_iter().filter(SourceTable::is_lookup) {
            let mut keys: Vec<String> = inputs.get(&table).cloned().unwrap_or_default();
            if self.ctx.config().transform.lookup_history {
                let listed = self
                    .ctx
                    .store()
                    .list(&format!("{prefix}/{table}/"))
                    .await?;
                keys.extend(listed.into_iter().filter(|k| k.ends_with(DATA_FILE)));
            }
            keys.sort();
            keys.dedup();

            for key in &keys {
                match read_batch(self.ctx.store().as_ref(), key).await {
                    Ok((batch, _)) => lookups.absorb(table, &batch),
                    Err(e) => {
                        tracing::warn!(table = %table, key = %key, error = %e, "Skipping unreadable lookup batch");
                    }
                }
            }
        }

        let (addresses, departments) = lookups.counts();
        tracing::debug!(addresses, departments, "Lookups loaded");
        Ok(lookups)
    }

    /// Writes one target's records; returns the record count and the key written
    async fn stage(
        &self,
        target: WarehouseTable,
        records: Vec<Record>,
        created_at: DateTime<Utc>,
    ) -> Result<(usize, Option<String>)> {
        if records.is_empty() {
            tracing::info!(table = %target, "No records produced; nothing staged");
            return Ok((0, None));
        }

        let count = records.len();
        let mut batch = StagedBatch::new(target.schema().columns.iter().copied());
        for record in records {
            batch.push_row(record.into_cells())?;
        }

        if self.ctx.dry_run() {
            tracing::info!(table = %target, records = count, "Dry run: batch not staged");
            return Ok((count, None));
        }

        let key = write_batch(
            self.ctx.store().as_ref(),
            &self.ctx.config().storage.processed_prefix,
            target.as_str(),
            BatchStage::Transformed,
            &batch,
            created_at,
            None,
        )
        .await?;
        tracing::info!(table = %target, records = count, key = %key, "Staged transformed batch");
        Ok((count, Some(key)))
    }
}
