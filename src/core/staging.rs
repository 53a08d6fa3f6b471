//! Reading and writing staged batches
//!
//! A batch is two objects: the JSON Lines data object and its `metadata.json`
//! sidecar. The data object is written first, so a sidecar never points at a
//! missing data object.

use crate::adapters::storage::ObjectStore;
use crate::domain::batch::{checksum, data_key, metadata_key};
use crate::domain::context::ResultExt;
use crate::domain::{BatchMetadata, BatchStage, QuarryError, Result, StagedBatch};
use chrono::{DateTime, Utc};

/// Writes a batch and its sidecar under `prefix/table/...`, returning the data key
pub async fn write_batch(
    store: &dyn ObjectStore,
    prefix: &str,
    table: &str,
    stage: BatchStage,
    batch: &StagedBatch,
    created_at: DateTime<Utc>,
    last_updated_field: Option<&str>,
) -> Result<String> {
    let encoded = batch.encode()?;
    let metadata = batch.metadata(table, stage, created_at, last_updated_field, &encoded);
    let key = data_key(prefix, table, created_at);

    store.put(&key, encoded).await?;
    store
        .put(&metadata_key(&key), serde_json::to_vec_pretty(&metadata)?)
        .await?;

    tracing::debug!(
        key = %key,
        table = table,
        rows = batch.len(),
        stage = %stage,
        "Staged batch written"
    );
    Ok(key)
}

/// Reads a batch and checks it against its sidecar
///
/// # Errors
///
/// Fails when either object is missing, the checksum or row count disagrees with
/// the sidecar, or the header differs from the declared columns.
pub async fn read_batch(store: &dyn ObjectStore, key: &str) -> Result<(StagedBatch, BatchMetadata)> {
    let data = store.get(key).await?;
    let metadata: BatchMetadata = serde_json::from_slice(&store.get(&metadata_key(key)).await?)
        .with_context(|| format!("Malformed metadata for {key}"))?;

    let actual = checksum(&data);
    if actual != metadata.checksum {
        return Err(QuarryError::Validation(format!(
            "Checksum mismatch for {key}: expected {}, got {actual}",
            metadata.checksum
        )));
    }

    let batch = StagedBatch::decode(&data)?;
    if batch.len() != metadata.row_count || batch.columns() != metadata.columns.as_slice() {
        return Err(QuarryError::Validation(format!(
            "Batch {key} does not match its metadata"
        )));
    }

    Ok((batch, metadata))
}
