//! Staged batch format
//!
//! A staged batch is an immutable JSON Lines object: the first line is a JSON array
//! of column names, each following line a JSON array of scalar cells aligned to it.
//! A sidecar `metadata.json` describes the batch and carries a SHA-256 checksum of
//! the data object.

use crate::domain::{QuarryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Schema version written into every metadata sidecar
pub const SCHEMA_VERSION: &str = "1.0";

/// Serialization format tag written into every metadata sidecar
pub const BATCH_FORMAT: &str = "jsonl";

/// File name of the data object inside a batch directory
pub const DATA_FILE: &str = "data.jsonl";

/// File name of the metadata sidecar inside a batch directory
pub const METADATA_FILE: &str = "metadata.json";

/// Pipeline stage a batch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStage {
    /// Raw rows written by the extractor
    Raw,
    /// Warehouse-shaped rows written by the transformer
    Transformed,
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStage::Raw => f.write_str("raw"),
            BatchStage::Transformed => f.write_str("transformed"),
        }
    }
}

/// Sidecar describing a staged batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Source table (raw) or warehouse table (transformed)
    pub table: String,
    /// Stage the batch belongs to
    pub stage: BatchStage,
    /// Creation timestamp, `YYYY-MM-DDTHH-MM-SS`
    pub timestamp: String,
    /// Number of data rows (header excluded)
    pub row_count: usize,
    /// Ordered column list
    pub columns: Vec<String>,
    /// Batch schema version
    pub schema_version: String,
    /// Change-timestamp column, when the source table has one
    #[serde(default)]
    pub last_updated_field: Option<String>,
    /// Serialization format
    pub format: String,
    /// Hex SHA-256 of the data object
    pub checksum: String,
}

/// Header plus rows of one staged batch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StagedBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl StagedBatch {
    /// Creates an empty batch with the given header
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row; the cell count must match the header
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(QuarryError::Schema(format!(
                "Row has {} cells but header has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        if let Some(cell) = row.iter().find(|c| c.is_array() || c.is_object()) {
            return Err(QuarryError::Schema(format!(
                "Batch cells must be scalar, got {cell}"
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Header columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch holds no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Serializes the batch to JSON Lines
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = serde_json::to_vec(&self.columns)?;
        out.push(b'\n');
        for row in &self.rows {
            serde_json::to_writer(&mut out, row)?;
            out.push(b'\n');
        }
        Ok(out)
    }

    /// Parses a JSON Lines batch
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| QuarryError::Serialization(format!("Batch is not UTF-8: {e}")))?;
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| QuarryError::Schema("Batch has no header line".to_string()))?;
        let columns: Vec<String> = serde_json::from_str(header)?;

        let mut batch = Self::new(columns);
        for (index, line) in lines.enumerate() {
            let row: Vec<Value> = serde_json::from_str(line)?;
            batch
                .push_row(row)
                .map_err(|e| QuarryError::Schema(format!("Row {index}: {e}")))?;
        }
        Ok(batch)
    }

    /// Builds the metadata sidecar for an encoded batch
    pub fn metadata(
        &self,
        table: &str,
        stage: BatchStage,
        created_at: DateTime<Utc>,
        last_updated_field: Option<&str>,
        encoded: &[u8],
    ) -> BatchMetadata {
        BatchMetadata {
            table: table.to_string(),
            stage,
            timestamp: created_at.format("%Y-%m-%dT%H-%M-%S").to_string(),
            row_count: self.len(),
            columns: self.columns.clone(),
            schema_version: SCHEMA_VERSION.to_string(),
            last_updated_field: last_updated_field.map(str::to_string),
            format: BATCH_FORMAT.to_string(),
            checksum: checksum(encoded),
        }
    }
}

/// Hex-encoded SHA-256 of a byte slice
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    format!("{result:x}")
}

/// Storage key of a new batch's data object
///
/// Layout: `{prefix}/{table}/{YYYY}/{MM}/{DD}/{YYYY-MM-DDTHH-MM-SS}-{id}/data.jsonl`.
/// The short random suffix keeps two batches created in the same second apart.
pub fn data_key(prefix: &str, table: &str, created_at: DateTime<Utc>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}/{}/{}-{}/{}",
        prefix.trim_end_matches('/'),
        table,
        created_at.format("%Y/%m/%d"),
        created_at.format("%Y-%m-%dT%H-%M-%S"),
        &id[..8],
        DATA_FILE
    )
}

/// Storage key of the metadata sidecar that sits next to a data object
pub fn metadata_key(data_key: &str) -> String {
    match data_key.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{METADATA_FILE}"),
        None => METADATA_FILE.to_string(),
    }
}
