//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use quarry::adapters::database::{RawRow, SourceDatabase, WarehouseConnection, WarehouseTransaction};
use quarry::adapters::notify::Notifier;
use quarry::adapters::storage::MemoryObjectStore;
use quarry::config::{QuarryConfig, StorageBackend};
use quarry::core::extract::ExtractQuery;
use quarry::core::pipeline::PipelineContext;
use quarry::core::state::parse_timestamp;
use quarry::domain::{QuarryError, Result, SourceTable, TableKind, WarehouseTable};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Source database answering from fixed rows, honouring the watermark filter
#[derive(Default)]
pub struct FakeSource {
    rows: Mutex<HashMap<SourceTable, Vec<RawRow>>>,
    failing: Mutex<Vec<SourceTable>>,
    ignore_filter: bool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every row regardless of the watermark, like a source with clock skew
    pub fn unfiltered() -> Self {
        Self {
            ignore_filter: true,
            ..Self::default()
        }
    }

    pub fn set_rows(&self, table: SourceTable, rows: Vec<RawRow>) {
        self.rows.lock().unwrap().insert(table, rows);
    }

    pub fn fail(&self, table: SourceTable) {
        self.failing.lock().unwrap().push(table);
    }
}

#[async_trait]
impl SourceDatabase for FakeSource {
    async fn fetch(&self, query: &ExtractQuery) -> Result<Vec<RawRow>> {
        if self.failing.lock().unwrap().contains(&query.table()) {
            return Err(QuarryError::Database("relation is locked".to_string()));
        }
        let rows = self
            .rows
            .lock()
            .unwrap()
            .get(&query.table())
            .cloned()
            .unwrap_or_default();

        let since = match query.parameter() {
            Some(raw) if !self.ignore_filter => parse_timestamp(raw),
            _ => return Ok(rows),
        };
        let index = query
            .columns()
            .iter()
            .position(|c| *c == "last_updated")
            .unwrap();
        Ok(rows
            .into_iter()
            .filter(|row| {
                let changed = row[index].as_deref().and_then(parse_timestamp);
                changed > since
            })
            .collect())
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}

/// Warehouse keeping committed rows in memory
#[derive(Clone, Default)]
pub struct FakeWarehouse {
    pub committed: Arc<Mutex<Vec<(WarehouseTable, Value)>>>,
    pub rollbacks: Arc<Mutex<usize>>,
    pub schema_applied: Arc<Mutex<bool>>,
    /// Fails the insert of this zero-based row of any batch for the table
    pub fail_at: Option<(WarehouseTable, usize)>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(table: WarehouseTable, row: usize) -> Self {
        Self {
            fail_at: Some((table, row)),
            ..Self::default()
        }
    }

    pub fn rows(&self, table: WarehouseTable) -> Vec<Value> {
        self.committed
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == table)
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn tables_in_commit_order(&self) -> Vec<WarehouseTable> {
        let mut order = Vec::new();
        for (table, _) in self.committed.lock().unwrap().iter() {
            if order.last() != Some(table) {
                order.push(*table);
            }
        }
        order
    }
}

pub struct FakeTransaction<'a> {
    warehouse: &'a FakeWarehouse,
    pending: Vec<(WarehouseTable, Value)>,
}

#[async_trait]
impl WarehouseConnection for FakeWarehouse {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn WarehouseTransaction + Send + 'a>> {
        Ok(Box::new(FakeTransaction {
            warehouse: self,
            pending: Vec::new(),
        }))
    }

    async fn apply_schema(&mut self, ddl: &str) -> Result<()> {
        assert!(ddl.contains("CREATE TABLE"));
        *self.schema_applied.lock().unwrap() = true;
        Ok(())
    }
}

#[async_trait]
impl<'a> WarehouseTransaction for FakeTransaction<'a> {
    async fn insert_row(&mut self, table: WarehouseTable, row: &Value) -> Result<()> {
        if self.warehouse.fail_at == Some((table, self.pending.len())) {
            return Err(QuarryError::load(table.as_str(), "violates not-null constraint"));
        }
        self.pending.push((table, row.clone()));
        Ok(())
    }

    /// Applies the warehouse's conflict handling: dimensions replace the stored
    /// row with the same key, facts skip a row version that is already stored
    async fn commit(self: Box<Self>) -> Result<()> {
        let mut committed = self.warehouse.committed.lock().unwrap();
        for (table, row) in self.pending {
            let schema = table.schema();
            let identity = |r: &Value| -> Vec<Value> {
                schema
                    .conflict_columns()
                    .into_iter()
                    .map(|c| r.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            };
            let stored = committed
                .iter()
                .position(|(t, r)| *t == table && identity(r) == identity(&row));
            match (stored, schema.kind) {
                (Some(_), TableKind::Fact) => {}
                (Some(index), TableKind::Dimension) => committed[index] = (table, row),
                (None, _) => committed.push((table, row)),
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        *self.warehouse.rollbacks.lock().unwrap() += 1;
        Ok(())
    }
}

/// Notifier remembering every subject it was sent
#[derive(Default)]
pub struct RecordingNotifier {
    pub subjects: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, _message: &str) -> Result<()> {
        self.subjects.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

pub fn memory_config() -> QuarryConfig {
    let mut config = QuarryConfig::default();
    config.storage.backend = StorageBackend::Memory;
    config
}

pub fn context_with(
    config: QuarryConfig,
    store: Arc<MemoryObjectStore>,
    notifier: Arc<RecordingNotifier>,
) -> PipelineContext {
    PipelineContext::new(config, store, notifier)
}

pub fn context(store: Arc<MemoryObjectStore>) -> PipelineContext {
    context_with(memory_config(), store, Arc::new(RecordingNotifier::default()))
}

/// Raw row from text cells; `NULL` is an absent value
pub fn row(cells: &[&str]) -> RawRow {
    cells
        .iter()
        .map(|c| (*c != "NULL").then(|| c.to_string()))
        .collect()
}

pub fn sales_order(id: &str, changed: &str) -> RawRow {
    row(&[
        id, changed, changed, "3", "1", "1", "100", "2.50", "1", "2024-02-05", "2024-02-06", "1",
    ])
}

pub fn currency(id: &str, code: &str) -> RawRow {
    row(&[id, code, "2024-01-10 09:00:00", "2024-01-10 09:00:00"])
}

pub fn staff(id: &str, department_id: &str, changed: &str) -> RawRow {
    row(&[
        id,
        "Jeremie",
        "Franey",
        department_id,
        "jeremie.franey@terrifictotes.com",
        changed,
        changed,
    ])
}

pub fn department(id: &str, name: &str, location: &str) -> RawRow {
    row(&[
        id,
        name,
        location,
        "Richard Roma",
        "2024-01-10 09:00:00",
        "2024-01-10 09:00:00",
    ])
}

pub fn address(id: &str, city: &str) -> RawRow {
    row(&[
        id,
        "6826 Herzog Via",
        "NULL",
        "Avon",
        city,
        "28441",
        "Turkey",
        "1803 637401",
        "2024-01-10 09:00:00",
        "2024-01-10 09:00:00",
    ])
}

pub fn counterparty(id: &str, address_id: &str) -> RawRow {
    row(&[
        id,
        "Fahey and Sons",
        address_id,
        "Micheal Toy",
        "Mrs. Lucy Runolfsdottir",
        "2024-01-10 09:00:00",
        "2024-01-10 09:00:00",
    ])
}

pub fn payment(id: &str, paid: &str) -> RawRow {
    row(&[
        id,
        "2024-02-01 10:30:00.250",
        "2024-02-01 10:30:00.250",
        "2",
        "1",
        "552548.62",
        "1",
        "NULL",
        paid,
        "2024-02-03",
        "67305075",
        "31622269",
    ])
}
