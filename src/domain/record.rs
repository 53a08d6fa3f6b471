//! Schema-bound records
//!
//! [`Record`] is one warehouse row whose cells are aligned to its table's declared
//! columns. It can only be built through [`RecordBuilder`], which rejects columns
//! outside the schema, so a record never carries an undeclared column and every
//! unset column is null.
//!
//! [`SourceRow`] is the read side: a borrowed view over one raw batch row that
//! addresses cells by column name.

use crate::domain::warehouse::WarehouseTable;
use crate::domain::{QuarryError, Result};
use serde_json::Value;

/// A warehouse row aligned to its table schema
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: WarehouseTable,
    cells: Vec<Value>,
}

impl Record {
    /// Table this record belongs to
    pub fn table(&self) -> WarehouseTable {
        self.table
    }

    /// Cell for a column, `None` if the column is not part of the schema
    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.table.schema().columns.iter().position(|c| *c == column)?;
        self.cells.get(index)
    }

    /// Value of the table's key column
    pub fn key(&self) -> &Value {
        self.get(self.table.schema().key).unwrap_or(&Value::Null)
    }

    /// Cells in declared column order
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    /// Consumes the record, returning its cells in declared column order
    pub fn into_cells(self) -> Vec<Value> {
        self.cells
    }
}

/// Builder for [`Record`]
///
/// # Examples
///
/// ```
/// use quarry::domain::record::RecordBuilder;
/// use quarry::domain::warehouse::WarehouseTable;
///
/// # fn main() -> quarry::domain::Result<()> {
/// let record = RecordBuilder::new(WarehouseTable::DimCurrency)
///     .set("currency_id", 1)?
///     .set("currency_code", "GBP")?
///     .set("currency_name", "British Pound")?
///     .build();
///
/// assert_eq!(record.get("currency_code").and_then(|v| v.as_str()), Some("GBP"));
/// assert!(RecordBuilder::new(WarehouseTable::DimCurrency).set("rate", 1).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    table: WarehouseTable,
    cells: Vec<Value>,
}

impl RecordBuilder {
    /// Starts a record with every column null
    pub fn new(table: WarehouseTable) -> Self {
        Self {
            table,
            cells: vec![Value::Null; table.schema().columns.len()],
        }
    }

    /// Sets a column; errors if the column is not declared for the table
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        let schema = self.table.schema();
        let index = schema
            .columns
            .iter()
            .position(|c| *c == column)
            .ok_or_else(|| {
                QuarryError::Schema(format!(
                    "Column '{column}' is not part of {}",
                    schema.name
                ))
            })?;
        let value = value.into();
        if value.is_array() || value.is_object() {
            return Err(QuarryError::Schema(format!(
                "Column '{column}' of {} must hold a scalar",
                schema.name
            )));
        }
        self.cells[index] = value;
        Ok(self)
    }

    /// Sets a column from an optional value, leaving it null on `None`
    pub fn set_opt<V: Into<Value>>(self, column: &str, value: Option<V>) -> Result<Self> {
        match value {
            Some(v) => self.set(column, v),
            None => self.set(column, Value::Null),
        }
    }

    /// Finishes the record
    pub fn build(self) -> Record {
        Record {
            table: self.table,
            cells: self.cells,
        }
    }
}

/// Borrowed view over one raw batch row
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl<'a> SourceRow<'a> {
    /// Pairs a header with one row of cells
    pub fn new(columns: &'a [String], cells: &'a [Value]) -> Self {
        Self { columns, cells }
    }

    /// Raw cell for a column, `None` if the header has no such column
    pub fn cell(&self, column: &str) -> Option<&'a Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.cells.get(index)
    }

    /// Text of a column; null, missing and non-string cells read as `None`
    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.cell(column).and_then(Value::as_str)
    }

    /// Text of a column, with empty or whitespace-only values read as `None`
    pub fn non_empty(&self, column: &str) -> Option<&'a str> {
        self.text(column).map(str::trim).filter(|s| !s.is_empty())
    }
}
