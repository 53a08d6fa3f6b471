//! Shared lookup sources
//!
//! Addresses and departments are not transformed on their own account by the
//! dimensions that reference them; they are loaded once per cycle and joined by
//! id. Later batches overwrite earlier ones per id.

use crate::domain::{SourceRow, SourceTable, StagedBatch};
use std::collections::HashMap;

/// Address fields embedded into referencing dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// First address line
    pub address_line_1: Option<String>,
    /// Second address line
    pub address_line_2: Option<String>,
    /// District
    pub district: Option<String>,
    /// City
    pub city: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// Country
    pub country: Option<String>,
    /// Phone number
    pub phone: Option<String>,
}

/// Department fields embedded into the staff dimension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Department {
    /// Department name
    pub department_name: Option<String>,
    /// Department location
    pub location: Option<String>,
}

/// Id-indexed lookup rows
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    addresses: HashMap<i64, Address>,
    departments: HashMap<i64, Department>,
}

fn owned(row: &SourceRow<'_>, column: &str) -> Option<String> {
    row.non_empty(column).map(str::to_string)
}

impl Lookups {
    /// Creates empty lookups
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every row of a lookup batch; other tables are ignored
    ///
    /// Rows whose id cannot be read are skipped.
    pub fn absorb(&mut self, table: SourceTable, batch: &StagedBatch) {
        let key = table.schema().primary_key;
        let mut skipped = 0usize;

        for cells in batch.rows() {
            let row = SourceRow::new(batch.columns(), cells);
            let Some(id) = row.non_empty(key).and_then(|s| s.parse::<i64>().ok()) else {
                skipped += 1;
                continue;
            };

            match table {
                SourceTable::Address => {
                    self.addresses.insert(
                        id,
                        Address {
                            address_line_1: owned(&row, "address_line_1"),
                            address_line_2: owned(&row, "address_line_2"),
                            district: owned(&row, "district"),
                            city: owned(&row, "city"),
                            postal_code: owned(&row, "postal_code"),
                            country: owned(&row, "country"),
                            phone: owned(&row, "phone"),
                        },
                    );
                }
                SourceTable::Department => {
                    self.departments.insert(
                        id,
                        Department {
                            department_name: owned(&row, "department_name"),
                            location: owned(&row, "location"),
                        },
                    );
                }
                _ => return,
            }
        }

        if skipped > 0 {
            tracing::warn!(table = %table, rows = skipped, "Lookup rows without a readable id skipped");
        }
    }

    /// Address by id
    pub fn address(&self, id: Option<i64>) -> Option<&Address> {
        self.addresses.get(&id?)
    }

    /// Department by id
    pub fn department(&self, id: Option<i64>) -> Option<&Department> {
        self.departments.get(&id?)
    }

    /// `(addresses, departments)` currently held
    pub fn counts(&self) -> (usize, usize) {
        (self.addresses.len(), self.departments.len())
    }
}
