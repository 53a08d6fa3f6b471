//! Source table allow-list and declared column lists
//!
//! Every table the extractor may touch is listed here. Table names coming from
//! configuration or invocation payloads are parsed into [`SourceTable`], so a name
//! outside the allow-list never reaches a query string.

use crate::domain::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column carrying the row change-timestamp on every tracked source table
pub const CHANGE_TIMESTAMP_COLUMN: &str = "last_updated";

/// Declared shape of a relational table
///
/// The column order is significant: extraction selects columns in this order and
/// raw batches are written with this header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name as it appears in the database
    pub name: &'static str,
    /// Ordered column list
    pub columns: &'static [&'static str],
    /// Primary key column
    pub primary_key: &'static str,
    /// Change-timestamp column, if the table has one
    pub change_column: Option<&'static str>,
}

impl TableSchema {
    /// Returns the position of a column in the declared order
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

/// Tables in the operational source database that may be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    /// Sales orders (fact source)
    SalesOrder,
    /// Product designs
    Design,
    /// Currencies
    Currency,
    /// Staff members
    Staff,
    /// Counterparties (customers and suppliers)
    Counterparty,
    /// Addresses (shared lookup source)
    Address,
    /// Departments (shared lookup source)
    Department,
    /// Purchase orders (fact source)
    PurchaseOrder,
    /// Payment types
    PaymentType,
    /// Payments (fact source)
    Payment,
    /// Transactions
    Transaction,
}

const SALES_ORDER: TableSchema = TableSchema {
    name: "sales_order",
    columns: &[
        "sales_order_id",
        "created_at",
        "last_updated",
        "design_id",
        "staff_id",
        "counterparty_id",
        "units_sold",
        "unit_price",
        "currency_id",
        "agreed_delivery_date",
        "agreed_payment_date",
        "agreed_delivery_location_id",
    ],
    primary_key: "sales_order_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const DESIGN: TableSchema = TableSchema {
    name: "design",
    columns: &[
        "design_id",
        "created_at",
        "last_updated",
        "design_name",
        "file_location",
        "file_name",
    ],
    primary_key: "design_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const CURRENCY: TableSchema = TableSchema {
    name: "currency",
    columns: &["currency_id", "currency_code", "created_at", "last_updated"],
    primary_key: "currency_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const STAFF: TableSchema = TableSchema {
    name: "staff",
    columns: &[
        "staff_id",
        "first_name",
        "last_name",
        "department_id",
        "email_address",
        "created_at",
        "last_updated",
    ],
    primary_key: "staff_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const COUNTERPARTY: TableSchema = TableSchema {
    name: "counterparty",
    columns: &[
        "counterparty_id",
        "counterparty_legal_name",
        "legal_address_id",
        "commercial_contact",
        "delivery_contact",
        "created_at",
        "last_updated",
    ],
    primary_key: "counterparty_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const ADDRESS: TableSchema = TableSchema {
    name: "address",
    columns: &[
        "address_id",
        "address_line_1",
        "address_line_2",
        "district",
        "city",
        "postal_code",
        "country",
        "phone",
        "created_at",
        "last_updated",
    ],
    primary_key: "address_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const DEPARTMENT: TableSchema = TableSchema {
    name: "department",
    columns: &[
        "department_id",
        "department_name",
        "location",
        "manager",
        "created_at",
        "last_updated",
    ],
    primary_key: "department_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const PURCHASE_ORDER: TableSchema = TableSchema {
    name: "purchase_order",
    columns: &[
        "purchase_order_id",
        "created_at",
        "last_updated",
        "staff_id",
        "counterparty_id",
        "item_code",
        "item_quantity",
        "item_unit_price",
        "currency_id",
        "agreed_delivery_date",
        "agreed_payment_date",
        "agreed_delivery_location_id",
    ],
    primary_key: "purchase_order_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const PAYMENT_TYPE: TableSchema = TableSchema {
    name: "payment_type",
    columns: &[
        "payment_type_id",
        "payment_type_name",
        "created_at",
        "last_updated",
    ],
    primary_key: "payment_type_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const PAYMENT: TableSchema = TableSchema {
    name: "payment",
    columns: &[
        "payment_id",
        "created_at",
        "last_updated",
        "transaction_id",
        "counterparty_id",
        "payment_amount",
        "currency_id",
        "payment_type_id",
        "paid",
        "payment_date",
        "company_ac_number",
        "counterparty_ac_number",
    ],
    primary_key: "payment_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

const TRANSACTION: TableSchema = TableSchema {
    name: "transaction",
    columns: &[
        "transaction_id",
        "transaction_type",
        "sales_order_id",
        "purchase_order_id",
        "created_at",
        "last_updated",
    ],
    primary_key: "transaction_id",
    change_column: Some(CHANGE_TIMESTAMP_COLUMN),
};

impl SourceTable {
    /// Every allow-listed table, in extraction order
    pub const ALL: [SourceTable; 11] = [
        SourceTable::SalesOrder,
        SourceTable::Design,
        SourceTable::Currency,
        SourceTable::Staff,
        SourceTable::Counterparty,
        SourceTable::Address,
        SourceTable::Department,
        SourceTable::PurchaseOrder,
        SourceTable::PaymentType,
        SourceTable::Payment,
        SourceTable::Transaction,
    ];

    /// Declared schema for this table
    pub fn schema(&self) -> &'static TableSchema {
        match self {
            SourceTable::SalesOrder => &SALES_ORDER,
            SourceTable::Design => &DESIGN,
            SourceTable::Currency => &CURRENCY,
            SourceTable::Staff => &STAFF,
            SourceTable::Counterparty => &COUNTERPARTY,
            SourceTable::Address => &ADDRESS,
            SourceTable::Department => &DEPARTMENT,
            SourceTable::PurchaseOrder => &PURCHASE_ORDER,
            SourceTable::PaymentType => &PAYMENT_TYPE,
            SourceTable::Payment => &PAYMENT,
            SourceTable::Transaction => &TRANSACTION,
        }
    }

    /// Table name as stored in the database
    pub fn as_str(&self) -> &'static str {
        self.schema().name
    }

    /// Whether the table only serves foreign-key resolution for other targets
    pub fn is_lookup(&self) -> bool {
        matches!(self, SourceTable::Address | SourceTable::Department)
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTable {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        SourceTable::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| QuarryError::Validation(format!("Table '{s}' is not allowed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_allow_listed_tables() {
        for table in SourceTable::ALL {
            assert_eq!(SourceTable::from_str(table.as_str()).unwrap(), table);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown_tables() {
        let err = SourceTable::from_str("users; DROP TABLE staff").unwrap_err();
        assert!(matches!(err, QuarryError::Validation(_)));
        assert!(SourceTable::from_str("Staff").is_err());
        assert!(SourceTable::from_str("").is_err());
    }

    #[test]
    fn test_schemas_have_primary_key_first_or_declared() {
        for table in SourceTable::ALL {
            let schema = table.schema();
            assert!(schema.position(schema.primary_key).is_some());
            assert_eq!(schema.primary_key, format!("{}_id", schema.name));
        }
    }

    #[test]
    fn test_every_table_tracks_last_updated() {
        for table in SourceTable::ALL {
            let schema = table.schema();
            assert_eq!(schema.change_column, Some(CHANGE_TIMESTAMP_COLUMN));
            assert!(schema.position(CHANGE_TIMESTAMP_COLUMN).is_some());
        }
    }

    #[test]
    fn test_lookup_tables() {
        assert!(SourceTable::Address.is_lookup());
        assert!(SourceTable::Department.is_lookup());
        assert!(!SourceTable::Staff.is_lookup());
    }

    #[test]
    fn test_serde_uses_table_names() {
        let json = serde_json::to_string(&SourceTable::PurchaseOrder).unwrap();
        assert_eq!(json, "\"purchase_order\"");
    }
}
