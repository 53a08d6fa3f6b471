//! Warehouse star schema
//!
//! Declares every dimension and fact table the pipeline produces, with the exact
//! column order used for transformed batches and warehouse inserts.

use crate::domain::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a warehouse table describes an entity or an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Dimension table, upserted on its key
    Dimension,
    /// Fact table, appended once per source row version
    Fact,
}

/// Declared shape of a warehouse table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseSchema {
    /// Table name in the warehouse
    pub name: &'static str,
    /// Ordered column list (batch header order)
    pub columns: &'static [&'static str],
    /// Natural key column (dimension key or source id for facts)
    pub key: &'static str,
    /// Surrogate key generated by the warehouse, never inserted explicitly
    pub generated: Option<&'static str>,
    /// Dimension or fact
    pub kind: TableKind,
}

impl WarehouseSchema {
    /// Whether the column belongs to this table
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// Columns sent in an INSERT statement (declared order, generated key excluded)
    pub fn insert_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .copied()
            .filter(|c| Some(*c) != self.generated)
            .collect()
    }

    /// Columns identifying one stored row: the key for dimensions, the key plus
    /// the row's last-updated date and time for facts
    pub fn conflict_columns(&self) -> Vec<&'static str> {
        match self.kind {
            TableKind::Dimension => vec![self.key],
            TableKind::Fact => vec![self.key, "last_updated_date", "last_updated_time"],
        }
    }
}

/// Tables in the analytical warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseTable {
    /// Counterparty dimension with legal address embedded
    DimCounterparty,
    /// Currency dimension
    DimCurrency,
    /// Design dimension
    DimDesign,
    /// Location dimension (from addresses)
    DimLocation,
    /// Payment type dimension
    DimPaymentType,
    /// Staff dimension with department embedded
    DimStaff,
    /// Transaction dimension
    DimTransaction,
    /// Calendar dimension derived from fact dates
    DimDate,
    /// Sales order facts
    FactSalesOrder,
    /// Purchase order facts
    FactPurchaseOrder,
    /// Payment facts
    FactPayment,
}

const DIM_COUNTERPARTY: WarehouseSchema = WarehouseSchema {
    name: "dim_counterparty",
    columns: &[
        "counterparty_id",
        "counterparty_legal_name",
        "counterparty_legal_address_line_1",
        "counterparty_legal_address_line_2",
        "counterparty_legal_district",
        "counterparty_legal_city",
        "counterparty_legal_postal_code",
        "counterparty_legal_country",
        "counterparty_legal_phone_number",
    ],
    key: "counterparty_id",
    generated: None,
    kind: TableKind::Dimension,
};

const DIM_CURRENCY: WarehouseSchema = WarehouseSchema {
    name: "dim_currency",
    columns: &["currency_id", "currency_code", "currency_name"],
    key: "currency_id",
    generated: None,
    kind: TableKind::Dimension,
};

const DIM_DESIGN: WarehouseSchema = WarehouseSchema {
    name: "dim_design",
    columns: &["design_id", "design_name", "file_location", "file_name"],
    key: "design_id",
    generated: None,
    kind: TableKind::Dimension,
};

const DIM_LOCATION: WarehouseSchema = WarehouseSchema {
    name: "dim_location",
    columns: &[
        "location_id",
        "address_line_1",
        "address_line_2",
        "district",
        "city",
        "postal_code",
        "country",
        "phone",
    ],
    key: "location_id",
    generated: None,
    kind: TableKind::Dimension,
};

const DIM_PAYMENT_TYPE: WarehouseSchema = WarehouseSchema {
    name: "dim_payment_type",
    columns: &["payment_type_id", "payment_type_name"],
    key: "payment_type_id",
    generated: None,
    kind: TableKind::Dimension,
};

const DIM_STAFF: WarehouseSchema = WarehouseSchema {
    name: "dim_staff",
    columns: &[
        "staff_id",
        "first_name",
        "last_name",
        "department_name",
        "location",
        "email_address",
    ],
    key: "staff_id",
    generated: None,
    kind: TableKind::Dimension,
};

const DIM_TRANSACTION: WarehouseSchema = WarehouseSchema {
    name: "dim_transaction",
    columns: &[
        "transaction_id",
        "transaction_type",
        "sales_order_id",
        "purchase_order_id",
    ],
    key: "transaction_id",
    generated: None,
    kind: TableKind::Dimension,
};

const DIM_DATE: WarehouseSchema = WarehouseSchema {
    name: "dim_date",
    columns: &[
        "date_id",
        "year",
        "month",
        "day",
        "day_of_week",
        "day_name",
        "month_name",
        "quarter",
    ],
    key: "date_id",
    generated: None,
    kind: TableKind::Dimension,
};

const FACT_SALES_ORDER: WarehouseSchema = WarehouseSchema {
    name: "fact_sales_order",
    columns: &[
        "sales_record_id",
        "sales_order_id",
        "created_date",
        "created_time",
        "last_updated_date",
        "last_updated_time",
        "sales_staff_id",
        "counterparty_id",
        "units_sold",
        "unit_price",
        "currency_id",
        "design_id",
        "agreed_payment_date",
        "agreed_delivery_date",
        "agreed_delivery_location_id",
    ],
    key: "sales_order_id",
    generated: Some("sales_record_id"),
    kind: TableKind::Fact,
};

const FACT_PURCHASE_ORDER: WarehouseSchema = WarehouseSchema {
    name: "fact_purchase_order",
    columns: &[
        "purchase_record_id",
        "purchase_order_id",
        "created_date",
        "created_time",
        "last_updated_date",
        "last_updated_time",
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
    key: "purchase_order_id",
    generated: Some("purchase_record_id"),
    kind: TableKind::Fact,
};

const FACT_PAYMENT: WarehouseSchema = WarehouseSchema {
    name: "fact_payment",
    columns: &[
        "payment_record_id",
        "payment_id",
        "created_date",
        "created_time",
        "last_updated_date",
        "last_updated_time",
        "transaction_id",
        "counterparty_id",
        "payment_amount",
        "currency_id",
        "payment_type_id",
        "paid",
        "payment_date",
    ],
    key: "payment_id",
    generated: Some("payment_record_id"),
    kind: TableKind::Fact,
};

impl WarehouseTable {
    /// Every warehouse table, dimensions first so facts load after their references
    pub const ALL: [WarehouseTable; 11] = [
        WarehouseTable::DimCounterparty,
        WarehouseTable::DimCurrency,
        WarehouseTable::DimDesign,
        WarehouseTable::DimLocation,
        WarehouseTable::DimPaymentType,
        WarehouseTable::DimStaff,
        WarehouseTable::DimTransaction,
        WarehouseTable::DimDate,
        WarehouseTable::FactSalesOrder,
        WarehouseTable::FactPurchaseOrder,
        WarehouseTable::FactPayment,
    ];

    /// Declared schema for this table
    pub fn schema(&self) -> &'static WarehouseSchema {
        match self {
            WarehouseTable::DimCounterparty => &DIM_COUNTERPARTY,
            WarehouseTable::DimCurrency => &DIM_CURRENCY,
            WarehouseTable::DimDesign => &DIM_DESIGN,
            WarehouseTable::DimLocation => &DIM_LOCATION,
            WarehouseTable::DimPaymentType => &DIM_PAYMENT_TYPE,
            WarehouseTable::DimStaff => &DIM_STAFF,
            WarehouseTable::DimTransaction => &DIM_TRANSACTION,
            WarehouseTable::DimDate => &DIM_DATE,
            WarehouseTable::FactSalesOrder => &FACT_SALES_ORDER,
            WarehouseTable::FactPurchaseOrder => &FACT_PURCHASE_ORDER,
            WarehouseTable::FactPayment => &FACT_PAYMENT,
        }
    }

    /// Table name in the warehouse
    pub fn as_str(&self) -> &'static str {
        self.schema().name
    }

    /// Dimension or fact
    pub fn kind(&self) -> TableKind {
        self.schema().kind
    }
}

impl fmt::Display for WarehouseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarehouseTable {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        WarehouseTable::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| QuarryError::Validation(format!("No warehouse table named '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for table in WarehouseTable::ALL {
            assert_eq!(WarehouseTable::from_str(table.as_str()).unwrap(), table);
        }
        assert!(WarehouseTable::from_str("dim_department").is_err());
    }

    #[test]
    fn test_key_belongs_to_schema() {
        for table in WarehouseTable::ALL {
            let schema = table.schema();
            assert!(schema.contains(schema.key), "{} key missing", schema.name);
            if let Some(generated) = schema.generated {
                assert!(schema.contains(generated));
                assert_eq!(schema.kind, TableKind::Fact);
            }
        }
    }

    #[test]
    fn test_conflict_columns_belong_to_schema() {
        for table in WarehouseTable::ALL {
            let schema = table.schema();
            for column in schema.conflict_columns() {
                assert!(schema.contains(column), "{}.{column}", schema.name);
            }
        }
        assert_eq!(
            WarehouseTable::FactPayment.schema().conflict_columns(),
            vec!["payment_id", "last_updated_date", "last_updated_time"]
        );
    }

    #[test]
    fn test_insert_columns_skip_generated_key() {
        let columns = WarehouseTable::FactSalesOrder.schema().insert_columns();
        assert!(!columns.contains(&"sales_record_id"));
        assert_eq!(columns[0], "sales_order_id");
        assert_eq!(
            columns.len(),
            WarehouseTable::FactSalesOrder.schema().columns.len() - 1
        );

        let columns = WarehouseTable::DimCurrency.schema().insert_columns();
        assert_eq!(columns, vec!["currency_id", "currency_code", "currency_name"]);
    }

    #[test]
    fn test_dimensions_ordered_before_facts() {
        let first_fact = WarehouseTable::ALL
            .iter()
            .position(|t| t.kind() == TableKind::Fact)
            .unwrap();
        assert!(WarehouseTable::ALL[first_fact..]
            .iter()
            .all(|t| t.kind() == TableKind::Fact));
    }
}
