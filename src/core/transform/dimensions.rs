//! Dimension mappings
//!
//! Each function maps the rows of one source table (plus lookups, where the
//! dimension embeds a foreign entity) to dimension records. A missing lookup
//! match leaves the embedded fields null.

use crate::core::transform::coerce::{date_value, Cells};
use crate::core::transform::lookups::Lookups;
use crate::domain::{Record, RecordBuilder, Result, SourceRow, WarehouseTable};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

/// Display names for known currency codes
const CURRENCY_NAMES: [(&str, &str); 7] = [
    ("GBP", "British Pound"),
    ("EUR", "Euro"),
    ("USD", "US Dollar"),
    ("JPY", "Japanese Yen"),
    ("CHF", "Swiss Franc"),
    ("AUD", "Australian Dollar"),
    ("CAD", "Canadian Dollar"),
];

/// Display name for a currency code; unknown codes name themselves
pub fn currency_name(code: &str) -> &str {
    CURRENCY_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map_or(code, |(_, name)| name)
}

/// `dim_counterparty`: counterparty with its legal address embedded
pub fn dim_counterparty(rows: &[SourceRow<'_>], lookups: &Lookups) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimCounterparty;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            let address = lookups
                .address(cells.int("legal_address_id")?)
                .cloned()
                .unwrap_or_default();

            Ok(RecordBuilder::new(TARGET)
                .set("counterparty_id", cells.required_int("counterparty_id")?)?
                .set("counterparty_legal_name", cells.text_value("counterparty_legal_name"))?
                .set("counterparty_legal_address_line_1", address.address_line_1)?
                .set("counterparty_legal_address_line_2", address.address_line_2)?
                .set("counterparty_legal_district", address.district)?
                .set("counterparty_legal_city", address.city)?
                .set("counterparty_legal_postal_code", address.postal_code)?
                .set("counterparty_legal_country", address.country)?
                .set("counterparty_legal_phone_number", address.phone)?
                .build())
        })
        .collect()
}

/// `dim_currency`: currency with its display name
pub fn dim_currency(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimCurrency;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            let code = cells.text("currency_code");
            Ok(RecordBuilder::new(TARGET)
                .set("currency_id", cells.required_int("currency_id")?)?
                .set_opt("currency_code", code)?
                .set_opt("currency_name", code.map(currency_name))?
                .build())
        })
        .collect()
}

/// `dim_design`
pub fn dim_design(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimDesign;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            Ok(RecordBuilder::new(TARGET)
                .set("design_id", cells.required_int("design_id")?)?
                .set("design_name", cells.text_value("design_name"))?
                .set("file_location", cells.text_value("file_location"))?
                .set("file_name", cells.text_value("file_name"))?
                .build())
        })
        .collect()
}

/// `dim_location`: addresses keyed by `location_id`
pub fn dim_location(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimLocation;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            let mut builder =
                RecordBuilder::new(TARGET).set("location_id", cells.required_int("address_id")?)?;
            for column in [
                "address_line_1",
                "address_line_2",
                "district",
                "city",
                "postal_code",
                "country",
                "phone",
            ] {
                builder = builder.set(column, cells.text_value(column))?;
            }
            Ok(builder.build())
        })
        .collect()
}

/// `dim_payment_type`
pub fn dim_payment_type(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimPaymentType;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            Ok(RecordBuilder::new(TARGET)
                .set("payment_type_id", cells.required_int("payment_type_id")?)?
                .set("payment_type_name", cells.text_value("payment_type_name"))?
                .build())
        })
        .collect()
}

/// `dim_staff`: staff with department name and location embedded
pub fn dim_staff(rows: &[SourceRow<'_>], lookups: &Lookups) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimStaff;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            let department = lookups.department(cells.int("department_id")?);

            Ok(RecordBuilder::new(TARGET)
                .set("staff_id", cells.required_int("staff_id")?)?
                .set("first_name", cells.text_value("first_name"))?
                .set("last_name", cells.text_value("last_name"))?
                .set(
                    "department_name",
                    department.and_then(|d| d.department_name.clone()),
                )?
                .set("location", department.and_then(|d| d.location.clone()))?
                .set("email_address", cells.text_value("email_address"))?
                .build())
        })
        .collect()
}

/// `dim_transaction`: the opposite order id is null
pub fn dim_transaction(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimTransaction;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            Ok(RecordBuilder::new(TARGET)
                .set("transaction_id", cells.required_int("transaction_id")?)?
                .set("transaction_type", cells.text_value("transaction_type"))?
                .set("sales_order_id", cells.int("sales_order_id")?)?
                .set("purchase_order_id", cells.int("purchase_order_id")?)?
                .build())
        })
        .collect()
}

/// Date-valued columns of fact records that feed `dim_date`
const FACT_DATE_COLUMNS: [&str; 5] = [
    "created_date",
    "last_updated_date",
    "agreed_payment_date",
    "agreed_delivery_date",
    "payment_date",
];

/// `dim_date`: one row per distinct date referenced by the given fact records, ascending
pub fn dim_date(facts: &[Record]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::DimDate;

    let dates: std::collections::BTreeSet<NaiveDate> = facts
        .iter()
        .flat_map(|record| FACT_DATE_COLUMNS.iter().filter_map(|c| record.get(c)))
        .filter_map(Value::as_str)
        .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .collect();

    dates
        .into_iter()
        .map(|date| {
            Ok(RecordBuilder::new(TARGET)
                .set("date_id", date_value(Some(date)))?
                .set("year", date.year())?
                .set("month", date.month())?
                .set("day", date.day())?
                .set("day_of_week", date.weekday().number_from_monday())?
                .set("day_name", date.format("%A").to_string())?
                .set("month_name", date.format("%B").to_string())?
                .set("quarter", (date.month() - 1) / 3 + 1)?
                .build())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SourceTable, StagedBatch};
    use serde_json::json;

    fn batch(table: SourceTable, rows: Vec<Vec<Value>>) -> StagedBatch {
        let mut batch = StagedBatch::new(table.schema().columns.iter().copied());
        for row in rows {
            batch.push_row(row).unwrap();
        }
        batch
    }

    fn rows(batch: &StagedBatch) -> Vec<SourceRow<'_>> {
        batch
            .rows()
            .iter()
            .map(|r| SourceRow::new(batch.columns(), r))
            .collect()
    }

    #[test]
    fn test_currency_names() {
        let currencies = batch(
            SourceTable::Currency,
            vec![
                vec![json!("1"), json!("GBP"), json!("t"), json!("t")],
                vec![json!("2"), json!("XYZ"), json!("t"), json!("t")],
            ],
        );
        let records = dim_currency(&rows(&currencies)).unwrap();

        assert_eq!(records[0].cells(), &[json!(1), json!("GBP"), json!("British Pound")]);
        assert_eq!(records[1].get("currency_name"), Some(&json!("XYZ")));
    }

    #[test]
    fn test_staff_without_department_match_has_null_fields() {
        let staff = batch(
            SourceTable::Staff,
            vec![vec![
                json!("7"),
                json!("Jeremie"),
                json!("Franey"),
                json!("99"),
                json!("jeremie.franey@example.com"),
                json!("2022-11-03 14:20:51.563"),
                json!("2022-11-03 14:20:51.563"),
            ]],
        );
        let records = dim_staff(&rows(&staff), &Lookups::new()).unwrap();

        assert_eq!(records[0].key(), &json!(7));
        assert_eq!(records[0].get("department_name"), Some(&Value::Null));
        assert_eq!(records[0].get("location"), Some(&Value::Null));
        assert_eq!(records[0].get("email_address"), Some(&json!("jeremie.franey@example.com")));
    }

    #[test]
    fn test_counterparty_embeds_legal_address() {
        let address = batch(
            SourceTable::Address,
            vec![vec![
                json!("15"),
                json!("6826 Herzog Via"),
                Value::Null,
                json!("Avon"),
                json!("New Patienceburgh"),
                json!("28441"),
                json!("Turkey"),
                json!("1803 637401"),
                json!("t"),
                json!("t"),
            ]],
        );
        let mut lookups = Lookups::new();
        lookups.absorb(SourceTable::Address, &address);

        let counterparty = batch(
            SourceTable::Counterparty,
            vec![vec![
                json!("1"),
                json!("Fahey and Sons"),
                json!("15"),
                json!("Micheal Toy"),
                json!("Mrs. Lucy Runolfsdottir"),
                json!("t"),
                json!("t"),
            ]],
        );
        let records = dim_counterparty(&rows(&counterparty), &lookups).unwrap();

        assert_eq!(records[0].get("counterparty_legal_city"), Some(&json!("New Patienceburgh")));
        assert_eq!(records[0].get("counterparty_legal_address_line_2"), Some(&Value::Null));
        assert_eq!(records[0].get("counterparty_legal_phone_number"), Some(&json!("1803 637401")));
    }

    #[test]
    fn test_transaction_nullable_order_ids() {
        let transactions = batch(
            SourceTable::Transaction,
            vec![vec![
                json!("1"),
                json!("PURCHASE"),
                json!(""),
                json!("2"),
                json!("t"),
                json!("t"),
            ]],
        );
        let records = dim_transaction(&rows(&transactions)).unwrap();
        assert_eq!(records[0].get("sales_order_id"), Some(&Value::Null));
        assert_eq!(records[0].get("purchase_order_id"), Some(&json!(2)));
    }

    #[test]
    fn test_missing_key_is_a_failure() {
        let design = batch(
            SourceTable::Design,
            vec![vec![json!(""), json!("t"), json!("t"), json!("Wooden"), json!("/usr"), json!("w.json")]],
        );
        assert!(dim_design(&rows(&design)).is_err());
    }

    #[test]
    fn test_dim_date_attributes() {
        let fact = RecordBuilder::new(WarehouseTable::FactSalesOrder)
            .set("created_date", "2024-02-01")
            .unwrap()
            .set("last_updated_date", "2024-02-01")
            .unwrap()
            .set("agreed_delivery_date", "2023-12-31")
            .unwrap()
            .build();

        let dates = dim_date(&[fact]).unwrap();
        assert_eq!(dates.len(), 2);

        let dec = &dates[0];
        assert_eq!(dec.key(), &json!("2023-12-31"));
        assert_eq!(dec.get("day_name"), Some(&json!("Sunday")));
        assert_eq!(dec.get("day_of_week"), Some(&json!(7)));
        assert_eq!(dec.get("quarter"), Some(&json!(4)));

        let feb = &dates[1];
        assert_eq!(feb.get("month_name"), Some(&json!("February")));
        assert_eq!(feb.get("day_of_week"), Some(&json!(4)));
        assert_eq!(feb.get("quarter"), Some(&json!(1)));
    }
}
