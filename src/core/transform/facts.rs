//! Fact mappings
//!
//! Facts keep dimension references as ids, split their timestamps into date and
//! time of day, and carry measures as fixed-point values. A malformed measure,
//! date or timestamp fails the whole target for the cycle. The warehouse-generated
//! record id is always left null.

use crate::core::transform::coerce::{date_value, decimal_value, Cells};
use crate::domain::{Record, RecordBuilder, Result, SourceRow, WarehouseTable};

/// Sets `created_date/time` and `last_updated_date/time`
fn with_timestamps(builder: RecordBuilder, cells: &Cells<'_>) -> Result<RecordBuilder> {
    let (created_date, created_time) = cells.split_timestamp("created_at")?;
    let (updated_date, updated_time) = cells.split_timestamp("last_updated")?;
    builder
        .set("created_date", date_value(Some(created_date)))?
        .set("created_time", created_time)?
        .set("last_updated_date", date_value(Some(updated_date)))?
        .set("last_updated_time", updated_time)
}

/// `fact_sales_order`
pub fn fact_sales_order(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::FactSalesOrder;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            let builder = RecordBuilder::new(TARGET)
                .set("sales_order_id", cells.required_int("sales_order_id")?)?;
            Ok(with_timestamps(builder, &cells)?
                .set("sales_staff_id", cells.int("staff_id")?)?
                .set("counterparty_id", cells.int("counterparty_id")?)?
                .set("units_sold", cells.required_int("units_sold")?)?
                .set("unit_price", decimal_value(Some(cells.required_decimal("unit_price")?)))?
                .set("currency_id", cells.int("currency_id")?)?
                .set("design_id", cells.int("design_id")?)?
                .set("agreed_payment_date", date_value(cells.date("agreed_payment_date")?))?
                .set("agreed_delivery_date", date_value(cells.date("agreed_delivery_date")?))?
                .set(
                    "agreed_delivery_location_id",
                    cells.int("agreed_delivery_location_id")?,
                )?
                .build())
        })
        .collect()
}

/// `fact_purchase_order`
pub fn fact_purchase_order(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::FactPurchaseOrder;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            let builder = RecordBuilder::new(TARGET)
                .set("purchase_order_id", cells.required_int("purchase_order_id")?)?;
            Ok(with_timestamps(builder, &cells)?
                .set("staff_id", cells.int("staff_id")?)?
                .set("counterparty_id", cells.int("counterparty_id")?)?
                .set("item_code", cells.text_value("item_code"))?
                .set("item_quantity", cells.required_int("item_quantity")?)?
                .set(
                    "item_unit_price",
                    decimal_value(Some(cells.required_decimal("item_unit_price")?)),
                )?
                .set("currency_id", cells.int("currency_id")?)?
                .set("agreed_delivery_date", date_value(cells.date("agreed_delivery_date")?))?
                .set("agreed_payment_date", date_value(cells.date("agreed_payment_date")?))?
                .set(
                    "agreed_delivery_location_id",
                    cells.int("agreed_delivery_location_id")?,
                )?
                .build())
        })
        .collect()
}

/// `fact_payment`
pub fn fact_payment(rows: &[SourceRow<'_>]) -> Result<Vec<Record>> {
    const TARGET: WarehouseTable = WarehouseTable::FactPayment;
    rows.iter()
        .map(|row| {
            let cells = Cells::new(TARGET, *row);
            let builder =
                RecordBuilder::new(TARGET).set("payment_id", cells.required_int("payment_id")?)?;
            Ok(with_timestamps(builder, &cells)?
                .set("transaction_id", cells.int("transaction_id")?)?
                .set("counterparty_id", cells.int("counterparty_id")?)?
                .set(
                    "payment_amount",
                    decimal_value(Some(cells.required_decimal("payment_amount")?)),
                )?
                .set("currency_id", cells.int("currency_id")?)?
                .set("payment_type_id", cells.int("payment_type_id")?)?
                .set("paid", cells.required_boolean("paid")?)?
                .set("payment_date", date_value(cells.date("payment_date")?))?
                .build())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QuarryError, SourceTable, StagedBatch};
    use serde_json::{json, Value};

    fn rows(batch: &StagedBatch) -> Vec<SourceRow<'_>> {
        batch
            .rows()
            .iter()
            .map(|r| SourceRow::new(batch.columns(), r))
            .collect()
    }

    fn sales_batch(unit_price: &str) -> StagedBatch {
        let mut batch = StagedBatch::new(SourceTable::SalesOrder.schema().columns.iter().copied());
        batch
            .push_row(vec![
                json!("2"),
                json!("2022-11-03 14:20:52.186"),
                json!("2022-11-03 14:20:52.186"),
                json!("3"),
                json!("19"),
                json!("8"),
                json!("42972"),
                unit_price.into(),
                json!("2"),
                json!("2022-11-07"),
                json!("2022-11-08"),
                json!("8"),
            ])
            .unwrap();
        batch
    }

    #[test]
    fn test_sales_order_shape() {
        let batch = sales_batch("3.94");
        let records = fact_sales_order(&rows(&batch)).unwrap();
        let record = &records[0];

        assert_eq!(record.get("sales_record_id"), Some(&Value::Null));
        assert_eq!(record.get("sales_order_id"), Some(&json!(2)));
        assert_eq!(record.get("created_date"), Some(&json!("2022-11-03")));
        assert_eq!(record.get("created_time"), Some(&json!("14:20:52.186")));
        assert_eq!(record.get("sales_staff_id"), Some(&json!(19)));
        assert_eq!(record.get("unit_price"), Some(&json!("3.94")));
        assert_eq!(record.get("agreed_payment_date"), Some(&json!("2022-11-08")));
        assert_eq!(record.get("agreed_delivery_date"), Some(&json!("2022-11-07")));
        assert_eq!(record.cells().len(), 15);
    }

    #[test]
    fn test_non_numeric_price_fails_table() {
        let batch = sales_batch("n/a");
        let err = fact_sales_order(&rows(&batch)).unwrap_err();
        assert!(matches!(err, QuarryError::Transform { ref table, .. } if table == "fact_sales_order"));
    }

    #[test]
    fn test_payment_paid_and_nullable_refs() {
        let mut batch = StagedBatch::new(SourceTable::Payment.schema().columns.iter().copied());
        batch
            .push_row(vec![
                json!("2"),
                json!("2022-11-03 14:20:52.187"),
                json!("2022-11-03 14:20:52.187"),
                json!("2"),
                json!("15"),
                json!("552548.62"),
                json!("2"),
                Value::Null,
                json!("f"),
                json!("2022-11-04"),
                json!("67305075"),
                json!("31622269"),
            ])
            .unwrap();

        let records = fact_payment(&rows(&batch)).unwrap();
        assert_eq!(records[0].get("paid"), Some(&json!(false)));
        assert_eq!(records[0].get("payment_type_id"), Some(&Value::Null));
        assert_eq!(records[0].get("payment_amount"), Some(&json!("552548.62")));
        assert!(records[0].get("company_ac_number").is_none());
    }

    #[test]
    fn test_purchase_order_malformed_date_fails() {
        let mut batch =
            StagedBatch::new(SourceTable::PurchaseOrder.schema().columns.iter().copied());
        batch
            .push_row(vec![
                json!("1"),
                json!("2022-11-03 14:20:52.187"),
                json!("2022-11-03 14:20:52.187"),
                json!("12"),
                json!("11"),
                json!("ZDOI5EA"),
                json!("371"),
                json!("361.39"),
                json!("2"),
                json!("someday"),
                json!("2022-11-09"),
                json!("6"),
            ])
            .unwrap();
        assert!(fact_purchase_order(&rows(&batch)).is_err());
    }
}
