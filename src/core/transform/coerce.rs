//! Typed coercion of raw text cells
//!
//! Raw batches carry the source's text representation of every value. These
//! helpers turn a cell into the typed value a warehouse column expects. Absent
//! and empty cells coerce to `None`; malformed ones are a transform error for
//! the target being produced.

use crate::core::state::watermark::parse_timestamp;
use crate::domain::{QuarryError, Result, SourceRow, WarehouseTable};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Coerces cells of one source row on behalf of one warehouse target
#[derive(Debug, Clone, Copy)]
pub struct Cells<'a> {
    target: WarehouseTable,
    row: SourceRow<'a>,
}

impl<'a> Cells<'a> {
    /// Reads `row` for `target`
    pub fn new(target: WarehouseTable, row: SourceRow<'a>) -> Self {
        Self { target, row }
    }

    fn error(&self, column: &str, message: impl std::fmt::Display) -> QuarryError {
        QuarryError::transform(self.target.as_str(), format!("{column}: {message}"))
    }

    fn required<T>(&self, column: &str, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| self.error(column, "value is required"))
    }

    /// Trimmed text, empty read as `None`
    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.row.non_empty(column)
    }

    /// Text as a JSON cell (`null` when absent)
    pub fn text_value(&self, column: &str) -> Value {
        self.text(column)
            .map_or(Value::Null, |s| Value::String(s.to_string()))
    }

    /// Integer id or quantity
    pub fn int(&self, column: &str) -> Result<Option<i64>> {
        self.text(column)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| self.error(column, format!("'{raw}' is not an integer")))
            })
            .transpose()
    }

    /// Integer that must be present
    pub fn required_int(&self, column: &str) -> Result<i64> {
        let value = self.int(column)?;
        self.required(column, value)
    }

    /// Fixed-point amount or price
    pub fn decimal(&self, column: &str) -> Result<Option<Decimal>> {
        self.text(column)
            .map(|raw| {
                Decimal::from_str(raw)
                    .map_err(|_| self.error(column, format!("'{raw}' is not numeric")))
            })
            .transpose()
    }

    /// Fixed-point value that must be present
    pub fn required_decimal(&self, column: &str) -> Result<Decimal> {
        let value = self.decimal(column)?;
        self.required(column, value)
    }

    /// Boolean from `true/false/t/f/1/0/yes/no`, case-insensitive
    pub fn boolean(&self, column: &str) -> Result<Option<bool>> {
        self.text(column)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(true),
                "false" | "f" | "0" | "no" => Ok(false),
                _ => Err(self.error(column, format!("'{raw}' is not a boolean"))),
            })
            .transpose()
    }

    /// Boolean that must be present
    pub fn required_boolean(&self, column: &str) -> Result<bool> {
        let value = self.boolean(column)?;
        self.required(column, value)
    }

    /// Calendar date from a date or a timestamp
    pub fn date(&self, column: &str) -> Result<Option<NaiveDate>> {
        self.text(column)
            .map(|raw| {
                parse_date(raw).ok_or_else(|| self.error(column, format!("'{raw}' is not a date")))
            })
            .transpose()
    }

    /// Timestamp split into its date and time of day; the timestamp must be present
    pub fn split_timestamp(&self, column: &str) -> Result<(NaiveDate, String)> {
        let raw = self.required(column, self.text(column))?;
        let ts = parse_naive_timestamp(raw)
            .ok_or_else(|| self.error(column, format!("'{raw}' is not a timestamp")))?;
        Ok((ts.date(), ts.time().format("%H:%M:%S%.f").to_string()))
    }
}

/// `YYYY-MM-DD`, or the date part of any accepted timestamp
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_naive_timestamp(raw).map(|ts| ts.date()))
}

/// Timestamp in source-local terms; offsets are normalized to UTC
fn parse_naive_timestamp(raw: &str) -> Option<NaiveDateTime> {
    parse_timestamp(raw).map(|ts| ts.naive_utc())
}

/// Date formatted for a batch cell
pub fn date_value(date: Option<NaiveDate>) -> Value {
    date.map_or(Value::Null, |d| Value::String(d.format("%Y-%m-%d").to_string()))
}

/// Decimal formatted for a batch cell, keeping its scale
pub fn decimal_value(value: Option<Decimal>) -> Value {
    value.map_or(Value::Null, |d| Value::String(d.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn cells<'a>(columns: &'a [String], values: &'a [Value]) -> Cells<'a> {
        Cells::new(WarehouseTable::FactPayment, SourceRow::new(columns, values))
    }

    fn columns() -> Vec<String> {
        vec!["v".to_string()]
    }

    #[test_case("true", true ; "word")]
    #[test_case("T", true ; "letter upper")]
    #[test_case("1", true ; "digit")]
    #[test_case("Yes", true ; "yes mixed case")]
    #[test_case("false", false ; "false word")]
    #[test_case("f", false ; "f letter")]
    #[test_case("0", false ; "zero")]
    #[test_case("NO", false ; "no upper")]
    fn test_boolean_accepts(raw: &str, expected: bool) {
        let cols = columns();
        let values = [json!(raw)];
        assert_eq!(cells(&cols, &values).boolean("v").unwrap(), Some(expected));
    }

    #[test]
    fn test_boolean_rejects_other_text() {
        let cols = columns();
        let values = [json!("maybe")];
        let err = cells(&cols, &values).boolean("v").unwrap_err();
        assert!(err.to_string().contains("fact_payment"));
    }

    #[test]
    fn test_empty_and_null_are_none() {
        let cols = columns();
        for value in [json!(""), json!("  "), Value::Null] {
            let values = [value];
            let c = cells(&cols, &values);
            assert_eq!(c.int("v").unwrap(), None);
            assert_eq!(c.decimal("v").unwrap(), None);
            assert_eq!(c.date("v").unwrap(), None);
            assert!(c.required_int("v").is_err());
        }
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let cols = columns();
        let values = [json!("3.50")];
        let value = cells(&cols, &values).decimal("v").unwrap();
        assert_eq!(decimal_value(value), json!("3.50"));
    }

    #[test]
    fn test_non_numeric_amount_fails() {
        let cols = columns();
        let values = [json!("twelve")];
        let err = cells(&cols, &values).required_decimal("v").unwrap_err();
        assert!(matches!(err, QuarryError::Transform { .. }));
        assert!(cells(&cols, &values).int("v").is_err());
    }

    #[test_case("2022-11-03 14:20:49.962", "2022-11-03", "14:20:49.962" ; "millis")]
    #[test_case("2024-02-01 00:00:00", "2024-02-01", "00:00:00" ; "midnight")]
    #[test_case("2024-02-01T09:15:00Z", "2024-02-01", "09:15:00" ; "rfc3339")]
    fn test_split_timestamp(raw: &str, date: &str, time: &str) {
        let cols = columns();
        let values = [json!(raw)];
        let (d, t) = cells(&cols, &values).split_timestamp("v").unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), date);
        assert_eq!(t, time);
    }

    #[test]
    fn test_date_accepts_timestamp_and_rejects_garbage() {
        assert_eq!(
            parse_date("2022-11-09 00:00:00"),
            NaiveDate::from_ymd_opt(2022, 11, 9)
        );
        let cols = columns();
        let values = [json!("next week")];
        assert!(cells(&cols, &values).date("v").is_err());
    }
}
