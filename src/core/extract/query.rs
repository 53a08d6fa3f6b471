//! Extraction query construction
//!
//! Table and column names only ever come from [`SourceTable`] schemas, so the
//! identifiers interpolated into SQL are drawn from a fixed allow-list. The
//! watermark is always a bound parameter.

use crate::core::state::watermark::format_query_parameter;
use crate::domain::SourceTable;
use chrono::{DateTime, Utc};

/// A parametrized `SELECT` for one source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractQuery {
    table: SourceTable,
    sql: String,
    parameter: Option<String>,
}

impl ExtractQuery {
    /// Builds the query for `table`, filtered on the change-timestamp when `since` is set
    ///
    /// Every column is cast to text so raw batches keep the exact source
    /// representation. Tables without a change-timestamp column are always
    /// selected in full.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry::core::extract::ExtractQuery;
    /// use quarry::core::state::parse_timestamp;
    /// use quarry::domain::SourceTable;
    ///
    /// let since = parse_timestamp("2024-01-01T00:00:00Z");
    /// let query = ExtractQuery::build(SourceTable::Currency, since);
    ///
    /// assert_eq!(
    ///     query.sql(),
    ///     r#"SELECT "currency_id"::text, "currency_code"::text, "created_at"::text, "last_updated"::text FROM "currency" WHERE "last_updated" > $1::text::timestamp"#
    /// );
    /// assert_eq!(query.parameter(), Some("2024-01-01 00:00:00.000000"));
    /// ```
    pub fn build(table: SourceTable, since: Option<DateTime<Utc>>) -> Self {
        let schema = table.schema();
        let projection = schema
            .columns
            .iter()
            .map(|c| format!("{}::text", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {projection} FROM {}", quote_ident(schema.name));
        let parameter = match (schema.change_column, since) {
            (Some(column), Some(ts)) => {
                sql.push_str(&format!(
                    " WHERE {} > $1::text::timestamp",
                    quote_ident(column)
                ));
                Some(format_query_parameter(ts))
            }
            _ => None,
        };

        Self {
            table,
            sql,
            parameter,
        }
    }

    /// Table being extracted
    pub fn table(&self) -> SourceTable {
        self.table
    }

    /// SQL text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Watermark bound as `$1`, if the query is filtered
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Columns in result order
    pub fn columns(&self) -> &'static [&'static str] {
        self.table.schema().columns
    }
}

/// Double-quotes an identifier, escaping embedded quotes
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
