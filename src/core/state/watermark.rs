//! Watermark model for incremental extraction
//!
//! The persisted state is a flat JSON object mapping source table name to the
//! greatest change-timestamp extracted so far, as an RFC 3339 UTC string.
//! Values are kept as raw strings so an entry that cannot be parsed survives a
//! cycle untouched instead of being dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Naive layouts accepted for watermarks and row change-timestamps (read as UTC)
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a timestamp in any of the accepted representations
///
/// Accepts RFC 3339 (any offset, normalized to UTC), `YYYY-MM-DD HH:MM:SS[.f]`,
/// `YYYY-MM-DDTHH:MM:SS[.f]` and a bare `YYYY-MM-DD` (midnight). Offset-free
/// values are taken as UTC.
///
/// # Examples
///
/// ```
/// use quarry::core::state::watermark::parse_timestamp;
///
/// let a = parse_timestamp("2024-02-01T00:00:00Z").unwrap();
/// let b = parse_timestamp("2024-02-01 00:00:00.000000").unwrap();
/// let c = parse_timestamp("2024-02-01").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(b, c);
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Canonical persisted form, e.g. `2024-02-01T00:00:00Z`
pub fn format_watermark(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Form bound into the extraction predicate, e.g. `2024-02-01 00:00:00.000000`
pub fn format_query_parameter(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Where extraction of a table should start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Since {
    /// No watermark recorded: extract everything
    Never,
    /// Extract rows changed strictly after this instant
    After(DateTime<Utc>),
    /// A watermark is recorded but cannot be parsed: extract everything
    Unparseable(String),
}

impl Since {
    /// Lower bound for the extraction predicate, if any
    pub fn lower_bound(&self) -> Option<DateTime<Utc>> {
        match self {
            Since::After(ts) => Some(*ts),
            Since::Never | Since::Unparseable(_) => None,
        }
    }
}

/// Per-table watermark map
///
/// # Examples
///
/// ```
/// use quarry::core::state::watermark::{parse_timestamp, WatermarkState};
///
/// let mut state = WatermarkState::default();
/// let feb = parse_timestamp("2024-02-01T00:00:00Z").unwrap();
/// let jan = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
///
/// assert!(state.advance("sales_order", feb));
/// assert!(!state.advance("sales_order", jan));
/// assert_eq!(state.get("sales_order"), Some("2024-02-01T00:00:00Z"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatermarkState {
    entries: BTreeMap<String, String>,
}

impl WatermarkState {
    /// Creates an empty state (every table at epoch)
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value for a table
    pub fn get(&self, table: &str) -> Option<&str> {
        self.entries.get(table).map(String::as_str)
    }

    /// Parsed extraction start for a table
    pub fn since(&self, table: &str) -> Since {
        match self.get(table) {
            None => Since::Never,
            Some(raw) => match parse_timestamp(raw) {
                Some(ts) => Since::After(ts),
                None => Since::Unparseable(raw.to_string()),
            },
        }
    }

    /// Moves a table's watermark forward to `observed` if it is later
    ///
    /// Returns whether the stored value changed. An unparseable stored value is
    /// replaced by any observed instant.
    pub fn advance(&mut self, table: &str, observed: DateTime<Utc>) -> bool {
        let current = self.get(table).and_then(parse_timestamp);
        if current.is_some_and(|c| c >= observed) {
            return false;
        }
        self.entries
            .insert(table.to_string(), format_watermark(observed));
        true
    }

    /// Sets a raw value, bypassing the monotonic check
    pub fn set_raw(&mut self, table: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(table.into(), value.into());
    }

    /// Iterates `(table, raw value)` in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of recorded tables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no table has a watermark
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
