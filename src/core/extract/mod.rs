//! Incremental extraction from the operational source

pub mod extractor;
pub mod query;

pub use extractor::{ExtractRequest, ExtractResponse, Extractor};
pub use query::ExtractQuery;
