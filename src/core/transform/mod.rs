//! Star-schema transformation
//!
//! Raw source rows are mapped onto dimension and fact records:
//!
//! - [`coerce`] - typed reading of raw text cells
//! - [`lookups`] - address and department rows shared by every mapping
//! - [`dimensions`] / [`facts`] - one pure mapping per warehouse target
//! - [`transformer`] - the stage that reads, maps and stages batches

pub mod coerce;
pub mod dimensions;
pub mod facts;
pub mod lookups;
pub mod transformer;

pub use lookups::Lookups;
pub use transformer::{
    map_target, target_for, TransformRequest, TransformResponse, Transformer, TARGET_SOURCES,
};
