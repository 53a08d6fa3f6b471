//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod common;
pub mod extract;
pub mod init;
pub mod load;
pub mod run;
pub mod status;
pub mod transform;
pub mod validate;
