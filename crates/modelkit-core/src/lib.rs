//! modelkit Core
//!
//! Core types shared by every modelkit crate.
//!
//! This crate provides:
//! - The error taxonomy and result alias
//! - Feature declarations (name, data type, dimensionality)
//! - Records and the data source abstraction models consume
//! - Tracing setup

pub mod error;
pub mod feature;
pub mod record;
pub mod source;
pub mod telemetry;

pub use error::{Error, Result};
pub use feature::{DType, Feature, Features, Length};
pub use record::Record;
pub use source::{JsonLinesSource, MemorySource, Source, Sources};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::feature::{DType, Feature, Features, Length};
    pub use crate::record::Record;
    pub use crate::source::{MemorySource, Source, Sources};
}
