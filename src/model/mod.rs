//! Core data model for the evaluation engine
//!
//! `Series` is the canonical representation of one named, absence-aware float
//! sequence. `MetricRequest` is the structural key the pre-fetched `DataBag`
//! is indexed by.

mod access_log;
mod series;

pub use access_log::AccessLogDetails;
pub use series::{DataBag, MetricRequest, Series};
