//! Built-in function library
//!
//! One module per function family. Each module exposes
//! `new(config) -> Vec<FunctionMetadata>` so the loader can register every
//! public name; a family that serves several names dispatches internally on
//! the invoked target.

pub mod alias;
pub mod anomaly;
pub mod baselines;
pub mod exclude;
pub mod pow;
pub mod series_list;
pub mod weighted_average;
