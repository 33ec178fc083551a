//! Graphite-compatible expression evaluation in Rust
//!
//! Evaluates parsed Graphite render-API expression trees against
//! pre-fetched series data: a function registry maps call targets to
//! implementations, an evaluator recurses through the tree, and a library
//! of built-in functions covers arithmetic over series lists, seasonal
//! baselines, anomaly joins, count-weighted averages and display aliasing.

pub mod ast;
pub mod config;
pub mod evaluator;
pub mod helper;
pub mod lookup;
pub mod model;
pub mod registry;

// Re-export main types
pub use ast::{ArgumentError, Expr, parse_interval};
pub use config::EngineConfig;
pub use evaluator::{EvaluationError, EvaluationResult, Evaluator};
pub use lookup::{HashLookup, LookupConfig, LookupError, MemoryLookup, UnavailableLookup};
pub use model::{AccessLogDetails, DataBag, MetricRequest, Series};
pub use registry::{FunctionMetadata, FunctionRegistry, QueryFunction};
