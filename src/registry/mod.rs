//! Function registry and built-in function library
//!
//! Maps case-sensitive function names to implementations of the uniform
//! evaluate/describe contract. Third parties extend the engine by
//! registering additional [`FunctionMetadata`] bindings; a later registration
//! for an existing name replaces it.

mod describe;
mod function;
pub mod functions;

pub use describe::{FunctionDescription, FunctionParam, ParamType};
pub use function::{FunctionMetadata, FunctionRegistry, Order, QueryFunction};
