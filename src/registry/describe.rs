//! Self-description records for registered functions
//!
//! Consumed by external documentation and UI generators, never by the
//! evaluator itself. The parameter type tags document the coercion contract
//! the argument accessors enforce at evaluation time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Argument type tag, documentation-level mirror of the accessor contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    /// One metric or a wildcard series list
    SeriesList,
    /// Floating-point constant
    Float,
    /// Integer constant
    Integer,
    /// Interval literal such as `"1w"`
    Interval,
    /// Dotted-path node index
    Node,
    /// String constant
    String,
    /// Boolean constant
    Boolean,
}

/// One parameter of a function's canonical signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    /// Parameter name
    pub name: String,
    /// Documented type tag
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Whether the caller must supply it
    #[serde(default)]
    pub required: bool,
    /// Whether the parameter repeats (variadic tail)
    #[serde(default)]
    pub multiple: bool,
    /// Default applied when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Closed set of accepted values, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// UI suggestions, not enforced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Value>,
}

impl FunctionParam {
    /// Required parameter.
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            multiple: false,
            default: None,
            options: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Optional parameter.
    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    /// Mark the parameter as a repeating tail.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Attach a default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restrict to a closed option set.
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Attach UI suggestions.
    pub fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.suggestions = suggestions.iter().map(|s| Value::from(*s)).collect();
        self
    }
}

/// Free-text documentation plus the canonical call signature of one
/// registered name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescription {
    /// Registered name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Canonical call signature, e.g. `pow(seriesList, factor)`
    pub function: String,
    /// Grouping tag for documentation layout
    pub group: String,
    /// Logical module path, kept for Graphite-web compatibility
    pub module: String,
    /// Ordered parameter specs
    pub params: Vec<FunctionParam>,
}
