//! Expression tree consumed by the evaluator
//!
//! The tree is produced by an external parser; this module defines the node
//! type plus the typed accessor contract functions use to pull their
//! arguments (positional, named, defaulted, typed). It is deliberately
//! lightweight: no parsing of query strings happens here, only of interval
//! literals such as `"1w"`.

use std::fmt;

use thiserror::Error;

/// Result type for argument extraction.
pub type ArgResult<T> = Result<T, ArgumentError>;

/// A required argument is missing or an argument has the wrong type.
///
/// Always fails the enclosing function call; distinguishable from data
/// errors so callers never confuse a malformed query with missing series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    /// Required positional argument not supplied
    #[error("'{target}' is missing required argument {position}")]
    Missing {
        /// Function being evaluated
        target: String,
        /// Zero-based argument position
        position: usize,
    },

    /// Argument present but of the wrong type
    #[error("'{target}' argument {position} expects {expected}, got {actual}")]
    BadType {
        /// Function being evaluated
        target: String,
        /// Zero-based argument position
        position: usize,
        /// Expected type name
        expected: &'static str,
        /// Actual node rendered back to query text
        actual: String,
    },

    /// Interval literal does not follow the `<sign?><digits><unit>...` grammar
    #[error("unknown time units in interval {literal:?}")]
    UnknownTimeUnits {
        /// Offending literal
        literal: String,
    },
}

/// One node of a parsed query expression.
///
/// A node is either a literal, a bare metric-pattern reference, or a function
/// call with positional and named arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Const(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// Bare metric name or glob pattern
    Metric {
        /// Pattern as written in the query
        name: String,
    },
    /// Function call
    Func {
        /// Function name, case-sensitive
        name: String,
        /// Positional arguments in call order
        args: Vec<Expr>,
        /// Named arguments in call order
        named_args: Vec<(String, Expr)>,
    },
}

impl Expr {
    /// Numeric literal node.
    pub fn constant(v: f64) -> Self {
        Expr::Const(v)
    }

    /// String literal node.
    pub fn string(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    /// Boolean literal node.
    pub fn boolean(b: bool) -> Self {
        Expr::Bool(b)
    }

    /// Bare metric-pattern node.
    pub fn metric(name: impl Into<String>) -> Self {
        Expr::Metric { name: name.into() }
    }

    /// Function-call node with positional arguments.
    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Func {
            name: name.into(),
            args,
            named_args: Vec::new(),
        }
    }

    /// Attach a named argument to a function-call node. No-op on literals.
    pub fn with_named(mut self, name: impl Into<String>, value: Expr) -> Self {
        if let Expr::Func { named_args, .. } = &mut self {
            named_args.push((name.into(), value));
        }
        self
    }

    /// Function name for calls, pattern for metric references, the literal
    /// text for strings, empty otherwise.
    pub fn target(&self) -> &str {
        match self {
            Expr::Func { name, .. } => name,
            Expr::Metric { name } => name,
            Expr::Str(s) => s,
            _ => "",
        }
    }

    /// Positional arguments; empty for non-call nodes.
    pub fn args(&self) -> &[Expr] {
        match self {
            Expr::Func { args, .. } => args,
            _ => &[],
        }
    }

    /// True for function-call nodes.
    pub fn is_func(&self) -> bool {
        matches!(self, Expr::Func { .. })
    }

    /// Argument list rendered back to query text, named arguments last.
    pub fn raw_args(&self) -> String {
        match self {
            Expr::Func { args, named_args, .. } => {
                let mut parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                parts.extend(named_args.iter().map(|(k, v)| format!("{k}={v}")));
                parts.join(",")
            }
            _ => String::new(),
        }
    }

    fn arg_at(&self, n: usize) -> Option<&Expr> {
        self.args().get(n)
    }

    fn named_or_pos(&self, name: &str, n: usize) -> Option<&Expr> {
        if let Expr::Func { named_args, .. } = self {
            if let Some((_, v)) = named_args.iter().find(|(k, _)| k == name) {
                return Some(v);
            }
        }
        self.arg_at(n)
    }

    fn missing(&self, position: usize) -> ArgumentError {
        ArgumentError::Missing {
            target: self.target().to_string(),
            position,
        }
    }

    fn bad_type(&self, position: usize, expected: &'static str, actual: &Expr) -> ArgumentError {
        ArgumentError::BadType {
            target: self.target().to_string(),
            position,
            expected,
            actual: actual.to_string(),
        }
    }

    /// Sub-expression at position `n`; error when absent.
    pub fn get_arg(&self, n: usize) -> ArgResult<&Expr> {
        self.arg_at(n).ok_or_else(|| self.missing(n))
    }

    /// Required string argument at position `n`.
    pub fn get_string_arg(&self, n: usize) -> ArgResult<String> {
        match self.arg_at(n) {
            Some(Expr::Str(s)) => Ok(s.clone()),
            Some(other) => Err(self.bad_type(n, "string", other)),
            None => Err(self.missing(n)),
        }
    }

    /// String argument by name or position, falling back to `default`.
    pub fn get_string_named_or_pos_default(
        &self,
        name: &str,
        n: usize,
        default: &str,
    ) -> ArgResult<String> {
        match self.named_or_pos(name, n) {
            Some(Expr::Str(s)) => Ok(s.clone()),
            Some(other) => Err(self.bad_type(n, "string", other)),
            None => Ok(default.to_string()),
        }
    }

    /// Required float argument at position `n`.
    pub fn get_float_arg(&self, n: usize) -> ArgResult<f64> {
        match self.arg_at(n) {
            Some(Expr::Const(v)) => Ok(*v),
            Some(other) => Err(self.bad_type(n, "number", other)),
            None => Err(self.missing(n)),
        }
    }

    /// Float argument at position `n`, falling back to `default` when absent.
    pub fn get_float_arg_default(&self, n: usize, default: f64) -> ArgResult<f64> {
        match self.arg_at(n) {
            Some(Expr::Const(v)) => Ok(*v),
            Some(other) => Err(self.bad_type(n, "number", other)),
            None => Ok(default),
        }
    }

    /// Optional float argument at position `n`.
    pub fn get_float_arg_opt(&self, n: usize) -> ArgResult<Option<f64>> {
        match self.arg_at(n) {
            Some(Expr::Const(v)) => Ok(Some(*v)),
            Some(other) => Err(self.bad_type(n, "number", other)),
            None => Ok(None),
        }
    }

    /// Optional float argument by name or position.
    pub fn get_float_named_or_pos_opt(&self, name: &str, n: usize) -> ArgResult<Option<f64>> {
        match self.named_or_pos(name, n) {
            Some(Expr::Const(v)) => Ok(Some(*v)),
            Some(other) => Err(self.bad_type(n, "number", other)),
            None => Ok(None),
        }
    }

    /// Required integer argument at position `n`. A float with a fractional
    /// part is a type error, not a truncation.
    pub fn get_int_arg(&self, n: usize) -> ArgResult<i64> {
        match self.arg_at(n) {
            Some(Expr::Const(v)) if v.fract() == 0.0 => Ok(*v as i64),
            Some(other) => Err(self.bad_type(n, "integer", other)),
            None => Err(self.missing(n)),
        }
    }

    /// All integer arguments from position `n` to the end. At least one is
    /// required.
    pub fn get_int_args(&self, n: usize) -> ArgResult<Vec<i64>> {
        let args = self.args();
        if n >= args.len() {
            return Err(self.missing(n));
        }
        (n..args.len()).map(|i| self.get_int_arg(i)).collect()
    }

    /// Boolean argument by name or position, falling back to `default`.
    pub fn get_bool_named_or_pos_default(
        &self,
        name: &str,
        n: usize,
        default: bool,
    ) -> ArgResult<bool> {
        match self.named_or_pos(name, n) {
            Some(Expr::Bool(b)) => Ok(*b),
            Some(other) => Err(self.bad_type(n, "boolean", other)),
            None => Ok(default),
        }
    }

    /// Required interval argument at position `n`, in seconds. `default_sign`
    /// applies when the literal carries no explicit sign. A whole-number
    /// argument counts as seconds directly.
    pub fn get_interval_arg(&self, n: usize, default_sign: i64) -> ArgResult<i64> {
        match self.arg_at(n) {
            Some(Expr::Str(s)) => parse_interval(s, default_sign),
            Some(Expr::Const(v)) if v.fract() == 0.0 => Ok(*v as i64),
            Some(other) => Err(self.bad_type(n, "interval", other)),
            None => Err(self.missing(n)),
        }
    }

    /// Interval argument at position `n`, falling back to `default_seconds`
    /// when absent.
    pub fn get_interval_arg_default(
        &self,
        n: usize,
        default_seconds: i64,
        default_sign: i64,
    ) -> ArgResult<i64> {
        match self.arg_at(n) {
            Some(Expr::Str(s)) => parse_interval(s, default_sign),
            Some(Expr::Const(v)) if v.fract() == 0.0 => Ok(*v as i64),
            Some(other) => Err(self.bad_type(n, "interval", other)),
            None => Ok(default_seconds),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{v}")
                }
            }
            Expr::Str(s) => write!(f, "'{s}'"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Metric { name } => write!(f, "{name}"),
            Expr::Func { name, .. } => write!(f, "{}({})", name, self.raw_args()),
        }
    }
}

/// Parse an interval literal such as `"1w"`, `"-2d"` or `"1h30min"` into
/// seconds. `default_sign` (`1` or `-1`) applies when the literal has no
/// leading sign.
pub fn parse_interval(s: &str, default_sign: i64) -> ArgResult<i64> {
    let unknown = || ArgumentError::UnknownTimeUnits {
        literal: s.to_string(),
    };

    let mut rest = s;
    let mut sign = default_sign;
    match rest.as_bytes().first() {
        Some(b'-') => {
            sign = -1;
            rest = &rest[1..];
        }
        Some(b'+') => {
            sign = 1;
            rest = &rest[1..];
        }
        _ => {}
    }
    if rest.is_empty() {
        return Err(unknown());
    }

    let mut total: i64 = 0;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return Err(unknown());
        }
        let amount: i64 = rest[..digits].parse().map_err(|_| unknown())?;
        rest = &rest[digits..];

        let unit_len = rest
            .bytes()
            .take_while(|b| !b.is_ascii_digit() && *b != b'-' && *b != b'+')
            .count();
        let seconds = match &rest[..unit_len] {
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            "min" | "mins" | "minute" | "minutes" => 60,
            "h" | "hour" | "hours" => 3600,
            "d" | "day" | "days" => 86_400,
            "w" | "week" | "weeks" => 7 * 86_400,
            "mon" | "month" | "months" => 30 * 86_400,
            "y" | "year" | "years" => 365 * 86_400,
            _ => return Err(unknown()),
        };
        rest = &rest[unit_len..];
        total += sign * amount * seconds;
    }
    Ok(total)
}
