//! Function contract and registry

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::lookup::HashLookup;
use crate::model::{DataBag, Series};
use crate::registry::describe::FunctionDescription;
use crate::registry::functions;

/// The uniform contract every query function implements.
///
/// `evaluate` must be read-only with respect to the data bag and
/// deterministic for identical inputs; anything it returns is freshly
/// allocated, never aliased bag storage. `describe` is consumed by external
/// documentation generators only.
pub trait QueryFunction: Send + Sync {
    /// Evaluate one call node over `[from, until)` against pre-fetched data.
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>>;

    /// Self-description per registered name.
    fn describe(&self) -> FxHashMap<String, FunctionDescription>;
}

/// Evaluation-order hint recorded at registration.
///
/// `Any` is the norm; `Last` exists for functions that depend on side
/// effects of sibling evaluations (none of the built-ins do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// No ordering constraint
    #[default]
    Any,
    /// Evaluate after order-independent siblings
    Last,
}

/// One name → implementation binding produced by a function module's
/// constructor. A single implementation may be bound under several names.
pub struct FunctionMetadata {
    /// Name the function registers under, case-sensitive
    pub name: String,
    /// Evaluation-order hint
    pub order: Order,
    /// Shared implementation
    pub function: Arc<dyn QueryFunction>,
}

impl FunctionMetadata {
    /// Binding with the default `Any` order.
    pub fn new(name: impl Into<String>, function: Arc<dyn QueryFunction>) -> Self {
        Self {
            name: name.into(),
            order: Order::Any,
            function,
        }
    }
}

/// Name → implementation table for one process.
///
/// Constructed once at startup, borrowed by evaluators, never mutated
/// mid-request. Tests construct isolated registries freely.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Arc<dyn QueryFunction>>,
    orders: FxHashMap<String, Order>,
}

impl FunctionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one binding. Registration is idempotent by name: a later
    /// binding for the same name replaces the earlier one, which is what
    /// test doubles and plugin overrides rely on.
    pub fn register(&mut self, metadata: FunctionMetadata) {
        self.orders.insert(metadata.name.clone(), metadata.order);
        self.functions.insert(metadata.name, metadata.function);
    }

    /// Register a batch of bindings.
    pub fn register_all(&mut self, metadata: Vec<FunctionMetadata>) {
        for m in metadata {
            self.register(m);
        }
    }

    /// Register the built-in function library.
    ///
    /// The hash alias functions get a lookup backend that fails soft; use
    /// [`FunctionRegistry::register_builtins_with_lookup`] to wire a real
    /// store.
    pub fn register_builtins(&mut self, config: &EngineConfig) {
        self.register_builtins_with_lookup(
            config,
            Arc::new(crate::lookup::UnavailableLookup),
        );
    }

    /// Register the built-in function library with an external lookup
    /// backend for the hash alias functions.
    pub fn register_builtins_with_lookup(
        &mut self,
        config: &EngineConfig,
        lookup: Arc<dyn HashLookup>,
    ) {
        self.register_all(functions::pow::new(config));
        self.register_all(functions::exclude::new(config));
        self.register_all(functions::series_list::new(config));
        self.register_all(functions::baselines::new(config));
        self.register_all(functions::anomaly::new(config));
        self.register_all(functions::weighted_average::new(config));
        self.register_all(functions::alias::new(config, lookup));
    }

    /// Implementation registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<dyn QueryFunction>> {
        self.functions.get(name).cloned()
    }

    /// True when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Order hint recorded for `name`.
    pub fn order(&self, name: &str) -> Option<Order> {
        self.orders.get(name).copied()
    }

    /// All registered names, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Merged self-descriptions of every registered name, stable order.
    ///
    /// JSON-serializable as-is; the evaluator never reads this.
    pub fn describe_all(&self) -> BTreeMap<String, FunctionDescription> {
        let mut docs = BTreeMap::new();
        for (name, function) in &self.functions {
            if let Some(description) = function.describe().remove(name) {
                docs.insert(name.clone(), description);
            }
        }
        docs
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("function_count", &self.functions.len())
            .finish()
    }
}
