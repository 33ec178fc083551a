//! Expression-tree evaluation
//!
//! One `Evaluator` walks a parsed expression tree against a pre-fetched
//! `DataBag`: function nodes dispatch through the registry, bare metric
//! references resolve to the bag's series lists. Evaluation is synchronous
//! recursion; every value involved is `Send + Sync`, so a host that wants to
//! fan sibling arguments out across threads can do so and join results in
//! input order.

mod error;

pub use error::{EvaluationError, EvaluationResult};

use log::debug;

use crate::ast::Expr;
use crate::model::{DataBag, MetricRequest, Series};
use crate::registry::FunctionRegistry;

/// Recursive evaluator over a function registry.
///
/// The registry is constructed once at process start and borrowed here for
/// the duration of a request; nothing is mutated mid-request.
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over a registry.
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate one expression node over `[from, until)`.
    ///
    /// Function nodes dispatch to their registered implementation; metric
    /// nodes resolve against the data bag. Literals cannot stand alone.
    pub fn eval(
        &self,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        match expr {
            Expr::Func { name, .. } => {
                let function = self
                    .registry
                    .get(name)
                    .ok_or_else(|| EvaluationError::UnknownFunction { name: name.clone() })?;
                function.evaluate(self, expr, from, until, data)
            }
            Expr::Metric { name } => self.fetch(name, from, until, data),
            other => Err(EvaluationError::InvalidOperation {
                message: format!("cannot evaluate literal {other} as a series list"),
            }),
        }
    }

    /// Resolve one argument slot into a concrete series list.
    ///
    /// Nested calls recurse through `eval`; bare patterns come from the bag
    /// verbatim (fetch-layer order preserved). A pattern with no bag entry is
    /// the soft `SeriesNotFound` condition, left to the caller's fallback
    /// policy.
    pub fn get_series_arg(
        &self,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        self.eval(expr, from, until, data)
    }

    fn fetch(
        &self,
        metric: &str,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let request = MetricRequest::new(metric, from, until);
        match data.get(&request) {
            // Cloning here is what makes the read-only bag contract hold: a
            // result list never aliases bag storage, so a function may fill
            // its own copies without touching what sibling calls see.
            Some(series) => Ok(series.clone()),
            None => {
                debug!("no fetched data for {metric} [{from}, {until})");
                Err(EvaluationError::SeriesNotFound {
                    metric: metric.to_string(),
                })
            }
        }
    }
}
