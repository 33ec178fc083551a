//! Raises each datapoint to a constant power.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::helper::format_number;
use crate::model::{DataBag, Series};
use crate::registry::{FunctionDescription, FunctionMetadata, FunctionParam, ParamType, QueryFunction};

struct Pow;

/// Bindings for this module.
pub fn new(_config: &EngineConfig) -> Vec<FunctionMetadata> {
    vec![FunctionMetadata::new("pow", Arc::new(Pow))]
}

impl QueryFunction for Pow {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let series = evaluator.get_series_arg(expr.get_arg(0)?, from, until, data)?;
        let factor = expr.get_float_arg(1)?;

        let mut results = Vec::with_capacity(series.len());
        for a in &series {
            let mut r = a.clone_shape(format!("pow({},{})", a.name, format_number(factor)));
            for i in 0..a.len() {
                if a.is_absent[i] {
                    r.is_absent[i] = true;
                    continue;
                }
                r.values[i] = a.values[i].powf(factor);
            }
            results.push(r);
        }
        Ok(results)
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let mut docs = FxHashMap::default();
        docs.insert(
            "pow".to_string(),
            FunctionDescription {
                name: "pow".to_string(),
                description: "Takes one metric or a wildcard seriesList followed by a constant, \
                              and raises each datapoint by the power of the constant provided."
                    .to_string(),
                function: "pow(seriesList, factor)".to_string(),
                group: "Transform".to_string(),
                module: "graphite.render.functions".to_string(),
                params: vec![
                    FunctionParam::required("seriesList", ParamType::SeriesList),
                    FunctionParam::required("factor", ParamType::Float),
                ],
            },
        );
        docs
    }
}
