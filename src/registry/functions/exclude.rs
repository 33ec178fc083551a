//! Drops series whose name matches a regular expression.

use std::sync::Arc;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::ast::{ArgumentError, Expr};
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::model::{DataBag, Series};
use crate::registry::{FunctionDescription, FunctionMetadata, FunctionParam, ParamType, QueryFunction};

struct Exclude;

/// Bindings for this module.
pub fn new(_config: &EngineConfig) -> Vec<FunctionMetadata> {
    vec![FunctionMetadata::new("exclude", Arc::new(Exclude))]
}

impl QueryFunction for Exclude {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let series = evaluator.get_series_arg(expr.get_arg(0)?, from, until, data)?;
        let pattern = expr.get_string_arg(1)?;
        let re = Regex::new(&pattern).map_err(|_| ArgumentError::BadType {
            target: expr.target().to_string(),
            position: 1,
            expected: "regular expression",
            actual: pattern.clone(),
        })?;

        Ok(series.into_iter().filter(|s| !re.is_match(&s.name)).collect())
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let mut docs = FxHashMap::default();
        docs.insert(
            "exclude".to_string(),
            FunctionDescription {
                name: "exclude".to_string(),
                description: "Takes a metric or a wildcard seriesList, followed by a regular \
                              expression in double quotes. Excludes metrics that match the \
                              regular expression."
                    .to_string(),
                function: "exclude(seriesList, pattern)".to_string(),
                group: "Filter Series".to_string(),
                module: "graphite.render.functions".to_string(),
                params: vec![
                    FunctionParam::required("seriesList", ParamType::SeriesList),
                    FunctionParam::required("pattern", ParamType::String),
                ],
            },
        );
        docs
    }
}
