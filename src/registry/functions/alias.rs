//! Display-name substitution for series lists.
//!
//! Both rewrite series names for human consumption and degrade to the
//! original name when the rewrite is not possible: a failed decode or a
//! failed lookup is never a query error.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use rustc_hash::FxHashMap;

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::helper::{prepare_kube_metric, prepare_metric};
use crate::lookup::{HashLookup, LookupConfig};
use crate::model::{DataBag, Series};
use crate::registry::{FunctionDescription, FunctionMetadata, FunctionParam, ParamType, QueryFunction};

struct AliasByBase64;

struct AliasByHash {
    lookup: Arc<dyn HashLookup>,
    config: LookupConfig,
}

/// Bindings for this module.
pub fn new(config: &EngineConfig, lookup: Arc<dyn HashLookup>) -> Vec<FunctionMetadata> {
    vec![
        FunctionMetadata::new("aliasByBase64", Arc::new(AliasByBase64)),
        FunctionMetadata::new(
            "aliasByHash",
            Arc::new(AliasByHash {
                lookup,
                config: config.lookup.clone(),
            }),
        ),
    ]
}

impl QueryFunction for AliasByBase64 {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let series = evaluator.get_series_arg(expr.get_arg(0)?, from, until, data)?;

        let mut results = Vec::with_capacity(series.len());
        for s in series {
            let decoded = STANDARD
                .decode(&s.name)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok());
            match decoded {
                Some(name) => results.push(s.renamed(name)),
                None => results.push(s),
            }
        }
        Ok(results)
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let mut docs = FxHashMap::default();
        docs.insert(
            "aliasByBase64".to_string(),
            FunctionDescription {
                name: "aliasByBase64".to_string(),
                description: "Takes a seriesList and decodes each name as base64. Names that \
                              do not decode to valid text pass through unchanged."
                    .to_string(),
                function: "aliasByBase64(seriesList)".to_string(),
                group: "Alias".to_string(),
                module: "graphite.render.functions".to_string(),
                params: vec![FunctionParam::required("seriesList", ParamType::SeriesList)],
            },
        );
        docs
    }
}

impl AliasByHash {
    fn resolve(&self, metric: &str, hash_name: &str) -> String {
        if hash_name == "kube" {
            let (name, key, suffix) = prepare_kube_metric(metric);
            match self.lookup.hget(self.config.kube_db, &name, &key) {
                Ok(value) => format!("{value}{suffix}"),
                Err(err) => {
                    debug!("kube alias lookup failed for {metric}: {err}");
                    metric.to_string()
                }
            }
        } else {
            let key = prepare_metric(metric);
            match self.lookup.hget(self.config.default_db, hash_name, key) {
                Ok(value) => value,
                Err(err) => {
                    debug!("alias lookup failed for {metric} in {hash_name}: {err}");
                    metric.to_string()
                }
            }
        }
    }
}

impl QueryFunction for AliasByHash {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let series = evaluator.get_series_arg(expr.get_arg(0)?, from, until, data)?;
        let hash_name = expr.get_string_arg(1)?;

        let mut results = Vec::with_capacity(series.len());
        for s in series {
            let name = self.resolve(&s.name, &hash_name);
            results.push(s.renamed(name));
        }
        Ok(results)
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let mut docs = FxHashMap::default();
        docs.insert(
            "aliasByHash".to_string(),
            FunctionDescription {
                name: "aliasByHash".to_string(),
                description: "Takes a seriesList and a hash name and replaces each series name \
                              with the display value stored in the external hash. The reserved \
                              hash name 'kube' switches to the kubernetes naming scheme. \
                              Series whose lookup fails keep their original name."
                    .to_string(),
                function: "aliasByHash(seriesList, hashName)".to_string(),
                group: "Alias".to_string(),
                module: "graphite.render.functions".to_string(),
                params: vec![
                    FunctionParam::required("seriesList", ParamType::SeriesList),
                    FunctionParam::required("hashName", ParamType::String),
                ],
            },
        );
        docs
    }
}
