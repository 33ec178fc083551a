//! Joins series with their anomaly-detector output.
//!
//! Pairs each series with the detector series published under a configured
//! name prefix, renames the detector copy to a `[anomaly]` display name and
//! emits one of three join shapes.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::model::{DataBag, MetricRequest, Series};
use crate::registry::{FunctionDescription, FunctionMetadata, FunctionParam, ParamType, QueryFunction};

struct Anomaly {
    prefix: String,
}

/// Bindings for this module.
pub fn new(config: &EngineConfig) -> Vec<FunctionMetadata> {
    vec![FunctionMetadata::new(
        "anomaly",
        Arc::new(Anomaly {
            prefix: config.anomaly_prefix.clone(),
        }),
    )]
}

impl Anomaly {
    /// A detector series that stopped updating is noise: require at least one
    /// present point within the trailing `offs` seconds of the window.
    fn is_live(series: &Series, offs: i64) -> bool {
        if offs <= 0 {
            return true;
        }
        let cutoff = ((series.stop_time - offs - series.start_time) / series.step_time).max(0);
        series
            .is_absent
            .iter()
            .skip(cutoff as usize)
            .any(|absent| !absent)
    }
}

impl QueryFunction for Anomaly {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let series = evaluator.get_series_arg(expr.get_arg(0)?, from, until, data)?;
        let join_type = expr.get_string_named_or_pos_default("type", 1, "all")?;
        let threshold = expr.get_float_named_or_pos_opt("threshold", 2)?;
        let offs = expr.get_interval_arg_default(3, 1, 1)?;

        let anomaly_target = format!("{}{}", self.prefix, expr.get_arg(0)?.target());
        let fetched = data
            .get(&MetricRequest::new(&anomaly_target, from, until))
            .cloned()
            .unwrap_or_default();

        let mut anomalies: FxHashMap<String, Series> = FxHashMap::default();
        for s in fetched {
            if !Self::is_live(&s, offs) {
                continue;
            }
            let stripped = s.name.strip_prefix(&self.prefix).unwrap_or(&s.name).to_string();
            let display = s.renamed(format!("[anomaly] {stripped}"));
            anomalies.insert(stripped, display);
        }

        let mut results = Vec::with_capacity(series.len() * 2);
        for s in series {
            if let Some(t) = threshold {
                let exceeds = s
                    .values
                    .iter()
                    .zip(&s.is_absent)
                    .any(|(v, absent)| !absent && *v > t);
                if !exceeds {
                    continue;
                }
            }
            let matched = anomalies.get(&s.name).cloned();
            match join_type.as_str() {
                "only_anomalies" => {
                    if let Some(a) = matched {
                        results.push(a);
                    }
                }
                "with_anomalies_only" => {
                    if let Some(a) = matched {
                        results.push(s);
                        results.push(a);
                    }
                }
                _ => {
                    results.push(s);
                    if let Some(a) = matched {
                        results.push(a);
                    }
                }
            }
        }
        Ok(results)
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let mut docs = FxHashMap::default();
        docs.insert(
            "anomaly".to_string(),
            FunctionDescription {
                name: "anomaly".to_string(),
                description: "Joins each series with its anomaly-detector series, published \
                              under a configured metric prefix. The detector copy is renamed \
                              with an '[anomaly]' marker; detector series with no recent data \
                              are ignored."
                    .to_string(),
                function: "anomaly(seriesList, type, threshold, offset)".to_string(),
                group: "Special".to_string(),
                module: "graphite.render.functions.custom".to_string(),
                params: vec![
                    FunctionParam::required("seriesList", ParamType::SeriesList),
                    FunctionParam::optional("type", ParamType::String)
                        .with_default("all")
                        .with_options(&["all", "only_anomalies", "with_anomalies_only"]),
                    FunctionParam::optional("threshold", ParamType::Float),
                    FunctionParam::optional("offset", ParamType::Interval),
                ],
            },
        );
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FunctionRegistry;
    use pretty_assertions::assert_eq;

    const PREFIX: &str = "resources.monitoring.anomaly_detector.";

    fn eval(expr: &Expr, data: &DataBag) -> EvaluationResult<Vec<Series>> {
        let mut registry = FunctionRegistry::new();
        registry.register_builtins(&EngineConfig::default());
        let evaluator = Evaluator::new(&registry);
        evaluator.eval(expr, 0, 2, data)
    }

    fn bag(primaries: Vec<Series>, detectors: Vec<Series>) -> DataBag {
        let mut data = DataBag::default();
        data.insert(MetricRequest::new("app.*", 0, 2), primaries);
        data.insert(
            MetricRequest::new(format!("{PREFIX}app.*"), 0, 2),
            detectors,
        );
        data
    }

    fn detector(name: &str, values: &[f64]) -> Series {
        Series::of_values(format!("{PREFIX}{name}"), values, 1, 0)
    }

    #[test]
    fn all_mode_interleaves_series_with_their_anomalies() {
        let data = bag(
            vec![
                Series::of_values("app.a", &[1.0, 2.0], 1, 0),
                Series::of_values("app.b", &[3.0, 4.0], 1, 0),
            ],
            vec![detector("app.a", &[0.0, 1.0])],
        );
        let expr = Expr::func("anomaly", vec![Expr::metric("app.*")]);

        let out = eval(&expr, &data).unwrap();
        let names: Vec<&str> = out.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["app.a", "[anomaly] app.a", "app.b"]);
        assert_eq!(out[1].values, vec![0.0, 1.0]);
    }

    #[test]
    fn only_anomalies_mode_drops_the_primaries() {
        let data = bag(
            vec![Series::of_values("app.a", &[1.0, 2.0], 1, 0)],
            vec![detector("app.a", &[0.0, 1.0])],
        );
        let expr = Expr::func(
            "anomaly",
            vec![Expr::metric("app.*"), Expr::string("only_anomalies")],
        );

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "[anomaly] app.a");
    }

    #[test]
    fn with_anomalies_only_mode_drops_unmatched_series() {
        let data = bag(
            vec![
                Series::of_values("app.a", &[1.0, 2.0], 1, 0),
                Series::of_values("app.b", &[3.0, 4.0], 1, 0),
            ],
            vec![detector("app.a", &[0.0, 1.0])],
        );
        let expr = Expr::func(
            "anomaly",
            vec![Expr::metric("app.*"), Expr::string("with_anomalies_only")],
        );

        let out = eval(&expr, &data).unwrap();
        let names: Vec<&str> = out.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["app.a", "[anomaly] app.a"]);
    }

    #[test]
    fn threshold_filters_quiet_series() {
        let data = bag(
            vec![
                Series::of_values("app.a", &[1.0, 2.0], 1, 0),
                Series::of_values("app.b", &[30.0, 40.0], 1, 0),
            ],
            vec![],
        );
        let expr = Expr::func("anomaly", vec![Expr::metric("app.*")])
            .with_named("threshold", Expr::constant(10.0));

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "app.b");
    }

    #[test]
    fn stale_detectors_are_ignored() {
        // present early, absent within the trailing offset second
        let data = bag(
            vec![Series::of_values("app.a", &[1.0, 2.0], 1, 0)],
            vec![detector("app.a", &[1.0, f64::NAN])],
        );
        let expr = Expr::func("anomaly", vec![Expr::metric("app.*")]);

        let out = eval(&expr, &data).unwrap();
        let names: Vec<&str> = out.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["app.a"]);
    }

    #[test]
    fn detector_series_in_the_bag_keep_their_raw_names() {
        let data = bag(
            vec![Series::of_values("app.a", &[1.0, 2.0], 1, 0)],
            vec![detector("app.a", &[0.0, 1.0])],
        );
        let expr = Expr::func("anomaly", vec![Expr::metric("app.*")]);
        eval(&expr, &data).unwrap();

        let stored = &data[&MetricRequest::new(format!("{PREFIX}app.*"), 0, 2)];
        assert_eq!(stored[0].name, format!("{PREFIX}app.a"));
    }
}
