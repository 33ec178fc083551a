//! Count-weighted averages for statsd timer aggregates.
//!
//! Works on statsd timer aggregates: each value series is paired with its
//! `.count` companion, groups are formed from dotted-path nodes, and every
//! group collapses to one series of count-weighted averages.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationError, EvaluationResult, Evaluator};
use crate::helper::statsd::{self, COUNT_SUFFIX};
use crate::helper::{extract_metric, format_number};
use crate::model::{DataBag, MetricRequest, Series};
use crate::registry::{FunctionDescription, FunctionMetadata, FunctionParam, ParamType, QueryFunction};

struct WeightedAverage;

/// Bindings for this module.
pub fn new(_config: &EngineConfig) -> Vec<FunctionMetadata> {
    vec![FunctionMetadata::new(
        "weightedAverageByFilteredCount",
        Arc::new(WeightedAverage),
    )]
}

fn agg_key(name: &str, fields: &[i64]) -> String {
    let metric = extract_metric(name);
    let nodes: Vec<&str> = metric.split('.').collect();
    let picked: Vec<&str> = fields
        .iter()
        .filter_map(|f| usize::try_from(*f).ok().and_then(|i| nodes.get(i).copied()))
        .collect();
    picked.join(".")
}

fn group_by_key<'a>(series: &'a [Series], fields: &[i64]) -> FxHashMap<String, Vec<&'a Series>> {
    let mut groups: FxHashMap<String, Vec<&Series>> = FxHashMap::default();
    for s in series {
        groups.entry(agg_key(&s.name, fields)).or_default().push(s);
    }
    groups
}

fn trimmed_suffix_map<'a>(series: &[&'a Series], suffix: &str) -> FxHashMap<String, &'a Series> {
    series
        .iter()
        .map(|s| {
            let metric = extract_metric(&s.name);
            let key = metric.strip_suffix(suffix).unwrap_or(metric).to_string();
            (key, *s)
        })
        .collect()
}

fn do_group(
    series: &[&Series],
    counts: &[&Series],
    suffix: &str,
    group: &str,
    threshold: f64,
) -> EvaluationResult<Series> {
    let series_map = trimmed_suffix_map(series, suffix);
    let count_map = trimmed_suffix_map(counts, COUNT_SUFFIX);

    let mut r = series[0].clone_shape(format!(
        "weightedAverageByFilteredCount({group}, {})",
        format_number(threshold)
    ));

    for (key, s) in &series_map {
        let Some(cnt) = count_map.get(key) else { continue };
        if cnt.step_time != s.step_time || cnt.len() != s.len() || s.len() != r.len() {
            return Err(EvaluationError::ShapeMismatch {
                left: s.name.clone(),
                right: cnt.name.clone(),
            });
        }
    }

    // Total weight includes every count series in the group, matched or not.
    let mut sum_count = vec![0.0; r.len()];
    for cnt in counts {
        for i in 0..cnt.len().min(sum_count.len()) {
            if !cnt.is_absent[i] {
                sum_count[i] += cnt.values[i];
            }
        }
    }

    for i in 0..r.len() {
        let mut acc = 0.0;
        let mut absent = true;
        for (key, s) in &series_map {
            let Some(cnt) = count_map.get(key) else { continue };
            if !cnt.is_absent[i] && !s.is_absent[i] {
                acc += cnt.values[i] * s.values[i];
                absent = false;
            }
        }
        if absent || sum_count[i] == 0.0 {
            r.is_absent[i] = true;
        } else {
            r.values[i] = acc / sum_count[i];
        }
    }
    Ok(r)
}

impl QueryFunction for WeightedAverage {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let series_list = evaluator.get_series_arg(expr.get_arg(0)?, from, until, data)?;
        if series_list.is_empty() {
            return Ok(Vec::new());
        }

        let threshold = expr.get_float_arg(1)?;
        let fields = expr.get_int_args(2)?;

        // The .count companion is derived from the innermost fetched pattern,
        // not from whatever wrapper produced the value series.
        let mut e0 = expr.get_arg(0)?;
        while e0.is_func() {
            e0 = e0.get_arg(0)?;
        }
        let target = e0.target();
        let suffix = statsd::get_suffix(target);
        let cnt_target = statsd::count_suffix_metric(target);

        let mut counts = data
            .get(&MetricRequest::new(&cnt_target, from, until))
            .cloned()
            .ok_or_else(|| EvaluationError::SeriesNotFound {
                metric: cnt_target.clone(),
            })?;

        if threshold > 0.0 {
            counts.retain(|s| {
                s.values
                    .iter()
                    .zip(&s.is_absent)
                    .any(|(v, absent)| !absent && *v > threshold)
            });
        }
        if counts.is_empty() {
            return Err(EvaluationError::InvalidOperation {
                message: format!("no {cnt_target} series left after threshold {threshold}"),
            });
        }

        let series_groups = group_by_key(&series_list, &fields);
        let count_groups = group_by_key(&counts, &fields);

        let mut keys: Vec<&String> = series_groups.keys().collect();
        keys.sort();

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let series = &series_groups[key];
            let Some(group_counts) = count_groups.get(key) else { continue };
            results.push(do_group(series, group_counts, suffix, key, threshold)?);
        }
        Ok(results)
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let mut docs = FxHashMap::default();
        docs.insert(
            "weightedAverageByFilteredCount".to_string(),
            FunctionDescription {
                name: "weightedAverageByFilteredCount".to_string(),
                description: "Works for statsd 'ms' aggregated metrics. Takes a seriesList and \
                              a threshold, pairs each series with its .count companion, and \
                              computes a count-weighted average per subgroup defined by the \
                              node positions."
                    .to_string(),
                function: "weightedAverageByFilteredCount(seriesList, threshold, *nodes)"
                    .to_string(),
                group: "Combine".to_string(),
                module: "graphite.render.functions".to_string(),
                params: vec![
                    FunctionParam::required("seriesList", ParamType::SeriesList),
                    FunctionParam::required("threshold", ParamType::Float).with_default(0.0),
                    FunctionParam::optional("position", ParamType::Node).multiple(),
                ],
            },
        );
        docs
    }
}
