//! Median-of-shifts seasonal baselines.
//!
//! Both names build, per series name, the pointwise median over the same
//! argument re-evaluated at a set of time-shifted windows. `baseline`
//! returns the median itself; `baselineAberration` divides the current
//! window by it.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::helper::percentile;
use crate::model::{DataBag, Series};
use crate::registry::{FunctionDescription, FunctionMetadata, FunctionParam, ParamType, QueryFunction};

struct Baselines;

/// Bindings for this module.
pub fn new(_config: &EngineConfig) -> Vec<FunctionMetadata> {
    let implementation: Arc<dyn QueryFunction> = Arc::new(Baselines);
    vec![
        FunctionMetadata::new("baseline", implementation.clone()),
        FunctionMetadata::new("baselineAberration", implementation),
    ]
}

impl Baselines {
    /// Evaluate the series argument over one window. A pattern with no
    /// fetched data contributes nothing rather than failing the call.
    fn resolve(
        evaluator: &Evaluator,
        source: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        match evaluator.get_series_arg(source, from, until, data) {
            Ok(series) => Ok(series),
            Err(err) if err.is_series_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}

impl QueryFunction for Baselines {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let is_aberration = expr.target() == "baselineAberration";
        let label = if is_aberration { "baselineAberration" } else { "baseline" };

        let source = expr.get_arg(0)?;
        // Unsigned units shift into the past.
        let unit = expr.get_interval_arg(1, -1)?;
        let start = expr.get_int_arg(2)?;
        let end = expr.get_int_arg(3)?;
        let max_absent_percent = expr.get_float_arg_opt(4)?;
        let min_avg_limit = expr.get_float_arg_opt(5)?;

        let current: FxHashMap<String, Series> =
            Self::resolve(evaluator, source, from, until, data)?
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect();

        // Re-evaluate the argument per shift and realign onto the current
        // window so indices line up across shifts.
        let mut groups: FxHashMap<String, Vec<Series>> = FxHashMap::default();
        for i in start..end {
            if i == 0 {
                continue;
            }
            let offs = i * unit;
            let shifted = Self::resolve(evaluator, source, from + offs, until + offs, data)?;
            for mut s in shifted {
                // Aberration is only meaningful where a current value exists
                // to divide.
                if is_aberration && !current.contains_key(&s.name) {
                    continue;
                }
                s.start_time -= offs;
                s.stop_time -= offs;
                groups.entry(s.name.clone()).or_default().push(s);
            }
        }

        let mut names: Vec<String> = groups.keys().cloned().collect();
        names.sort();

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let group = &groups[&name];
            let mut r = group[0].clone_shape(format!("{label}({name})"));

            let mut baseline_sum = 0.0;
            let mut baseline_points = 0usize;
            let mut baseline_absent = 0usize;

            for i in 0..r.len() {
                let mut sample = Vec::with_capacity(group.len());
                for s in group {
                    if i < s.len() && !s.is_absent[i] {
                        sample.push(s.values[i]);
                    }
                }
                match percentile(&sample, 50.0, true) {
                    None => {
                        r.is_absent[i] = true;
                        baseline_absent += 1;
                    }
                    Some(median) => {
                        baseline_sum += median;
                        baseline_points += 1;
                        if is_aberration {
                            match current.get(&name) {
                                Some(c) if i < c.len() && !c.is_absent[i] && median != 0.0 => {
                                    r.values[i] = c.values[i] / median;
                                }
                                _ => r.is_absent[i] = true,
                            }
                        } else {
                            r.values[i] = median;
                        }
                    }
                }
            }

            if let Some(max) = max_absent_percent {
                if !r.is_empty() && baseline_absent as f64 / r.len() as f64 * 100.0 > max {
                    continue;
                }
            }
            if let Some(min) = min_avg_limit {
                if baseline_points != 0 && baseline_sum / (baseline_points as f64) < min {
                    continue;
                }
            }
            results.push(r);
        }
        Ok(results)
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let entries = [
            (
                "baseline",
                "Pointwise median over time-shifted copies of the series: one copy per shift \
                 index in [start, end), each shifted by index times unit into the past. \
                 Series whose baseline is too sparse or too small on average can be dropped \
                 with the optional thresholds.",
                "baseline(seriesList, unit, start, end, maxAbsentPercent, minAvgLimit)",
            ),
            (
                "baselineAberration",
                "Current window divided pointwise by its baseline; only series present in \
                 the current window are reported.",
                "baselineAberration(seriesList, unit, start, end, maxAbsentPercent, minAvgLimit)",
            ),
        ];

        let mut docs = FxHashMap::default();
        for (name, description, signature) in entries {
            docs.insert(
                name.to_string(),
                FunctionDescription {
                    name: name.to_string(),
                    description: description.to_string(),
                    function: signature.to_string(),
                    group: "Transform".to_string(),
                    module: "graphite.render.functions.custom".to_string(),
                    params: vec![
                        FunctionParam::required("seriesList", ParamType::SeriesList),
                        FunctionParam::required("unit", ParamType::Interval),
                        FunctionParam::required("start", ParamType::Integer),
                        FunctionParam::required("end", ParamType::Integer),
                        FunctionParam::optional("maxAbsentPercent", ParamType::Float),
                        FunctionParam::optional("minAvgLimit", ParamType::Float),
                    ],
                },
            );
        }
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricRequest;
    use crate::registry::FunctionRegistry;
    use pretty_assertions::assert_eq;

    const WEEK: i64 = 7 * 86_400;

    fn eval(expr: &Expr, data: &DataBag, until: i64) -> EvaluationResult<Vec<Series>> {
        let mut registry = FunctionRegistry::new();
        registry.register_builtins(&EngineConfig::default());
        let evaluator = Evaluator::new(&registry);
        evaluator.eval(expr, 0, until, data)
    }

    fn shifted_bag(pattern: &str, until: i64, weekly: Vec<Vec<f64>>) -> DataBag {
        let mut data = DataBag::default();
        for (idx, values) in weekly.into_iter().enumerate() {
            let offs = -WEEK * (idx as i64 + 1);
            data.insert(
                MetricRequest::new(pattern, offs, until + offs),
                vec![Series::of_values(pattern, &values, 1, offs)],
            );
        }
        data
    }

    fn call(name: &str, extra: Vec<Expr>) -> Expr {
        let mut args = vec![
            Expr::metric("m"),
            Expr::string("1w"),
            Expr::constant(1.0),
            Expr::constant(4.0),
        ];
        args.extend(extra);
        Expr::func(name, args)
    }

    #[test]
    fn baseline_is_the_median_of_the_shifts() {
        let data = shifted_bag("m", 1, vec![vec![10.0], vec![30.0], vec![20.0]]);
        let out = eval(&call("baseline", vec![]), &data, 1).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "baseline(m)");
        assert_eq!(out[0].values, vec![20.0]);
        assert_eq!(out[0].is_absent, vec![false]);
    }

    #[test]
    fn nested_function_arguments_are_reevaluated_per_shift() {
        let data = shifted_bag("m", 1, vec![vec![10.0], vec![30.0], vec![20.0]]);
        let expr = Expr::func(
            "baseline",
            vec![
                Expr::func("pow", vec![Expr::metric("m"), Expr::constant(1.0)]),
                Expr::string("1w"),
                Expr::constant(1.0),
                Expr::constant(4.0),
            ],
        );

        let out = eval(&expr, &data, 1).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "baseline(pow(m,1))");
        assert_eq!(out[0].values, vec![20.0]);
    }

    #[test]
    fn baseline_skips_absent_shift_points() {
        let data = shifted_bag(
            "m",
            2,
            vec![
                vec![10.0, f64::NAN],
                vec![30.0, f64::NAN],
                vec![20.0, f64::NAN],
            ],
        );
        let out = eval(&call("baseline", vec![]), &data, 2).unwrap();
        assert_eq!(out[0].values[0], 20.0);
        assert_eq!(out[0].is_absent, vec![false, true]);
    }

    #[test]
    fn aberration_divides_current_by_baseline() {
        let mut data = shifted_bag(
            "m",
            2,
            vec![vec![0.0, 10.0], vec![0.0, 30.0], vec![0.0, 20.0]],
        );
        data.insert(
            MetricRequest::new("m", 0, 2),
            vec![Series::of_values("m", &[10.0, 40.0], 1, 0)],
        );

        let out = eval(&call("baselineAberration", vec![]), &data, 2).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "baselineAberration(m)");
        // zero baseline cannot be divided into
        assert_eq!(out[0].is_absent, vec![true, false]);
        assert_eq!(out[0].values[1], 2.0);
    }

    #[test]
    fn aberration_drops_series_absent_from_the_current_window() {
        let data = shifted_bag("m", 1, vec![vec![10.0], vec![30.0], vec![20.0]]);
        // no ("m", 0, 1) entry at all
        let out = eval(&call("baselineAberration", vec![]), &data, 1).unwrap();
        assert_eq!(out, vec![]);
        // plain baseline keeps working without a current window
        let out = eval(&call("baseline", vec![]), &data, 1).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn max_absent_percent_drops_sparse_baselines() {
        let data = shifted_bag(
            "m",
            2,
            vec![
                vec![10.0, f64::NAN],
                vec![30.0, f64::NAN],
                vec![20.0, f64::NAN],
            ],
        );
        let expr = call("baseline", vec![Expr::constant(40.0)]);
        assert_eq!(eval(&expr, &data, 2).unwrap(), vec![]);

        let lenient = call("baseline", vec![Expr::constant(60.0)]);
        assert_eq!(eval(&lenient, &data, 2).unwrap().len(), 1);
    }

    #[test]
    fn min_avg_limit_drops_small_baselines() {
        let data = shifted_bag("m", 1, vec![vec![10.0], vec![30.0], vec![20.0]]);
        let expr = call(
            "baseline",
            vec![Expr::constant(100.0), Expr::constant(50.0)],
        );
        assert_eq!(eval(&expr, &data, 1).unwrap(), vec![]);

        let lenient = call(
            "baseline",
            vec![Expr::constant(100.0), Expr::constant(5.0)],
        );
        assert_eq!(eval(&lenient, &data, 1).unwrap().len(), 1);
    }
}
