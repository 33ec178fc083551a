//! Paired series-list arithmetic
//!
//! One implementation serves `divideSeriesLists`, `diffSeriesLists`,
//! `multiplySeriesLists` and `powSeriesLists`, dispatching on the invoked
//! name. Pairing is by series name or by position; a numeric `default`
//! argument turns a missing side into a constant.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::evaluator::{EvaluationError, EvaluationResult, Evaluator};
use crate::helper::format_number;
use crate::model::{DataBag, Series};
use crate::registry::{FunctionDescription, FunctionMetadata, FunctionParam, ParamType, QueryFunction};

const NAMES: [&str; 4] = [
    "divideSeriesLists",
    "diffSeriesLists",
    "multiplySeriesLists",
    "powSeriesLists",
];

struct SeriesListArithmetic;

/// Bindings for this module: four names, one implementation.
pub fn new(_config: &EngineConfig) -> Vec<FunctionMetadata> {
    let implementation: Arc<dyn QueryFunction> = Arc::new(SeriesListArithmetic);
    NAMES
        .iter()
        .map(|n| FunctionMetadata::new(*n, implementation.clone()))
        .collect()
}

fn compute_for(target: &str) -> fn(f64, f64) -> f64 {
    match target {
        "divideSeriesLists" => |l, r| l / r,
        "multiplySeriesLists" => |l, r| l * r,
        "diffSeriesLists" => |l, r| l - r,
        _ => |l: f64, r: f64| l.powf(r),
    }
}

impl SeriesListArithmetic {
    /// Resolve one side, treating the soft not-found condition as an empty
    /// list when a constant default can stand in for it.
    fn side(
        evaluator: &Evaluator,
        expr: &Expr,
        n: usize,
        from: i64,
        until: i64,
        data: &DataBag,
        has_default: bool,
    ) -> EvaluationResult<Vec<Series>> {
        match evaluator.get_series_arg(expr.get_arg(n)?, from, until, data) {
            Ok(series) => Ok(series),
            Err(err) if err.is_series_not_found() && has_default => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn against_constant(
        target: &str,
        series: &[Series],
        constant: f64,
        series_is_denominator: bool,
    ) -> Vec<Series> {
        let is_division = target == "divideSeriesLists";
        let compute = compute_for(target);
        let mut results = Vec::with_capacity(series.len());
        for s in series {
            let name = if series_is_denominator {
                format!("{target}({},{})", format_number(constant), s.name)
            } else {
                format!("{target}({},{})", s.name, format_number(constant))
            };
            let mut r = s.clone_shape(name);
            for i in 0..s.len() {
                if s.is_absent[i] {
                    r.is_absent[i] = true;
                    continue;
                }
                let (l, rhs) = if series_is_denominator {
                    (constant, s.values[i])
                } else {
                    (s.values[i], constant)
                };
                if is_division && rhs == 0.0 {
                    r.is_absent[i] = true;
                    continue;
                }
                r.values[i] = compute(l, rhs);
            }
            results.push(r);
        }
        results
    }
}

impl QueryFunction for SeriesListArithmetic {
    fn evaluate(
        &self,
        evaluator: &Evaluator,
        expr: &Expr,
        from: i64,
        until: i64,
        data: &DataBag,
    ) -> EvaluationResult<Vec<Series>> {
        let target = expr.target().to_string();
        let default_value = expr.get_float_named_or_pos_opt("default", 3)?;
        let has_default = default_value.is_some();

        let numerators = Self::side(evaluator, expr, 0, from, until, data, has_default)?;
        let numerators_missing = numerators.is_empty();
        if numerators_missing && !has_default {
            return Ok(Vec::new());
        }

        // If both sides are gone the default cannot rescue the call.
        let denominators =
            Self::side(evaluator, expr, 1, from, until, data, has_default && !numerators_missing)?;
        if denominators.is_empty() && numerators_missing {
            return Ok(Vec::new());
        }
        if numerators_missing {
            if let Some(constant) = default_value {
                return Ok(Self::against_constant(&target, &denominators, constant, true));
            }
            return Ok(Vec::new());
        }
        if denominators.is_empty() {
            match default_value {
                Some(constant) => {
                    return Ok(Self::against_constant(&target, &numerators, constant, false));
                }
                None => return Ok(Vec::new()),
            }
        }

        // Implicit pairing mode: names, unless the list sizes already agree
        // (or a single denominator broadcasts to every numerator).
        let size_match = denominators.len() == numerators.len() || denominators.len() == 1;
        let use_matching = expr.get_bool_named_or_pos_default("matching", 2, !size_match)?;

        let is_division = target == "divideSeriesLists";
        let compute = compute_for(&target);

        let denom_by_name: FxHashMap<&str, &Series> = if use_matching {
            denominators.iter().map(|s| (s.name.as_str(), s)).collect()
        } else {
            FxHashMap::default()
        };

        let mut results = Vec::with_capacity(numerators.len());
        for (i, numerator) in numerators.iter().enumerate() {
            let pair = if use_matching {
                let found = denom_by_name.get(numerator.name.as_str()).copied();
                if found.is_none() && default_value.is_none() {
                    continue;
                }
                found
            } else if denominators.len() == 1 {
                Some(&denominators[0])
            } else {
                match denominators.get(i) {
                    Some(d) => Some(d),
                    None => {
                        return Err(EvaluationError::InvalidOperation {
                            message: format!(
                                "{target}: positional pairing needs equal-length lists, got {} vs {}",
                                numerators.len(),
                                denominators.len()
                            ),
                        });
                    }
                }
            };

            if let Some(denominator) = pair {
                if numerator.step_time != denominator.step_time
                    || numerator.len() != denominator.len()
                {
                    return Err(EvaluationError::ShapeMismatch {
                        left: numerator.name.clone(),
                        right: denominator.name.clone(),
                    });
                }
            }

            // An unmatched numerator only survives the skip above when a
            // default exists, so the fallback constant is always present here.
            let fallback = default_value.unwrap_or(0.0);
            let denom_name = match pair {
                Some(d) => d.name.clone(),
                None => format_number(fallback),
            };
            let mut r =
                numerator.clone_shape(format!("{target}({},{denom_name})", numerator.name));

            for i in 0..numerator.len() {
                let denom_absent = pair.is_some_and(|d| d.is_absent[i]);
                if numerator.is_absent[i] || denom_absent {
                    r.is_absent[i] = true;
                    continue;
                }
                let denom_value = match pair {
                    Some(d) => d.values[i],
                    None => fallback,
                };
                if is_division && denom_value == 0.0 {
                    r.is_absent[i] = true;
                    continue;
                }
                r.values[i] = compute(numerator.values[i], denom_value);
            }
            results.push(r);
        }
        Ok(results)
    }

    fn describe(&self) -> FxHashMap<String, FunctionDescription> {
        let entries = [
            (
                "divideSeriesLists",
                "Iterates over two series lists and divides each pair pointwise. Pairs are \
                 matched by name, or by position when the lists already align.",
                "divideSeriesLists(dividendSeriesList, divisorSeriesList)",
            ),
            (
                "diffSeriesLists",
                "Iterates over two series lists and subtracts each pair pointwise.",
                "diffSeriesLists(firstSeriesList, secondSeriesList)",
            ),
            (
                "multiplySeriesLists",
                "Iterates over two series lists and multiplies each pair pointwise.",
                "multiplySeriesLists(sourceSeriesList, factorSeriesList)",
            ),
            (
                "powSeriesLists",
                "Iterates over two series lists and raises each pair pointwise.",
                "powSeriesLists(sourceSeriesList, factorSeriesList)",
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
                    group: "Combine".to_string(),
                    module: "graphite.render.functions.custom".to_string(),
                    params: vec![
                        FunctionParam::required("firstSeriesList", ParamType::SeriesList),
                        FunctionParam::required("secondSeriesList", ParamType::SeriesList),
                        FunctionParam::optional("matching", ParamType::Boolean),
                        FunctionParam::optional("default", ParamType::Float),
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

    fn eval(expr: &Expr, data: &DataBag) -> EvaluationResult<Vec<Series>> {
        let mut registry = FunctionRegistry::new();
        registry.register_builtins(&EngineConfig::default());
        let evaluator = Evaluator::new(&registry);
        evaluator.eval(expr, 0, 2, data)
    }

    fn bag(entries: Vec<(&str, Vec<Series>)>) -> DataBag {
        entries
            .into_iter()
            .map(|(m, s)| (MetricRequest::new(m, 0, 2), s))
            .collect()
    }

    #[test]
    fn divide_by_zero_yields_an_absent_point() {
        let data = bag(vec![
            ("A", vec![Series::of_values("A", &[10.0, 20.0], 1, 0)]),
            ("B", vec![Series::of_values("B", &[2.0, 0.0], 1, 0)]),
        ]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![Expr::metric("A"), Expr::metric("B")],
        );

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "divideSeriesLists(A,B)");
        assert_eq!(out[0].values[0], 5.0);
        assert_eq!(out[0].is_absent, vec![false, true]);
    }

    #[test]
    fn absence_on_either_side_propagates() {
        let data = bag(vec![
            ("A", vec![Series::of_values("A", &[10.0, f64::NAN], 1, 0)]),
            ("B", vec![Series::of_values("B", &[f64::NAN, 4.0], 1, 0)]),
        ]);
        let expr = Expr::func(
            "multiplySeriesLists",
            vec![Expr::metric("A"), Expr::metric("B")],
        );

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out[0].is_absent, vec![true, true]);
    }

    #[test]
    fn diff_and_pow_apply_their_operators() {
        let data = bag(vec![
            ("A", vec![Series::of_values("A", &[10.0, 3.0], 1, 0)]),
            ("B", vec![Series::of_values("B", &[4.0, 2.0], 1, 0)]),
        ]);

        let out = eval(
            &Expr::func("diffSeriesLists", vec![Expr::metric("A"), Expr::metric("B")]),
            &data,
        )
        .unwrap();
        assert_eq!(out[0].values, vec![6.0, 1.0]);
        assert_eq!(out[0].name, "diffSeriesLists(A,B)");

        let out = eval(
            &Expr::func("powSeriesLists", vec![Expr::metric("A"), Expr::metric("B")]),
            &data,
        )
        .unwrap();
        assert_eq!(out[0].values, vec![10_000.0, 9.0]);
    }

    #[test]
    fn single_denominator_broadcasts_to_all_numerators() {
        let data = bag(vec![
            (
                "num.*",
                vec![
                    Series::of_values("num.a", &[10.0, 20.0], 1, 0),
                    Series::of_values("num.b", &[30.0, 40.0], 1, 0),
                ],
            ),
            ("den", vec![Series::of_values("den", &[10.0, 10.0], 1, 0)]),
        ]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![Expr::metric("num.*"), Expr::metric("den")],
        );

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].values, vec![1.0, 2.0]);
        assert_eq!(out[1].values, vec![3.0, 4.0]);
    }

    #[test]
    fn mismatched_sizes_fall_back_to_name_matching() {
        let data = bag(vec![
            (
                "rate.*",
                vec![
                    Series::of_values("host1", &[4.0, 6.0], 1, 0),
                    Series::of_values("host2", &[8.0, 10.0], 1, 0),
                ],
            ),
            (
                "total.*",
                vec![
                    Series::of_values("host2", &[2.0, 5.0], 1, 0),
                    Series::of_values("host1", &[4.0, 3.0], 1, 0),
                    Series::of_values("host3", &[1.0, 1.0], 1, 0),
                ],
            ),
        ]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![Expr::metric("rate.*"), Expr::metric("total.*")],
        );

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "divideSeriesLists(host1,host1)");
        assert_eq!(out[0].values, vec![1.0, 2.0]);
        assert_eq!(out[1].name, "divideSeriesLists(host2,host2)");
        assert_eq!(out[1].values, vec![4.0, 2.0]);
    }

    #[test]
    fn unmatched_numerator_without_default_is_dropped() {
        let data = bag(vec![
            (
                "rate.*",
                vec![
                    Series::of_values("host1", &[4.0], 1, 0),
                    Series::of_values("lonely", &[9.0], 1, 0),
                ],
            ),
            (
                "total.*",
                vec![
                    Series::of_values("host1", &[2.0], 1, 0),
                    Series::of_values("host2", &[2.0], 1, 0),
                    Series::of_values("host3", &[2.0], 1, 0),
                ],
            ),
        ]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![Expr::metric("rate.*"), Expr::metric("total.*")],
        );

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "divideSeriesLists(host1,host1)");
    }

    #[test]
    fn missing_denominator_with_default_becomes_constant_division() {
        let data = bag(vec![(
            "A",
            vec![Series::of_values("A", &[8.0, 12.0], 1, 0)],
        )]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![
                Expr::metric("A"),
                Expr::metric("missing"),
                Expr::boolean(false),
                Expr::constant(4.0),
            ],
        );

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "divideSeriesLists(A,4)");
        assert_eq!(out[0].values, vec![2.0, 3.0]);
    }

    #[test]
    fn missing_numerator_with_default_treats_default_as_dividend() {
        let data = bag(vec![(
            "B",
            vec![Series::of_values("B", &[2.0, 0.0], 1, 0)],
        )]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![Expr::metric("missing"), Expr::metric("B")],
        )
        .with_named("default", Expr::constant(10.0));

        let out = eval(&expr, &data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "divideSeriesLists(10,B)");
        assert_eq!(out[0].values[0], 5.0);
        // zero denominator point stays absent even against a constant
        assert_eq!(out[0].is_absent, vec![false, true]);
    }

    #[test]
    fn missing_side_without_default_propagates_not_found() {
        let data = bag(vec![(
            "A",
            vec![Series::of_values("A", &[1.0], 1, 0)],
        )]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![Expr::metric("A"), Expr::metric("missing")],
        );
        assert!(eval(&expr, &data).unwrap_err().is_series_not_found());
    }

    #[test]
    fn shape_mismatch_is_a_hard_error() {
        let data = bag(vec![
            ("A", vec![Series::of_values("A", &[1.0, 2.0], 1, 0)]),
            ("B", vec![Series::of_values("B", &[1.0, 2.0, 3.0], 1, 0)]),
        ]);
        let expr = Expr::func(
            "divideSeriesLists",
            vec![Expr::metric("A"), Expr::metric("B")],
        );
        assert_eq!(
            eval(&expr, &data).unwrap_err(),
            EvaluationError::ShapeMismatch {
                left: "A".to_string(),
                right: "B".to_string()
            }
        );
    }
}
