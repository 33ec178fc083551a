//! End-to-end evaluation through the public API: registry construction,
//! nested expression trees, and the soft-failure paths a render handler
//! relies on.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use graphite_expr::{
    DataBag, EngineConfig, Evaluator, Expr, FunctionRegistry, MemoryLookup, MetricRequest, Series,
};

fn builtin_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register_builtins(&EngineConfig::default());
    registry
}

#[test]
fn nested_calls_evaluate_inside_out() {
    let mut data = DataBag::default();
    data.insert(
        MetricRequest::new("app.hits", 0, 2),
        vec![Series::of_values("app.hits", &[10.0, 30.0], 1, 0)],
    );
    data.insert(
        MetricRequest::new("app.total", 0, 2),
        vec![Series::of_values("app.total", &[5.0, 0.0], 1, 0)],
    );

    // pow(divideSeriesLists(app.hits,app.total),2)
    let expr = Expr::func(
        "pow",
        vec![
            Expr::func(
                "divideSeriesLists",
                vec![Expr::metric("app.hits"), Expr::metric("app.total")],
            ),
            Expr::constant(2.0),
        ],
    );

    let registry = builtin_registry();
    let out = Evaluator::new(&registry).eval(&expr, 0, 2, &data).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "pow(divideSeriesLists(app.hits,app.total),2)");
    assert_eq!(out[0].values[0], 4.0);
    // the divide-by-zero point stays absent through the outer call
    assert_eq!(out[0].is_absent, vec![false, true]);
}

#[test]
fn aliasing_applies_to_computed_series() {
    let mut lookup = MemoryLookup::new();
    // the lookup key is the last dotted segment of the generated name
    // "pow(app.hits,2)", cut at the first comma and stripped of parens
    lookup.insert(0, "display", "hits", "hit ratio");

    let mut data = DataBag::default();
    data.insert(
        MetricRequest::new("app.hits", 0, 2),
        vec![Series::of_values("app.hits", &[10.0, 30.0], 1, 0)],
    );

    let mut registry = FunctionRegistry::new();
    registry.register_builtins_with_lookup(&EngineConfig::default(), Arc::new(lookup));

    let expr = Expr::func(
        "aliasByHash",
        vec![
            Expr::func("pow", vec![Expr::metric("app.hits"), Expr::constant(2.0)]),
            Expr::string("display"),
        ],
    );

    let out = Evaluator::new(&registry).eval(&expr, 0, 2, &data).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "hit ratio");
    assert_eq!(out[0].values, vec![100.0, 900.0]);
}

#[test]
fn missing_inner_series_surfaces_as_not_found() {
    let data = DataBag::default();
    let expr = Expr::func(
        "pow",
        vec![Expr::metric("no.such.metric"), Expr::constant(2.0)],
    );

    let registry = builtin_registry();
    let err = Evaluator::new(&registry)
        .eval(&expr, 0, 2, &data)
        .unwrap_err();
    assert!(err.is_series_not_found());
}

#[test]
fn evaluation_leaves_the_bag_reusable() {
    let mut data = DataBag::default();
    data.insert(
        MetricRequest::new("m", 0, 2),
        vec![Series::of_values("m", &[2.0, 4.0], 1, 0)],
    );
    let expr = Expr::func("pow", vec![Expr::metric("m"), Expr::constant(3.0)]);

    let registry = builtin_registry();
    let evaluator = Evaluator::new(&registry);
    let first = evaluator.eval(&expr, 0, 2, &data).unwrap();
    let second = evaluator.eval(&expr, 0, 2, &data).unwrap();
    assert_eq!(first, second);
    assert_eq!(data[&MetricRequest::new("m", 0, 2)][0].values, vec![2.0, 4.0]);
}

#[test]
fn registry_documentation_serializes_for_the_functions_endpoint() {
    let registry = builtin_registry();
    let docs = registry.describe_all();
    let json = serde_json::to_value(&docs).unwrap();

    assert_eq!(json["pow"]["function"], "pow(seriesList, factor)");
    assert_eq!(json["aliasByHash"]["group"], "Alias");
    assert!(json["baselineAberration"]["params"].is_array());
}
