//! Statsd aggregation-suffix handling
//!
//! Statsd timer metrics fan out into sibling paths per aggregate
//! (`app.req.mean`, `app.req.count`, ...). Functions that pair a value
//! series with its sample-count companion derive the `.count` path here.

/// Suffix of the sample-count companion metric.
pub const COUNT_SUFFIX: &str = ".count";

/// Aggregation suffixes statsd emits for timer metrics.
pub const STATSD_SUFFIXES: [&str; 11] = [
    ".last",
    ".min",
    ".max",
    ".sum",
    ".median",
    ".mean",
    ".percentile.75",
    ".percentile.95",
    ".percentile.98",
    ".percentile.99",
    ".percentile.999",
];

/// The known aggregation suffix carried by `name`, or empty.
pub fn get_suffix(name: &str) -> &'static str {
    STATSD_SUFFIXES
        .iter()
        .find(|s| name.ends_with(*s))
        .copied()
        .unwrap_or("")
}

/// Path of the `.count` companion for an aggregated metric name.
pub fn count_suffix_metric(name: &str) -> String {
    let suffix = get_suffix(name);
    format!("{}{}", name.strip_suffix(suffix).unwrap_or(name), COUNT_SUFFIX)
}
