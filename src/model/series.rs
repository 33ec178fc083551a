//! Series container and data-bag types

use rustc_hash::FxHashMap;

/// One named time-indexed float sequence with a parallel absence mask.
///
/// `is_absent[i] == true` means the value at index `i` carries no data and
/// must be ignored by all arithmetic, regardless of what `values[i]`
/// numerically holds. Absence is a side channel, never encoded in the float
/// itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Display name of the series
    pub name: String,
    /// Data points, one per step
    pub values: Vec<f64>,
    /// Absence mask, same length as `values`
    pub is_absent: Vec<bool>,
    /// Seconds per point
    pub step_time: i64,
    /// Epoch seconds of the first point
    pub start_time: i64,
    /// Epoch seconds one step past the last point
    pub stop_time: i64,
}

impl Series {
    /// Create a series from explicit values and absence mask.
    ///
    /// `stop_time` is derived from the point count. Panics if the mask length
    /// does not match the value length; the two sequences are one logical
    /// array.
    pub fn new(
        name: impl Into<String>,
        values: Vec<f64>,
        is_absent: Vec<bool>,
        step_time: i64,
        start_time: i64,
    ) -> Self {
        assert_eq!(values.len(), is_absent.len(), "values/is_absent length mismatch");
        let stop_time = start_time + step_time * values.len() as i64;
        Self {
            name: name.into(),
            values,
            is_absent,
            step_time,
            start_time,
            stop_time,
        }
    }

    /// Create a series from raw values where NaN marks an absent point.
    ///
    /// This is the conventional shape fetched data arrives in: backends emit
    /// NaN for missing samples and the mask is derived here, once, at the
    /// boundary.
    pub fn of_values(name: impl Into<String>, values: &[f64], step_time: i64, start_time: i64) -> Self {
        let is_absent: Vec<bool> = values.iter().map(|v| v.is_nan()).collect();
        let values = values
            .iter()
            .map(|v| if v.is_nan() { 0.0 } else { *v })
            .collect();
        Self::new(name, values, is_absent, step_time, start_time)
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series holds no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy time metadata into a fresh series with zeroed backing storage.
    ///
    /// Functions that transform a series must never mutate their input in
    /// place: the same underlying series may be an argument to multiple
    /// sibling calls sharing one data-bag entry. They clone the shape, then
    /// fill the new storage.
    pub fn clone_shape(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![0.0; self.values.len()],
            is_absent: vec![false; self.values.len()],
            step_time: self.step_time,
            start_time: self.start_time,
            stop_time: self.stop_time,
        }
    }

    /// Clone the series under a different name, keeping values intact.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        let mut s = self.clone();
        s.name = name.into();
        s
    }
}

/// Key used to look up already-fetched series in the data bag.
///
/// Equality is structural: same pattern, same window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricRequest {
    /// Metric name or glob pattern as written in the query
    pub metric: String,
    /// Window start, epoch seconds
    pub from: i64,
    /// Window end, epoch seconds
    pub until: i64,
}

impl MetricRequest {
    /// Build a request key for a pattern and window.
    pub fn new(metric: impl Into<String>, from: i64, until: i64) -> Self {
        Self {
            metric: metric.into(),
            from,
            until,
        }
    }
}

/// Pre-fetched raw series, keyed by request. Constructed once per top-level
/// query by the fetch layer; read-only for the whole evaluation tree. The
/// order of each inner list is the fetch layer's insertion order, which
/// positional pairing functions treat as significant.
pub type DataBag = FxHashMap<MetricRequest, Vec<Series>>;
