//! Supporting algorithms shared by the function library

pub mod statsd;

/// Render a float the way it appears in generated series names: integral
/// values without a trailing `.0`.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Percentile of a sample, optionally interpolating between ranks.
///
/// Returns `None` for an empty sample or a percent outside `[0, 100]`.
/// With `interpolate`, a fractional rank blends the two neighboring sorted
/// values; without it, the floor rank is taken as-is.
pub fn percentile(values: &[f64], percent: f64, interpolate: bool) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&percent) {
        return None;
    }
    if values.len() == 1 {
        return Some(values[0]);
    }

    let mut sorted = values.to_vec();
    // total_cmp keeps NaN samples from poisoning the sort; they rank last
    sorted.sort_by(f64::total_cmp);

    let k = (sorted.len() - 1) as f64 * percent / 100.0;
    let index = k.floor() as usize;
    let fraction = k - k.floor();
    if !interpolate || fraction <= 0.0 {
        return Some(sorted[index]);
    }
    Some(sorted[index] + (sorted[index + 1] - sorted[index]) * fraction)
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, b'.' | b'-' | b'_' | b':' | b'#' | b'*' | b'?' | b'[' | b']' | b'%' | b'@')
}

/// Recover the bare dotted metric path from a decorated series name.
///
/// `divideSeriesLists(app.req.rate,app.req.total)` yields `app.req.rate`:
/// the first maximal run of metric-name characters terminated by `,` or `)`.
/// Brace groups (`{a,b}` globs) keep their inner commas.
pub fn extract_metric(name: &str) -> &str {
    let bytes = name.as_bytes();
    let mut start = 0;
    let mut end = 0;
    let mut braces = 0;
    while end < bytes.len() {
        match bytes[end] {
            b'{' => braces += 1,
            b'}' => braces -= 1,
            b')' => return &name[start..end],
            b',' if braces == 0 => return &name[start..end],
            b',' => {}
            c if !is_name_char(c) => start = end + 1,
            _ => {}
        }
        end += 1;
    }
    &name[start..end]
}

/// Lookup key for the plain hash alias scheme: last dotted path segment of
/// the metric, with any argument decoration and trailing parens stripped.
pub fn prepare_metric(metric: &str) -> &str {
    let last = metric.rsplit('.').next().unwrap_or(metric);
    let prefix = last.split(',').next().unwrap_or(last);
    prefix.trim_matches(')')
}

/// Name, lookup key and display suffix for the kube hash alias scheme.
///
/// The dotted path is position-significant: segment 4 is the node, 6 the
/// object name, 7 the item; everything past 7 is carried over verbatim as
/// the display suffix.
pub fn prepare_kube_metric(metric: &str) -> (String, String, String) {
    let parts: Vec<&str> = metric.split('.').collect();
    let mut suffix = String::new();
    let mut name = String::new();
    let mut item = "";
    let mut key = String::new();

    if parts.len() > 8 {
        suffix = format!(".{}", parts[8..].join("."));
    }
    if parts.len() == 8 {
        suffix = format!(".{}", parts[7]);
    }
    if parts.len() > 7 {
        item = parts[7];
    }
    if parts.len() > 6 {
        name = parts[6].to_string();
    }
    if parts.len() > 4 {
        key = format!("{}_{}", parts[4], item);
    }
    (name, key, suffix)
}
