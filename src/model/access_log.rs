//! Access-log wire record
//!
//! Emitted once per completed request by the surrounding service. The
//! evaluation engine never consumes it; it is carried here because the field
//! set is part of the API's external contract.

use serde::{Deserialize, Serialize};

/// Flat per-request access-log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessLogDetails {
    /// Handler that served the request (render, find, info, ...)
    pub handler: String,
    /// Request id assigned by the service
    pub request_id: String,
    /// Authenticated user, if any
    pub username: String,
    /// Full request URL
    pub url: String,
    /// Client address
    pub peer_ip: String,
    /// Client port
    pub peer_port: String,
    /// Host header
    pub host: String,
    /// Referer header
    pub referer: String,
    /// Response format (json, png, ...)
    pub format: String,
    /// Whether the response cache was consulted
    pub use_cache: bool,
    /// Query targets as written by the client
    pub targets: Vec<String>,
    /// Cache TTL applied to the response, seconds
    pub cache_timeout: i32,
    /// Metric patterns resolved during evaluation
    pub metrics: Vec<String>,
    /// True when some targets failed but the request still succeeded
    pub have_non_fatal_errors: bool,
    /// Wall-clock handling time, seconds
    pub runtime: f64,
    /// HTTP status code returned
    pub http_code: i32,
    /// Bytes received from the backend fetch layer
    pub backend_response_size_bytes: i64,
    /// Bytes sent to the client
    pub response_size_bytes: i64,
    /// Failure reason, empty on success
    pub reason: String,
    /// Whether glob patterns were forwarded to the backend unexpanded
    pub send_globs: bool,
    /// Parsed window start, epoch seconds
    pub from: i64,
    /// Parsed window end, epoch seconds
    pub until: i64,
    /// Timezone the window was parsed in
    pub tz: String,
    /// Raw `from` query parameter
    pub from_raw: String,
    /// Raw `until` query parameter
    pub until_raw: String,
    /// Request URI path
    pub uri: String,
    /// True when the response was served from cache
    pub from_cache: bool,
    /// Number of backend requests issued
    pub backend_requests: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_round_trip() {
        let record = AccessLogDetails {
            handler: "render".to_string(),
            http_code: 200,
            targets: vec!["pow(a.b.c,2)".to_string()],
            runtime: 0.042,
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: AccessLogDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
