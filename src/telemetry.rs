//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder; without one, every metric
//! call is a no-op.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `docbox_admin_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `method`: HTTP method (e.g. "GET", "POST")
//! - `status`: outcome: "ok" or "error" (HTTP metrics use the status code)
//! - `mutation`: mutation name (e.g. "create_tenant")

/// Total HTTP requests issued by the request layer.
///
/// Labels: `method`, `status` (status code, or "unreachable").
pub const HTTP_REQUESTS_TOTAL: &str = "docbox_admin_http_requests_total";

/// HTTP round-trip duration in seconds.
///
/// Labels: `method`.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "docbox_admin_http_request_duration_seconds";

/// Completed cache fetches.
///
/// Labels: `status` ("ok" | "error").
pub const QUERY_FETCHES_TOTAL: &str = "docbox_admin_query_fetches_total";

/// Fetch requests that attached to an in-flight fetch instead of starting one.
pub const QUERY_DEDUP_TOTAL: &str = "docbox_admin_query_dedup_total";

/// Read retry attempts (not counting the initial fetch).
pub const QUERY_RETRIES_TOTAL: &str = "docbox_admin_query_retries_total";

/// Cache entries marked stale by invalidation.
pub const INVALIDATIONS_TOTAL: &str = "docbox_admin_invalidations_total";

/// Executed mutations.
///
/// Labels: `mutation`, `status` ("ok" | "error").
pub const MUTATIONS_TOTAL: &str = "docbox_admin_mutations_total";
