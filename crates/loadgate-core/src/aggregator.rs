//! Fleet-wide summary statistics.

use serde::Serialize;

use crate::record::MetricRecord;

/// Aggregate view over every endpoint of one run.
///
/// `p95_response_ms` and `p99_response_ms` are the worst (maximum) per-endpoint
/// percentiles, not percentiles recomputed over all requests.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    pub total_requests: u64,
    pub total_failures: u64,
    /// Share of successful requests (0-100); 0 when no requests were made.
    pub success_rate_pct: f64,
    /// Request-count-weighted mean of per-endpoint averages.
    pub avg_response_ms: f64,
    pub max_response_ms: f64,
    pub min_response_ms: f64,
    pub p95_response_ms: f64,
    pub p99_response_ms: f64,
}

/// Computes the [`Summary`] of a record sequence.
///
/// The empty sequence yields an all-zero summary.
pub fn aggregate(records: &[MetricRecord]) -> Summary {
    if records.is_empty() {
        return Summary::default();
    }

    // Counts saturate at u64::MAX instead of wrapping.
    let total_requests = saturating_total(records, MetricRecord::request_count);
    let total_failures = saturating_total(records, MetricRecord::failure_count);

    let (success_rate_pct, avg_response_ms) = if total_requests == 0 {
        (0.0, 0.0)
    } else {
        // Endpoints without requests add nothing to the weighted sum.
        let weighted_sum: f64 = records
            .iter()
            .map(|r| r.average_ms() * r.request_count() as f64)
            .sum();
        let succeeded = total_requests - total_failures;
        (
            succeeded as f64 / total_requests as f64 * 100.0,
            weighted_sum / total_requests as f64,
        )
    };

    Summary {
        total_requests,
        total_failures,
        success_rate_pct,
        avg_response_ms,
        max_response_ms: ceiling(records, MetricRecord::max_ms),
        min_response_ms: records
            .iter()
            .map(MetricRecord::min_ms)
            .fold(f64::INFINITY, f64::min),
        p95_response_ms: ceiling(records, MetricRecord::p95_ms),
        p99_response_ms: ceiling(records, MetricRecord::p99_ms),
    }
}

fn saturating_total(records: &[MetricRecord], count: fn(&MetricRecord) -> u64) -> u64 {
    records.iter().map(count).fold(0u64, u64::saturating_add)
}

fn ceiling(records: &[MetricRecord], metric: fn(&MetricRecord) -> f64) -> f64 {
    records.iter().map(metric).fold(f64::NEG_INFINITY, f64::max)
}
