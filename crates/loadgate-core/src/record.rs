//! Typed per-endpoint statistics read from a results artifact.

use serde::Serialize;
use thiserror::Error;

/// Row name the traffic generator uses for its synthetic all-endpoints row.
pub const AGGREGATE_ROW_NAME: &str = "Aggregated";

/// Reasons a [`MetricRecord`] cannot be constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("failure count {failures} exceeds request count {requests}")]
    FailuresExceedRequests { requests: u64, failures: u64 },

    #[error("{field} must be a finite, non-negative duration (got {value})")]
    InvalidDuration { field: &'static str, value: f64 },

    #[error("failure rate {0} is outside 0-100")]
    FailureRateOutOfRange(f64),
}

/// Response-time distribution of one endpoint, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub average_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencyStats {
    fn check(&self) -> Result<(), RecordError> {
        let fields = [
            ("min_ms", self.min_ms),
            ("max_ms", self.max_ms),
            ("average_ms", self.average_ms),
            ("median_ms", self.median_ms),
            ("p95_ms", self.p95_ms),
            ("p99_ms", self.p99_ms),
        ];

        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(RecordError::InvalidDuration { field, value });
            }
        }

        // min <= average <= max is deliberately not checked; source data may violate it.
        Ok(())
    }
}

/// Observed statistics for one (endpoint name, HTTP method) pair.
///
/// `failure_rate_pct` is carried exactly as the source artifact reported it and
/// may disagree slightly with `failure_count / request_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    name: String,
    method: String,
    request_count: u64,
    failure_count: u64,
    #[serde(flatten)]
    latency: LatencyStats,
    failure_rate_pct: f64,
}

impl MetricRecord {
    /// Builds a record, enforcing `failure_count <= request_count`.
    ///
    /// The method is normalized to upper case.
    pub fn new(
        name: impl Into<String>,
        method: impl Into<String>,
        request_count: u64,
        failure_count: u64,
        latency: LatencyStats,
        failure_rate_pct: f64,
    ) -> Result<Self, RecordError> {
        let name = name.into();
        let method = method.into().to_ascii_uppercase();

        if name.is_empty() {
            return Err(RecordError::Empty("name"));
        }
        if method.is_empty() {
            return Err(RecordError::Empty("method"));
        }
        if failure_count > request_count {
            return Err(RecordError::FailuresExceedRequests {
                requests: request_count,
                failures: failure_count,
            });
        }
        latency.check()?;
        if !(0.0..=100.0).contains(&failure_rate_pct) {
            return Err(RecordError::FailureRateOutOfRange(failure_rate_pct));
        }

        Ok(Self {
            name,
            method,
            request_count,
            failure_count,
            latency,
            failure_rate_pct,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    pub fn min_ms(&self) -> f64 {
        self.latency.min_ms
    }

    pub fn max_ms(&self) -> f64 {
        self.latency.max_ms
    }

    pub fn average_ms(&self) -> f64 {
        self.latency.average_ms
    }

    pub fn median_ms(&self) -> f64 {
        self.latency.median_ms
    }

    pub fn p95_ms(&self) -> f64 {
        self.latency.p95_ms
    }

    pub fn p99_ms(&self) -> f64 {
        self.latency.p99_ms
    }

    /// Failure rate as reported by the source artifact (0-100).
    pub fn failure_rate_pct(&self) -> f64 {
        self.failure_rate_pct
    }
}

/// One data row of a results artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactRow {
    /// Statistics for a single endpoint/method pair.
    Endpoint(MetricRecord),
    /// The generator's combined row; never processed per endpoint.
    Aggregate,
}

impl ArtifactRow {
    /// Returns the per-endpoint record, or `None` for the aggregate row.
    pub fn into_record(self) -> Option<MetricRecord> {
        match self {
            Self::Endpoint(record) => Some(record),
            Self::Aggregate => None,
        }
    }
}
