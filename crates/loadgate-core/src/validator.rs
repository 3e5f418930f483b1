//! SLA validation of per-endpoint records against thresholds.

use std::fmt;

use serde::Serialize;

use crate::record::MetricRecord;
use crate::threshold::ThresholdSet;

/// Which ceiling was breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    P95,
    ErrorRate,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P95 => write!(f, "p95"),
            Self::ErrorRate => write!(f, "error_rate"),
        }
    }
}

/// A single threshold breach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub endpoint: String,
    pub kind: ViolationKind,
    pub observed: f64,
    pub threshold: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::P95 => write!(
                f,
                "P95 breach: {} ({}ms > {}ms)",
                self.endpoint, self.observed, self.threshold
            ),
            ViolationKind::ErrorRate => write!(
                f,
                "Error rate breach: {} ({}% > {}%)",
                self.endpoint, self.observed, self.threshold
            ),
        }
    }
}

/// Outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    passed: bool,
    violations: Vec<Violation>,
}

impl Verdict {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    /// `true` when no threshold was breached.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Breaches in detection order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::from_violations(Vec::new())
    }
}

/// Compares records against a [`ThresholdSet`].
#[derive(Debug, Clone, Copy)]
pub struct SlaValidator<'a> {
    thresholds: &'a ThresholdSet,
}

impl<'a> SlaValidator<'a> {
    pub fn new(thresholds: &'a ThresholdSet) -> Self {
        Self { thresholds }
    }

    /// Validates records in order. For each record the p95 check runs before
    /// the error-rate check; both are strict `>` comparisons. Records whose
    /// name has no threshold are skipped.
    pub fn validate(&self, records: &[MetricRecord]) -> Verdict {
        let mut violations = Vec::new();

        for record in records {
            let Some(threshold) = self.thresholds.get(record.name()) else {
                continue;
            };

            if record.p95_ms() > threshold.p95_ms {
                violations.push(Violation {
                    endpoint: record.name().to_string(),
                    kind: ViolationKind::P95,
                    observed: record.p95_ms(),
                    threshold: threshold.p95_ms,
                });
            }

            if record.failure_rate_pct() > threshold.error_rate_pct {
                violations.push(Violation {
                    endpoint: record.name().to_string(),
                    kind: ViolationKind::ErrorRate,
                    observed: record.failure_rate_pct(),
                    threshold: threshold.error_rate_pct,
                });
            }
        }

        Verdict::from_violations(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LatencyStats;
    use crate::threshold::Threshold;

    fn record(name: &str, p95_ms: f64, failure_rate_pct: f64) -> MetricRecord {
        MetricRecord::new(
            name,
            "GET",
            100,
            failure_rate_pct as u64,
            LatencyStats {
                min_ms: 1.0,
                max_ms: 1000.0,
                average_ms: 20.0,
                median_ms: 15.0,
                p95_ms,
                p99_ms: p95_ms,
            },
            failure_rate_pct,
        )
        .unwrap()
    }

    fn thresholds() -> ThresholdSet {
        ThresholdSet::from_entries([(
            "GET /a",
            Threshold {
                p95_ms: 100.0,
                error_rate_pct: 1.0,
            },
        )])
    }

    #[test]
    fn test_single_p95_violation() {
        let set = thresholds();
        let verdict = SlaValidator::new(&set).validate(&[record("GET /a", 150.0, 0.0)]);

        assert!(!verdict.passed());
        assert_eq!(
            verdict.violations(),
            &[Violation {
                endpoint: "GET /a".to_string(),
                kind: ViolationKind::P95,
                observed: 150.0,
                threshold: 100.0,
            }]
        );
    }

    #[test]
    fn test_unmatched_endpoint_is_exempt() {
        let set = thresholds();
        let verdict = SlaValidator::new(&set).validate(&[record("GET /b", 99_999.0, 100.0)]);
        assert!(verdict.passed());
        assert!(verdict.violations().is_empty());
    }

    #[test]
    fn test_equal_values_pass() {
        let set = thresholds();
        let verdict = SlaValidator::new(&set).validate(&[record("GET /a", 100.0, 1.0)]);
        assert!(verdict.passed());
    }

    #[test]
    fn test_violation_order() {
        let set = ThresholdSet::from_entries([
            (
                "GET /a",
                Threshold {
                    p95_ms: 100.0,
                    error_rate_pct: 1.0,
                },
            ),
            (
                "GET /b",
                Threshold {
                    p95_ms: 100.0,
                    error_rate_pct: 1.0,
                },
            ),
        ]);

        // record order, not threshold order; p95 before error_rate
        let records = vec![record("GET /b", 101.0, 5.0), record("GET /a", 50.0, 2.0)];
        let verdict = SlaValidator::new(&set).validate(&records);

        let summary: Vec<(&str, ViolationKind)> = verdict
            .violations()
            .iter()
            .map(|v| (v.endpoint.as_str(), v.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("GET /b", ViolationKind::P95),
                ("GET /b", ViolationKind::ErrorRate),
                ("GET /a", ViolationKind::ErrorRate),
            ]
        );
    }

    #[test]
    fn test_violation_message() {
        let violation = Violation {
            endpoint: "GET /a".to_string(),
            kind: ViolationKind::ErrorRate,
            observed: 2.5,
            threshold: 1.0,
        };
        assert_eq!(violation.to_string(), "Error rate breach: GET /a (2.5% > 1%)");
        assert_eq!(ViolationKind::P95.to_string(), "p95");
    }

    #[test]
    fn test_empty_inputs_pass() {
        let set = ThresholdSet::new();
        assert!(SlaValidator::new(&set).validate(&[]).passed());
        assert!(Verdict::default().passed());
    }
}
