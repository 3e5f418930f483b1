//! Results artifact parser.
//!
//! Reads the per-endpoint statistics CSV written by the traffic generator and
//! turns every row except the aggregate row into a [`MetricRecord`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::record::{ArtifactRow, LatencyStats, MetricRecord, AGGREGATE_ROW_NAME};

/// Column names of the results artifact.
///
/// These follow the traffic generator's output schema. If the generator
/// renames a column, this is the only place that changes.
pub mod columns {
    pub const METHOD: &str = "Type";
    pub const NAME: &str = "Name";
    pub const REQUESTS: &str = "# requests";
    pub const FAILURES: &str = "# failures";
    pub const MEDIAN: &str = "Median";
    pub const AVERAGE: &str = "Average";
    pub const MIN: &str = "Min";
    pub const MAX: &str = "Max";
    pub const P95: &str = "95%";
    pub const P99: &str = "99%";
    pub const FAILURE_RATE: &str = "Failure Rate %";

    /// Every column a results artifact must carry.
    pub const REQUIRED: [&str; 11] = [
        METHOD,
        NAME,
        REQUESTS,
        FAILURES,
        MEDIAN,
        AVERAGE,
        MIN,
        MAX,
        P95,
        P99,
        FAILURE_RATE,
    ];
}

/// Name reported for rows whose bytes could not be decoded.
const UNREADABLE_ROW: &str = "<unreadable>";

/// What to do with a data row that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Stop at the first malformed row.
    #[default]
    Abort,
    /// Log the row and continue. Values are still never coerced.
    Skip,
}

/// Header positions of the required columns.
#[derive(Debug)]
struct ColumnIndex {
    method: usize,
    name: usize,
    requests: usize,
    failures: usize,
    median: usize,
    average: usize,
    min: usize,
    max: usize,
    p95: usize,
    p99: usize,
    failure_rate: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> CoreResult<Self> {
        let position = |column: &str| {
            headers.iter().position(|h| h == column).ok_or_else(|| {
                CoreError::malformed_record(
                    0,
                    "header",
                    format!("missing required column `{}`", column),
                )
            })
        };

        Ok(Self {
            method: position(columns::METHOD)?,
            name: position(columns::NAME)?,
            requests: position(columns::REQUESTS)?,
            failures: position(columns::FAILURES)?,
            median: position(columns::MEDIAN)?,
            average: position(columns::AVERAGE)?,
            min: position(columns::MIN)?,
            max: position(columns::MAX)?,
            p95: position(columns::P95)?,
            p99: position(columns::P99)?,
            failure_rate: position(columns::FAILURE_RATE)?,
        })
    }

    /// Classifies a raw row. The aggregate row is recognized before any of its
    /// numeric fields are read.
    fn classify(&self, row: usize, raw: &StringRecord) -> CoreResult<ArtifactRow> {
        let name = raw
            .get(self.name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CoreError::malformed_record(
                    row,
                    "<unnamed>",
                    format!("missing value for `{}`", columns::NAME),
                )
            })?;

        if name == AGGREGATE_ROW_NAME {
            return Ok(ArtifactRow::Aggregate);
        }

        let cells = RowCells { row, name, raw };
        let latency = LatencyStats {
            min_ms: cells.duration(self.min, columns::MIN)?,
            max_ms: cells.duration(self.max, columns::MAX)?,
            average_ms: cells.duration(self.average, columns::AVERAGE)?,
            median_ms: cells.duration(self.median, columns::MEDIAN)?,
            p95_ms: cells.duration(self.p95, columns::P95)?,
            p99_ms: cells.duration(self.p99, columns::P99)?,
        };

        let record = MetricRecord::new(
            name,
            cells.text(self.method, columns::METHOD)?,
            cells.count(self.requests, columns::REQUESTS)?,
            cells.count(self.failures, columns::FAILURES)?,
            latency,
            cells.duration(self.failure_rate, columns::FAILURE_RATE)?,
        )
        .map_err(|err| CoreError::malformed_record(row, name, err.to_string()))?;

        Ok(ArtifactRow::Endpoint(record))
    }
}

/// Field accessors for one data row that report failures against that row.
struct RowCells<'a> {
    row: usize,
    name: &'a str,
    raw: &'a StringRecord,
}

impl<'a> RowCells<'a> {
    fn text(&self, idx: usize, column: &str) -> CoreResult<&'a str> {
        self.raw
            .get(idx)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CoreError::malformed_record(
                    self.row,
                    self.name,
                    format!("missing value for `{}`", column),
                )
            })
    }

    fn count(&self, idx: usize, column: &str) -> CoreResult<u64> {
        let value = self.text(idx, column)?;
        value.parse::<u64>().map_err(|err| {
            CoreError::malformed_record(
                self.row,
                self.name,
                format!("invalid `{}` value `{}`: {}", column, value, err),
            )
        })
    }

    fn duration(&self, idx: usize, column: &str) -> CoreResult<f64> {
        let value = self.text(idx, column)?;
        value.parse::<f64>().map_err(|err| {
            CoreError::malformed_record(
                self.row,
                self.name,
                format!("invalid `{}` value `{}`: {}", column, value, err),
            )
        })
    }
}

/// Parser for results artifacts.
#[derive(Debug, Clone)]
pub struct StatsParser {
    path: PathBuf,
    policy: RowPolicy,
}

impl StatsParser {
    /// Creates a parser for the artifact at `path` using [`RowPolicy::Abort`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: RowPolicy::default(),
        }
    }

    /// Sets the malformed-row policy.
    pub fn with_policy(mut self, policy: RowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the artifact into records, preserving row order.
    pub fn parse(&self) -> CoreResult<Vec<MetricRecord>> {
        if !self.path.exists() {
            return Err(CoreError::ArtifactNotFound {
                path: self.path.clone(),
            });
        }

        let file = File::open(&self.path)?;
        let records = self.parse_reader(file)?;

        info!(
            path = %self.path.display(),
            records = records.len(),
            "Parsed results artifact"
        );
        Ok(records)
    }

    /// Parses artifact content from any reader.
    ///
    /// A missing required column is always fatal, whatever the row policy.
    pub fn parse_reader<R: Read>(&self, reader: R) -> CoreResult<Vec<MetricRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let index = ColumnIndex::from_headers(&headers)?;

        let mut records = Vec::new();
        let mut skipped = 0_usize;

        for (offset, result) in reader.records().enumerate() {
            let row = offset + 1;
            let classified = match result {
                Ok(raw) => index.classify(row, &raw),
                Err(err) if err.is_io_error() => return Err(err.into()),
                // Undecodable rows are consumed by the reader; later rows still parse.
                Err(err) => Err(CoreError::malformed_record(
                    row,
                    UNREADABLE_ROW,
                    err.to_string(),
                )),
            };

            match classified {
                Ok(ArtifactRow::Endpoint(record)) => records.push(record),
                Ok(ArtifactRow::Aggregate) => {
                    debug!(row, "Skipping aggregate row");
                }
                Err(err) => match self.policy {
                    RowPolicy::Abort => return Err(err),
                    RowPolicy::Skip => {
                        warn!(row, error = %err, "Skipping malformed row");
                        skipped += 1;
                    }
                },
            }
        }

        if skipped > 0 {
            warn!(skipped, "Malformed rows were excluded from the results");
        }

        Ok(records)
    }
}
