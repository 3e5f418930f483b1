//! Parse → aggregate → validate pipeline entry point.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{aggregate, Summary};
use crate::error::CoreResult;
use crate::parser::{RowPolicy, StatsParser};
use crate::record::MetricRecord;
use crate::threshold::ThresholdSet;
use crate::validator::{SlaValidator, Verdict};

/// Inputs of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub results_path: PathBuf,
    pub thresholds_path: PathBuf,
    pub row_policy: RowPolicy,
}

/// Everything one run computes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub records: Vec<MetricRecord>,
    pub summary: Summary,
    pub verdict: Verdict,
}

/// Runs the core pipeline over already-written artifacts.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parses the results artifact, loads thresholds, aggregates and validates.
    ///
    /// Any parse or load failure aborts the run before a [`Verdict`] exists.
    pub fn run(&self) -> CoreResult<PipelineOutcome> {
        let (records, summary) = self.summarize()?;
        let thresholds = ThresholdSet::load(&self.config.thresholds_path)?;

        let verdict = SlaValidator::new(&thresholds).validate(&records);
        info!(
            passed = verdict.passed(),
            violations = verdict.violations().len(),
            "SLA validation finished"
        );

        Ok(PipelineOutcome {
            records,
            summary,
            verdict,
        })
    }

    /// Parses and aggregates without validating.
    pub fn summarize(&self) -> CoreResult<(Vec<MetricRecord>, Summary)> {
        let records = StatsParser::new(&self.config.results_path)
            .with_policy(self.config.row_policy)
            .parse()?;

        let summary = aggregate(&records);
        debug!(
            total_requests = summary.total_requests,
            total_failures = summary.total_failures,
            "Aggregated run summary"
        );

        Ok((records, summary))
    }
}
