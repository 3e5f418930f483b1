//! Core of the loadgate SLA gate: results parsing, fleet aggregation and
//! per-endpoint threshold validation.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod threshold;
pub mod validator;

pub use aggregator::{aggregate, Summary};
pub use config::{
    AuthConfig, AuthKind, GateConfig, GeneratorConfig, ParsingConfig, PathsConfig, TargetConfig,
    RESULTS_FILE,
};
pub use error::{CoreError, CoreResult};
pub use parser::{RowPolicy, StatsParser};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutcome};
pub use record::{ArtifactRow, LatencyStats, MetricRecord, RecordError, AGGREGATE_ROW_NAME};
pub use threshold::{Threshold, ThresholdFormat, ThresholdSet};
pub use validator::{SlaValidator, Verdict, Violation, ViolationKind};
