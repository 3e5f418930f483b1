//! Configuration management for loadgate
//!
//! Sources, in order of precedence:
//! 1. Environment variables (highest priority), e.g. `LOADGATE_GENERATOR__USERS=100`
//! 2. Config file passed explicitly (`--config` / `LOADGATE_CONFIG`)
//! 3. ./config/loadgate.{toml,yaml,json}
//! 4. Hardcoded defaults (lowest priority)
//!
//! The loaded [`GateConfig`] is handed to the pipeline by value; nothing in the
//! pipeline reads process-wide state.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::parser::RowPolicy;
use crate::pipeline::PipelineConfig;

/// File name of the per-endpoint statistics written by the traffic generator.
pub const RESULTS_FILE: &str = "results_stats.csv";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GateConfig {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub parsing: ParsingConfig,
}

impl GateConfig {
    /// Load configuration from defaults, files and environment.
    ///
    /// The result is not validated; callers apply their own overrides first
    /// and then call [`GateConfig::validate`].
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        builder = builder.add_source(File::with_name("./config/loadgate").required(false));

        if let Some(path) = explicit_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("LOADGATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Set default values for all configuration options
    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            // Target
            .set_default("target.host", "http://localhost:8080")?
            // Auth
            .set_default("auth.type", "none")?
            // Generator
            .set_default("generator.command", "locust")?
            .set_default("generator.locustfile", "locustfiles/dynamic_tasks.py")?
            .set_default("generator.users", 50)?
            .set_default("generator.spawn_rate", 5)?
            .set_default("generator.run_time", "1m")?
            // Paths
            .set_default("paths.reports_dir", "reports")?
            .set_default("paths.thresholds", "thresholds/sla.toml")?
            // Parsing
            .set_default("parsing.row_policy", "abort")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.host.trim().is_empty() {
            return Err(ConfigError::Message("target.host must not be empty".to_string()));
        }

        if self.generator.command.trim().is_empty() {
            return Err(ConfigError::Message(
                "generator.command must not be empty".to_string(),
            ));
        }

        if self.generator.users == 0 {
            return Err(ConfigError::Message("generator.users must be > 0".to_string()));
        }

        if self.generator.spawn_rate == 0 {
            return Err(ConfigError::Message(
                "generator.spawn_rate must be > 0".to_string(),
            ));
        }

        if self.generator.run_time.trim().is_empty() {
            return Err(ConfigError::Message(
                "generator.run_time must not be empty".to_string(),
            ));
        }

        self.auth.validate()
    }

    /// Location of the results artifact for this configuration.
    pub fn results_path(&self) -> PathBuf {
        self.paths
            .results
            .clone()
            .unwrap_or_else(|| self.paths.reports_dir.join(RESULTS_FILE))
    }

    /// Pipeline inputs derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            results_path: self.results_path(),
            thresholds_path: self.paths.thresholds.clone(),
            row_policy: self.parsing.row_policy,
        }
    }
}

/// System under test
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Base URL requests and token calls are made against
    pub host: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_string(),
        }
    }
}

/// Authentication mode for generated traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    #[default]
    None,
    Jwt,
}

/// Credential provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default)]
    pub kind: AuthKind,

    /// Token endpoint path, appended to `target.host`
    pub token_url: Option<String>,

    pub username: Option<String>,

    pub password: Option<String>,
}

impl AuthConfig {
    /// Checks that every key the configured mode needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kind == AuthKind::None {
            return Ok(());
        }

        let required = [
            ("auth.token_url", &self.token_url),
            ("auth.username", &self.username),
            ("auth.password", &self.password),
        ];
        for (key, value) in required {
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Message(format!(
                    "{} is required when auth.type is jwt",
                    key
                )));
            }
        }

        Ok(())
    }
}

/// External traffic generator invocation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Executable to spawn (default: "locust")
    pub command: String,

    /// Scenario file handed to the generator
    pub locustfile: PathBuf,

    /// Number of concurrent virtual users
    pub users: u32,

    /// Users started per second
    pub spawn_rate: u32,

    /// Run duration in generator syntax (e.g. "1m", "30s")
    pub run_time: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: "locust".to_string(),
            locustfile: PathBuf::from("locustfiles/dynamic_tasks.py"),
            users: 50,
            spawn_rate: 5,
            run_time: "1m".to_string(),
        }
    }
}

/// Input and output locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory the generator writes into and reports are written to
    pub reports_dir: PathBuf,

    /// Threshold source (.toml or .json)
    pub thresholds: PathBuf,

    /// Results artifact override; defaults to `<reports_dir>/results_stats.csv`
    #[serde(default)]
    pub results: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            thresholds: PathBuf::from("thresholds/sla.toml"),
            results: None,
        }
    }
}

/// Results parsing options
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ParsingConfig {
    #[serde(default)]
    pub row_policy: RowPolicy,
}
