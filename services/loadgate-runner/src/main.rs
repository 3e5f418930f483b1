use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use loadgate_core::{GateConfig, Pipeline, PipelineOutcome, RowPolicy, RESULTS_FILE};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod auth;
mod error;
mod generator;
mod report;

use auth::CredentialProvider;
use generator::TrafficGenerator;
use report::{verdict_lines, ReportEmitter, ReportFormat};

/// Exit status used when the pipeline could not run at all.
const EXIT_PIPELINE_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "loadgate")]
#[command(about = "Load-test runner and SLA gate", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "LOADGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Results artifact (default: <reports-dir>/results_stats.csv)
    #[arg(long, global = true)]
    results: Option<PathBuf>,

    /// SLA threshold source (.toml, .yaml or .json)
    #[arg(long, global = true)]
    thresholds: Option<PathBuf>,

    /// Directory for generator output and reports
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    /// Skip malformed result rows instead of aborting
    #[arg(long, global = true)]
    skip_malformed_rows: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the traffic generator, then validate its results
    Run {
        /// Base URL of the system under test
        #[arg(long)]
        host: Option<String>,

        /// Number of concurrent users
        #[arg(long)]
        users: Option<u32>,

        /// Users started per second
        #[arg(long)]
        spawn_rate: Option<u32>,

        /// Run duration (e.g. "1m", "30s")
        #[arg(long)]
        run_time: Option<String>,
    },

    /// Validate an existing results artifact against SLA thresholds
    Validate,

    /// Write HTML/JSON reports for an existing results artifact
    Report,
}

/// How a completed gate run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateStatus {
    Passed,
    SlaViolated,
    GeneratorFailed,
}

impl GateStatus {
    fn exit_code(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::SlaViolated => 1,
            Self::GeneratorFailed => 3,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    init_logging();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Gate could not run: {:#}", e);
            ExitCode::from(EXIT_PIPELINE_ERROR)
        }
    }
}

async fn execute(cli: Cli) -> Result<GateStatus> {
    let mut config = GateConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(results) = cli.results {
        config.paths.results = Some(results);
    }
    if let Some(thresholds) = cli.thresholds {
        config.paths.thresholds = thresholds;
    }
    if let Some(reports_dir) = cli.reports_dir {
        config.paths.reports_dir = reports_dir;
    }
    if cli.skip_malformed_rows {
        config.parsing.row_policy = RowPolicy::Skip;
    }

    match cli.command {
        Commands::Run {
            host,
            users,
            spawn_rate,
            run_time,
        } => {
            if let Some(host) = host {
                config.target.host = host;
            }
            if let Some(users) = users {
                config.generator.users = users;
            }
            if let Some(spawn_rate) = spawn_rate {
                config.generator.spawn_rate = spawn_rate;
            }
            if let Some(run_time) = run_time {
                config.generator.run_time = run_time;
            }
            config.validate().context("invalid configuration")?;

            run_gate(config).await
        }
        Commands::Validate => validate_results(&config),
        Commands::Report => write_reports(&config),
    }
}

/// Generator run followed by the full pipeline.
async fn run_gate(config: GateConfig) -> Result<GateStatus> {
    std::fs::create_dir_all(&config.paths.reports_dir).with_context(|| {
        format!(
            "failed to create reports directory {}",
            config.paths.reports_dir.display()
        )
    })?;

    info!("Starting load test against {}", config.target.host);
    info!("Users: {}", config.generator.users);
    info!("Duration: {}", config.generator.run_time);

    let provider = CredentialProvider::new().context("failed to build HTTP client")?;
    let token = provider
        .acquire_token(&config.target, &config.auth)
        .await
        .context("credential provider failed")?;

    // Only this run's generator output may be validated.
    let generator_output = config.paths.reports_dir.join(RESULTS_FILE);
    if generator_output.exists() {
        std::fs::remove_file(&generator_output).with_context(|| {
            format!(
                "failed to remove stale results {}",
                generator_output.display()
            )
        })?;
        debug!(path = %generator_output.display(), "Removed stale results artifact");
    }

    let generator = TrafficGenerator::new(
        config.generator.clone(),
        config.target.host.clone(),
        config.paths.reports_dir.clone(),
    );

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Running traffic generator...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let generator_result = generator.run(token.as_deref()).await;
    pb.finish_and_clear();

    let generator_ok = match generator_result {
        Ok(()) => true,
        Err(e) => {
            error!("Traffic generator failed: {}", e);
            false
        }
    };

    let pipeline = Pipeline::new(config.pipeline_config());
    let outcome = match pipeline.run() {
        Ok(outcome) => outcome,
        Err(e) if !generator_ok => {
            error!("No usable results after generator failure: {}", e);
            return Ok(GateStatus::GeneratorFailed);
        }
        Err(e) => return Err(e).context("SLA pipeline failed"),
    };

    emit_reports(&config, &outcome)?;
    println!("{}", verdict_lines(&outcome.verdict));

    if !generator_ok {
        warn!("Results were validated, but the traffic generator reported a failure");
        return Ok(GateStatus::GeneratorFailed);
    }

    Ok(gate_status(&outcome))
}

/// Pipeline only, against artifacts already on disk.
fn validate_results(config: &GateConfig) -> Result<GateStatus> {
    let outcome = Pipeline::new(config.pipeline_config())
        .run()
        .context("SLA pipeline failed")?;

    println!("{}", verdict_lines(&outcome.verdict));
    Ok(gate_status(&outcome))
}

/// Reports for an existing artifact; never gates.
fn write_reports(config: &GateConfig) -> Result<GateStatus> {
    let (records, summary) = Pipeline::new(config.pipeline_config())
        .summarize()
        .context("failed to summarize results")?;

    let emitter = ReportEmitter::new(&records, &summary, None);
    for format in [ReportFormat::Html, ReportFormat::Json] {
        let path = emitter
            .write_report(&config.paths.reports_dir, format)
            .with_context(|| format!("failed to write {:?} report", format))?;
        println!("✅ Report saved: {}", path.display());
    }
    println!("\n{}", emitter.console_summary());

    Ok(GateStatus::Passed)
}

fn emit_reports(config: &GateConfig, outcome: &PipelineOutcome) -> Result<()> {
    let emitter = ReportEmitter::new(&outcome.records, &outcome.summary, Some(&outcome.verdict));
    for format in [ReportFormat::Html, ReportFormat::Json] {
        let path = emitter
            .write_report(&config.paths.reports_dir, format)
            .with_context(|| format!("failed to write {:?} report", format))?;
        info!("Report saved: {}", path.display());
    }
    println!("\n{}", emitter.console_summary());
    Ok(())
}

fn gate_status(outcome: &PipelineOutcome) -> GateStatus {
    if outcome.verdict.passed() {
        GateStatus::Passed
    } else {
        error!(
            violations = outcome.verdict.violations().len(),
            "SLA validation failed"
        );
        GateStatus::SlaViolated
    }
}

/// Initialize logging
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use loadgate_core::{aggregate, Verdict, Violation, ViolationKind};
    use std::path::Path;
    use tempfile::TempDir;

    const RESULTS: &str = "Type,Name,# requests,# failures,Median,Average,Min,Max,95%,99%,Failure Rate %\n\
                           GET,/a,100,0,40,45,3,300,150,250,0.0\n\
                           ,Aggregated,100,0,40,45,3,300,150,250,0.0\n";

    /// Config whose generator is `command`, with results kept outside the reports directory.
    fn gate_config(dir: &TempDir, command: &str, p95_limit: u32) -> GateConfig {
        let results = dir.path().join("fixture_stats.csv");
        std::fs::write(&results, RESULTS).unwrap();

        let thresholds = dir.path().join("sla.toml");
        std::fs::write(
            &thresholds,
            format!("[\"/a\"]\np95_ms = {}\nerror_rate_pct = 1.0\n", p95_limit),
        )
        .unwrap();

        let mut config = GateConfig::default();
        config.generator.command = command.to_string();
        config.paths.reports_dir = dir.path().join("reports");
        config.paths.thresholds = thresholds;
        config.paths.results = Some(results);
        config
    }

    fn write_stale_results(reports_dir: &Path) -> std::path::PathBuf {
        std::fs::create_dir_all(reports_dir).unwrap();
        let stale = reports_dir.join(RESULTS_FILE);
        std::fs::write(&stale, RESULTS).unwrap();
        stale
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "loadgate",
            "--thresholds",
            "sla.json",
            "--skip-malformed-rows",
            "run",
            "--users",
            "10",
            "--run-time",
            "30s",
        ])
        .unwrap();

        assert_eq!(cli.thresholds, Some(PathBuf::from("sla.json")));
        assert!(cli.skip_malformed_rows);
        match cli.command {
            Commands::Run {
                users, run_time, ..
            } => {
                assert_eq!(users, Some(10));
                assert_eq!(run_time.as_deref(), Some("30s"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(GateStatus::Passed.exit_code(), 0);
        assert_eq!(GateStatus::SlaViolated.exit_code(), 1);
        assert_eq!(GateStatus::GeneratorFailed.exit_code(), 3);
        assert_ne!(GateStatus::GeneratorFailed.exit_code(), EXIT_PIPELINE_ERROR);
    }

    #[test]
    fn test_gate_status_follows_verdict() {
        let mut outcome = PipelineOutcome {
            records: Vec::new(),
            summary: aggregate(&[]),
            verdict: Verdict::default(),
        };
        assert_eq!(gate_status(&outcome), GateStatus::Passed);

        outcome.verdict = Verdict::from_violations(vec![Violation {
            endpoint: "/a".to_string(),
            kind: ViolationKind::ErrorRate,
            observed: 2.0,
            threshold: 1.0,
        }]);
        assert_eq!(gate_status(&outcome), GateStatus::SlaViolated);
    }

    #[test]
    fn test_validate_results_gates_on_thresholds() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            validate_results(&gate_config(&dir, "locust", 200)).unwrap(),
            GateStatus::Passed
        );
        assert_eq!(
            validate_results(&gate_config(&dir, "locust", 100)).unwrap(),
            GateStatus::SlaViolated
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_gate_passes_and_writes_reports() {
        let dir = TempDir::new().unwrap();
        let config = gate_config(&dir, "true", 200);
        let reports_dir = config.paths.reports_dir.clone();

        assert_eq!(run_gate(config).await.unwrap(), GateStatus::Passed);
        assert!(reports_dir.join("performance_report.json").exists());
        assert!(reports_dir.join("performance_report.html").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_gate_reports_sla_violation() {
        let dir = TempDir::new().unwrap();
        let config = gate_config(&dir, "true", 100);
        assert_eq!(run_gate(config).await.unwrap(), GateStatus::SlaViolated);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generator_failure_wins_over_passing_verdict() {
        let dir = TempDir::new().unwrap();
        let config = gate_config(&dir, "false", 200);
        assert_eq!(run_gate(config).await.unwrap(), GateStatus::GeneratorFailed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generator_failure_ignores_stale_results() {
        let dir = TempDir::new().unwrap();
        let mut config = gate_config(&dir, "false", 200);
        config.paths.results = None;
        let stale = write_stale_results(&config.paths.reports_dir);

        // Without the stale artifact the pipeline has nothing to read.
        assert_eq!(run_gate(config).await.unwrap(), GateStatus::GeneratorFailed);
        assert!(!stale.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_results_after_successful_generator_is_error() {
        let dir = TempDir::new().unwrap();
        let mut config = gate_config(&dir, "true", 200);
        config.paths.results = None;
        let stale = write_stale_results(&config.paths.reports_dir);

        assert!(run_gate(config).await.is_err());
        assert!(!stale.exists());
    }
}
