//! External traffic generator invocation.

use std::ffi::OsString;
use std::path::PathBuf;

use loadgate_core::GeneratorConfig;
use tokio::process::Command;
use tracing::info;

use crate::error::RunnerError;

/// Environment variable the access token is handed to the generator in.
pub const AUTH_TOKEN_ENV: &str = "LOADGATE_AUTH_TOKEN";

/// Prefix for the generator's CSV output; it appends `_stats.csv` and friends.
const CSV_PREFIX: &str = "results";

/// Headless, time-boxed generator run writing its artifacts to the reports directory.
pub struct TrafficGenerator {
    config: GeneratorConfig,
    host: String,
    reports_dir: PathBuf,
}

impl TrafficGenerator {
    pub fn new(config: GeneratorConfig, host: impl Into<String>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            host: host.into(),
            reports_dir: reports_dir.into(),
        }
    }

    /// Command-line arguments passed to the generator.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-f".into(),
            self.config.locustfile.clone().into_os_string(),
            "--headless".into(),
            "-u".into(),
            self.config.users.to_string().into(),
            "-r".into(),
            self.config.spawn_rate.to_string().into(),
            "-t".into(),
            self.config.run_time.clone().into(),
            "--host".into(),
            self.host.clone().into(),
            "--html".into(),
            self.reports_dir.join("report.html").into_os_string(),
            "--csv".into(),
            self.reports_dir.join(CSV_PREFIX).into_os_string(),
        ]
    }

    /// Runs the generator to completion.
    pub async fn run(&self, token: Option<&str>) -> Result<(), RunnerError> {
        let mut command = Command::new(&self.config.command);
        command.args(self.args()).kill_on_drop(true);
        if let Some(token) = token {
            command.env(AUTH_TOKEN_ENV, token);
        }

        info!(
            command = %self.config.command,
            users = self.config.users,
            spawn_rate = self.config.spawn_rate,
            run_time = %self.config.run_time,
            "Starting traffic generator"
        );

        let status = command
            .status()
            .await
            .map_err(|source| RunnerError::GeneratorSpawn {
                command: self.config.command.clone(),
                source,
            })?;

        if status.success() {
            info!("Traffic generator finished");
            Ok(())
        } else {
            Err(RunnerError::GeneratorFailed { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(command: &str) -> TrafficGenerator {
        let config = GeneratorConfig {
            command: command.to_string(),
            ..Default::default()
        };
        TrafficGenerator::new(config, "http://localhost:8080", "reports")
    }

    #[test]
    fn test_args() {
        let args: Vec<String> = generator("locust")
            .args()
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        let reports = PathBuf::from("reports");
        assert_eq!(
            args,
            vec![
                "-f".to_string(),
                "locustfiles/dynamic_tasks.py".to_string(),
                "--headless".to_string(),
                "-u".to_string(),
                "50".to_string(),
                "-r".to_string(),
                "5".to_string(),
                "-t".to_string(),
                "1m".to_string(),
                "--host".to_string(),
                "http://localhost:8080".to_string(),
                "--html".to_string(),
                reports.join("report.html").to_string_lossy().into_owned(),
                "--csv".to_string(),
                reports.join("results").to_string_lossy().into_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_command_is_spawn_error() {
        let result = generator("loadgate-no-such-generator").run(None).await;
        assert!(matches!(result, Err(RunnerError::GeneratorSpawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_checked() {
        assert!(generator("true").run(Some("token")).await.is_ok());
        assert!(matches!(
            generator("false").run(None).await,
            Err(RunnerError::GeneratorFailed { .. })
        ));
    }
}
