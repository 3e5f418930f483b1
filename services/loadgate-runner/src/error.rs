use std::process::ExitStatus;

/// Failures of the external collaborators driven by the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to start traffic generator `{command}`: {source}")]
    GeneratorSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("traffic generator exited with {status}")]
    GeneratorFailed { status: ExitStatus },

    #[error("missing required auth config key: {0}")]
    AuthConfig(&'static str),

    #[error("failed to obtain JWT token: {0}")]
    TokenRequest(#[from] reqwest::Error),

    #[error("no access_token in token response")]
    MissingAccessToken,
}
