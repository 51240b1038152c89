//! Monitoring check for the health of services run by a Habitat supervisor.

#![deny(missing_docs)]

use std::{io::IsTerminal as _, process::ExitCode};

use anyhow::Context as _;
use clap::{error::ErrorKind, Parser as _};
use habitat_health::{
    config::ENV_PREFIX, execute, CheckConfiguration, CheckError, CheckOutcome, ConfigurationError,
    ConfigurationLoader, HealthStatus, OutputFormat, Reporter,
};
use tokio::runtime::Runtime;
use tracing::{debug, error};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod cli;
use self::cli::Cli;

const LOG_LEVEL_ENV_VAR: &str = "HABITAT_CHECK_LOG_LEVEL";

/// A check that could not produce an outcome.
struct Failure {
    status: HealthStatus,
    message: String,
}

impl From<ConfigurationError> for Failure {
    fn from(e: ConfigurationError) -> Self {
        Self {
            status: e.severity(),
            message: e.to_string(),
        }
    }
}

impl From<CheckError> for Failure {
    fn from(e: CheckError) -> Self {
        Self {
            status: e.severity(),
            message: e.to_string(),
        }
    }
}

// Usage errors are reported like configuration errors, not with clap's own exit code.
impl From<clap::Error> for Failure {
    fn from(e: clap::Error) -> Self {
        let rendered = e.to_string();
        let first_line = rendered.lines().next().unwrap_or_default();

        Self {
            status: HealthStatus::Warning,
            message: first_line.trim_start_matches("error: ").trim().to_string(),
        }
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Self {
            status: HealthStatus::Unknown,
            message: format!("{:#}", e),
        }
    }
}

fn main() -> ExitCode {
    // Standard output carries the check result only.
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var(LOG_LEVEL_ENV_VAR)
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                e.exit()
            }
            _ => {
                let reporter = Reporter::new(OutputFormat::default(), false);
                return report_failure(&reporter, Failure::from(e));
            }
        },
    };
    let reporter = Reporter::new(cli.output, cli.verbose);

    match check(&cli) {
        Ok(outcome) => {
            debug!(status = %outcome.status, services = outcome.services.len(), "Check complete.");
            emit(outcome.status, reporter.render(&outcome))
        }
        Err(failure) => report_failure(&reporter, failure),
    }
}

fn report_failure(reporter: &Reporter, failure: Failure) -> ExitCode {
    error!(status = %failure.status, "{}", failure.message);
    emit(failure.status, reporter.render_failure(failure.status, &failure.message))
}

fn emit<E: std::fmt::Display>(status: HealthStatus, rendered: Result<String, E>) -> ExitCode {
    match rendered {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::from(status.exit_code())
        }
        Err(e) => {
            println!("{}: failed to render check result: {}", HealthStatus::Unknown, e);
            ExitCode::from(HealthStatus::Unknown.exit_code())
        }
    }
}

fn check(cli: &Cli) -> Result<CheckOutcome, Failure> {
    let configuration = load_configuration(cli)?;
    let validated = configuration.validate()?;

    let runtime = build_runtime()?;
    let outcome = runtime.block_on(execute(&validated))?;
    Ok(outcome)
}

fn load_configuration(cli: &Cli) -> Result<CheckConfiguration, ConfigurationError> {
    let configuration = ConfigurationLoader::default()
        .from_environment(ENV_PREFIX)?
        .with_overrides(cli.overrides())
        .into_configuration()?;

    debug!(?configuration, "Loaded configuration.");
    Ok(configuration)
}

fn build_runtime() -> Result<Runtime, anyhow::Error> {
    // One request is in flight at a time, so a single thread is all the check needs.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage_failure(args: &[&str]) -> Failure {
        let e = Cli::try_parse_from(std::iter::once("habitat-check").chain(args.iter().copied()))
            .err()
            .expect("arguments should be rejected");
        Failure::from(e)
    }

    #[test]
    fn invalid_timeout_is_a_warning() {
        let failure = usage_failure(&["--timeout", "soon"]);
        assert_eq!(failure.status, HealthStatus::Warning);
        assert_eq!(failure.status.exit_code(), 1);
        assert!(failure.message.contains("soon"), "unexpected message: {}", failure.message);
        assert!(!failure.message.starts_with("error:"));
        assert!(!failure.message.contains('\n'));
    }

    #[test]
    fn invalid_output_format_is_a_warning() {
        let failure = usage_failure(&["--output", "yaml"]);
        assert_eq!(failure.status, HealthStatus::Warning);
        assert!(failure.message.contains("yaml"), "unexpected message: {}", failure.message);
    }

    #[test]
    fn unknown_argument_is_a_warning() {
        let failure = usage_failure(&["--bogus"]);
        assert_eq!(failure.status, HealthStatus::Warning);
        assert!(failure.message.contains("--bogus"), "unexpected message: {}", failure.message);
    }

    #[test]
    fn usage_failure_renders_with_default_reporter() {
        let failure = usage_failure(&["--timeout", "soon"]);
        let reporter = Reporter::new(OutputFormat::default(), false);
        let rendered = reporter.render_failure(failure.status, &failure.message).unwrap();
        assert!(rendered.starts_with("WARNING: "));
    }
}
