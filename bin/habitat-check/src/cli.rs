use clap::Parser;
use habitat_health::{config::ConfigurationOverrides, OutputFormat};

/// Checks a Habitat supervisor for service health.
///
/// Exits with 0 (OK), 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN). Options that are not given fall back to the
/// `HABITAT_CHECK_SUPERVISOR_URL`, `HABITAT_CHECK_SERVICES` and `HABITAT_CHECK_TIMEOUT` environment variables, and then
/// to their defaults.
#[derive(Clone, Debug, Parser)]
#[command(name = "habitat-check", version, about)]
pub struct Cli {
    /// Supervisor URL. [default: http://127.0.0.1:9631]
    #[arg(short = 'u', long)]
    pub supervisor_url: Option<String>,

    /// Explicit service to check, in format service_name.service_group.
    ///
    /// May be given multiple times. When omitted, every service loaded by the supervisor is checked.
    #[arg(short = 's', long = "service")]
    pub services: Vec<String>,

    /// Request timeout in seconds. [default: 15]
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Output format (text, json).
    #[arg(short = 'o', long, default_value = "text")]
    pub output: OutputFormat,

    /// Include health check output for services that are not OK.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Returns the configuration values given explicitly on the command line.
    pub fn overrides(&self) -> ConfigurationOverrides {
        ConfigurationOverrides {
            supervisor_url: self.supervisor_url.clone(),
            services: self.services.clone(),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_repeated_services() {
        let cli = Cli::try_parse_from([
            "habitat-check",
            "-u",
            "http://10.0.0.5:9631/",
            "--service",
            "redis.default",
            "-s",
            "nginx.prod",
            "-t",
            "3",
            "-o",
            "json",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.supervisor_url.as_deref(), Some("http://10.0.0.5:9631/"));
        assert_eq!(overrides.services, vec!["redis.default", "nginx.prod"]);
        assert_eq!(overrides.timeout, Some(3));
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(!cli.verbose);
    }

    #[test]
    fn unset_options_do_not_override() {
        let cli = Cli::try_parse_from(["habitat-check"]).unwrap();
        let overrides = cli.overrides();
        assert!(overrides.supervisor_url.is_none());
        assert!(overrides.services.is_empty());
        assert!(overrides.timeout.is_none());
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["habitat-check", "--output", "yaml"]).is_err());
    }
}
