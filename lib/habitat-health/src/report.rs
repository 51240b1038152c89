//! Rendering of check results.

use std::str::FromStr;

use serde::Serialize;

use crate::{CheckOutcome, HealthStatus};

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    /// One line per non-OK service, followed by a summary when everything is OK.
    #[default]
    Text,

    /// The full outcome as a JSON document.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("invalid output format '{}', expected 'text' or 'json'", other)),
        }
    }
}

#[derive(Serialize)]
struct Failure<'a> {
    status: HealthStatus,
    message: &'a str,
}

/// Renders check results for the monitoring pipeline.
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
}

impl Reporter {
    /// Create a new reporter with the given output format.
    ///
    /// In verbose text mode, each non-OK service line is followed by its detail, indented.
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Renders the outcome of a completed check.
    ///
    /// # Errors
    ///
    /// If the outcome cannot be serialized to JSON, an error is returned.
    pub fn render(&self, outcome: &CheckOutcome) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Text => {
                let mut lines = Vec::new();
                for service in outcome.problems() {
                    lines.push(service.status_line());
                    if self.verbose {
                        if let Some(detail) = &service.detail {
                            lines.extend(detail.lines().map(|line| format!("  {}", line)));
                        }
                    }
                }

                if let Some(message) = &outcome.message {
                    lines.push(message.clone());
                }

                Ok(lines.join("\n"))
            }
            OutputFormat::Json => serde_json::to_string_pretty(outcome),
        }
    }

    /// Renders a check that could not run to completion.
    ///
    /// # Errors
    ///
    /// If the failure cannot be serialized to JSON, an error is returned.
    pub fn render_failure(&self, status: HealthStatus, message: &str) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Text => Ok(format!("{}: {}", status, message)),
            OutputFormat::Json => serde_json::to_string_pretty(&Failure { status, message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceResult;

    fn outcome() -> CheckOutcome {
        CheckOutcome::from_results(vec![
            ServiceResult {
                service_group: "redis.default".to_string(),
                status: HealthStatus::Critical,
                detail: Some("replication broken\nlast seen 5m ago".to_string()),
            },
            ServiceResult {
                service_group: "nginx.prod".to_string(),
                status: HealthStatus::Ok,
                detail: None,
            },
        ])
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn text_lists_problems_only() {
        let reporter = Reporter::new(OutputFormat::Text, false);
        assert_eq!(reporter.render(&outcome()).unwrap(), "redis.default CRITICAL");
    }

    #[test]
    fn text_uses_outcome_problem_lines() {
        let outcome = CheckOutcome::from_results(vec![
            ServiceResult {
                service_group: "redis.default".to_string(),
                status: HealthStatus::Unknown,
                detail: None,
            },
            ServiceResult {
                service_group: "nginx.prod".to_string(),
                status: HealthStatus::Warning,
                detail: None,
            },
        ]);

        let reporter = Reporter::new(OutputFormat::Text, false);
        assert_eq!(reporter.render(&outcome).unwrap(), outcome.problem_lines().join("\n"));
    }

    #[test]
    fn text_verbose_includes_detail() {
        let reporter = Reporter::new(OutputFormat::Text, true);
        assert_eq!(
            reporter.render(&outcome()).unwrap(),
            "redis.default CRITICAL\n  replication broken\n  last seen 5m ago"
        );
    }

    #[test]
    fn text_summary_when_ok() {
        let reporter = Reporter::new(OutputFormat::Text, false);
        let outcome = CheckOutcome::from_results(Vec::new());
        assert_eq!(reporter.render(&outcome).unwrap(), "no services loaded");
    }

    #[test]
    fn json_outcome() {
        let reporter = Reporter::new(OutputFormat::Json, false);
        let rendered = reporter.render(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["status"], "CRITICAL");
        assert!(value.get("message").is_none());
        assert_eq!(value["services"][0]["service_group"], "redis.default");
        assert_eq!(value["services"][0]["status"], "CRITICAL");
        assert_eq!(value["services"][1]["status"], "OK");
        assert!(value["services"][1].get("detail").is_none());
    }

    #[test]
    fn failure_rendering() {
        let text = Reporter::new(OutputFormat::Text, false);
        assert_eq!(
            text.render_failure(HealthStatus::Warning, "bad URL").unwrap(),
            "WARNING: bad URL"
        );

        let json = Reporter::new(OutputFormat::Json, false);
        let value: serde_json::Value =
            serde_json::from_str(&json.render_failure(HealthStatus::Critical, "unreachable").unwrap()).unwrap();
        assert_eq!(value["status"], "CRITICAL");
        assert_eq!(value["message"], "unreachable");
    }
}
