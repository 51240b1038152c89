//! Check execution.

use serde::Serialize;
use snafu::{ResultExt as _, Snafu};
use tracing::{debug, warn};

use crate::{
    aggregate,
    client::{ClientError, ServiceHealth, SupervisorClient},
    HealthStatus, ServiceGroup, ValidatedConfiguration,
};

/// Summary reported when the supervisor has no services loaded.
pub const NO_SERVICES_MESSAGE: &str = "no services loaded";

/// Summary reported when every checked service is healthy.
pub const ALL_OK_MESSAGE: &str = "all health checks OK";

/// A fatal check error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum CheckError {
    /// The supervisor client could not be created.
    #[snafu(display("{}", source))]
    Client {
        /// Error source.
        source: ClientError,
    },

    /// The loaded services could not be listed.
    #[snafu(display("Failed to list supervisor services: {}", source))]
    Enumeration {
        /// Error source.
        source: ClientError,
    },
}

impl CheckError {
    /// Returns the status the check reports for this error.
    pub fn severity(&self) -> HealthStatus {
        HealthStatus::Critical
    }
}

/// Health of a single service.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ServiceResult {
    /// Service group identifier.
    pub service_group: String,

    /// Observed status.
    pub status: HealthStatus,

    /// Additional context for a non-OK status, such as the request error or the health check hook output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ServiceResult {
    fn from_health(service: &ServiceGroup, health: ServiceHealth) -> Self {
        let detail = if health.status.is_ok() {
            None
        } else {
            [health.stdout, health.stderr]
                .into_iter()
                .flatten()
                .map(|output| output.trim().to_string())
                .find(|output| !output.is_empty())
        };

        Self {
            service_group: service.to_string(),
            status: health.status,
            detail,
        }
    }

    /// Returns the line reported for this service: its service group followed by its status word.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.service_group, self.status)
    }

    fn unknown<S: Into<String>>(service_group: S, detail: String) -> Self {
        Self {
            service_group: service_group.into(),
            status: HealthStatus::Unknown,
            detail: Some(detail),
        }
    }
}

/// Overall result of a check run.
#[derive(Clone, Debug, Serialize)]
pub struct CheckOutcome {
    /// Aggregate status.
    pub status: HealthStatus,

    /// Summary message, present when the aggregate status is OK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Per-service results, in the order services were checked.
    pub services: Vec<ServiceResult>,
}

impl CheckOutcome {
    /// Builds the outcome of a run from its per-service results.
    pub fn from_results(services: Vec<ServiceResult>) -> Self {
        let status = aggregate(services.iter().map(|s| s.status));
        let message = match status {
            HealthStatus::Ok if services.is_empty() => Some(NO_SERVICES_MESSAGE.to_string()),
            HealthStatus::Ok => Some(ALL_OK_MESSAGE.to_string()),
            _ => None,
        };

        Self {
            status,
            message,
            services,
        }
    }

    /// Returns the services that are not OK.
    pub fn problems(&self) -> impl Iterator<Item = &ServiceResult> {
        self.services.iter().filter(|s| !s.status.is_ok())
    }

    /// Returns one line per non-OK service, naming the service group and its status.
    pub fn problem_lines(&self) -> Vec<String> {
        self.problems().map(ServiceResult::status_line).collect()
    }

    /// Returns the process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        self.status.exit_code()
    }
}

/// Runs the check described by the given configuration.
///
/// # Errors
///
/// If the HTTP client cannot be created, or if no explicit services were configured and the loaded services cannot be
/// listed, an error is returned. Failures querying an individual service are reported as that service being `UNKNOWN`.
pub async fn execute(config: &ValidatedConfiguration) -> Result<CheckOutcome, CheckError> {
    let client = SupervisorClient::new(config.clone()).context(Client)?;
    run(&client).await
}

/// Runs the check with an existing client.
///
/// Services are queried one at a time, in order.
///
/// # Errors
///
/// If no explicit services were configured and the loaded services cannot be listed, an error is returned.
pub async fn run(client: &SupervisorClient) -> Result<CheckOutcome, CheckError> {
    let mut results = Vec::new();

    match client.config().services() {
        Some(services) => {
            for service in services {
                results.push(check_service(client, service).await);
            }
        }
        None => {
            let loaded = client.list_services().await.context(Enumeration)?;
            debug!(count = loaded.len(), "Listed loaded services.");

            for entry in loaded {
                match entry.service_group.parse::<ServiceGroup>() {
                    Ok(service) => results.push(check_service(client, &service).await),
                    Err(e) => {
                        warn!(service_group = %entry.service_group, error = %e, "Supervisor listed a malformed service.");
                        results.push(ServiceResult::unknown(entry.service_group, e.to_string()));
                    }
                }
            }
        }
    }

    Ok(CheckOutcome::from_results(results))
}

async fn check_service(client: &SupervisorClient, service: &ServiceGroup) -> ServiceResult {
    match client.service_health(service).await {
        Ok(health) => {
            debug!(%service, status = %health.status, "Retrieved service health.");
            ServiceResult::from_health(service, health)
        }
        Err(e) => {
            warn!(%service, error = %e, "Failed to retrieve service health.");
            ServiceResult::unknown(service.to_string(), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(service_group: &str, status: HealthStatus) -> ServiceResult {
        ServiceResult {
            service_group: service_group.to_string(),
            status,
            detail: None,
        }
    }

    #[test]
    fn empty_is_ok_with_no_services_message() {
        let outcome = CheckOutcome::from_results(Vec::new());
        assert_eq!(outcome.status, HealthStatus::Ok);
        assert_eq!(outcome.message.as_deref(), Some(NO_SERVICES_MESSAGE));
        assert!(outcome.problem_lines().is_empty());
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn all_ok_has_distinct_message() {
        let outcome = CheckOutcome::from_results(vec![
            result("redis.default", HealthStatus::Ok),
            result("nginx.prod", HealthStatus::Ok),
        ]);
        assert_eq!(outcome.status, HealthStatus::Ok);
        assert_eq!(outcome.message.as_deref(), Some(ALL_OK_MESSAGE));
        assert!(outcome.problem_lines().is_empty());
    }

    #[test]
    fn warning_lines_only_for_degraded_services() {
        let outcome = CheckOutcome::from_results(vec![
            result("redis.default", HealthStatus::Warning),
            result("nginx.prod", HealthStatus::Ok),
        ]);
        assert_eq!(outcome.status, HealthStatus::Warning);
        assert_eq!(outcome.message, None);
        assert_eq!(outcome.problem_lines(), vec!["redis.default WARNING"]);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn unknown_service_makes_check_critical() {
        let outcome = CheckOutcome::from_results(vec![
            result("redis.default", HealthStatus::Unknown),
            result("nginx.prod", HealthStatus::Warning),
            result("postgres.default", HealthStatus::Ok),
        ]);
        assert_eq!(outcome.status, HealthStatus::Critical);
        assert_eq!(
            outcome.problem_lines(),
            vec!["redis.default UNKNOWN", "nginx.prod WARNING"]
        );
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn detail_prefers_hook_stdout() {
        let service: ServiceGroup = "redis.default".parse().unwrap();

        let health = ServiceHealth {
            status: HealthStatus::Critical,
            stdout: Some("  replication lag 30s\n".to_string()),
            stderr: Some("ignored".to_string()),
        };
        let result = ServiceResult::from_health(&service, health);
        assert_eq!(result.detail.as_deref(), Some("replication lag 30s"));

        let health = ServiceHealth {
            status: HealthStatus::Warning,
            stdout: Some(String::new()),
            stderr: Some("disk 91% full".to_string()),
        };
        let result = ServiceResult::from_health(&service, health);
        assert_eq!(result.detail.as_deref(), Some("disk 91% full"));

        let health = ServiceHealth {
            status: HealthStatus::Ok,
            stdout: Some("all good".to_string()),
            stderr: None,
        };
        let result = ServiceResult::from_health(&service, health);
        assert_eq!(result.detail, None);
    }
}
