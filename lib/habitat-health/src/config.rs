//! Check configuration.

use std::time::Duration;

use figment::{
    error::Kind,
    providers::{Env, Serialized},
    Figment,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use snafu::{ResultExt as _, Snafu};
use tracing::debug;
use url::Url;

use crate::{service::InvalidServiceGroup, HealthStatus, ServiceGroup};

/// Default address of the supervisor HTTP gateway.
pub const DEFAULT_SUPERVISOR_URL: &str = "http://127.0.0.1:9631";

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Prefix for environment variables that configure the check.
pub const ENV_PREFIX: &str = "HABITAT_CHECK_";

const CONFIGURATION_KEYS: &[&str] = &["supervisor_url", "services", "timeout"];

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// A configuration value had the wrong data type.
    #[snafu(display(
        "Expected value for field '{}' to be '{}', got '{}' instead.",
        field,
        expected_ty,
        actual_ty
    ))]
    InvalidFieldType {
        /// Name of the invalid field.
        field: String,

        /// Expected data type.
        expected_ty: String,

        /// Actual data type.
        actual_ty: String,
    },

    /// Configuration could not be extracted from its sources.
    #[snafu(display("Failed to load configuration: {}", source))]
    Load {
        /// Error source.
        source: figment::Error,
    },

    /// The supervisor URL could not be parsed.
    #[snafu(display("Failed to parse supervisor URL '{}': {}", url, source))]
    InvalidSupervisorUrl {
        /// The URL as given.
        url: String,

        /// Error source.
        source: url::ParseError,
    },

    /// The supervisor URL parsed, but cannot address an HTTP gateway.
    #[snafu(display(
        "Supervisor URL '{}' must be an http or https URL with a host, and no query or fragment.",
        url
    ))]
    UnsupportedSupervisorUrl {
        /// The URL as given.
        url: String,
    },

    /// An explicitly requested service was malformed.
    #[snafu(display("{}", source))]
    InvalidService {
        /// Error source.
        source: InvalidServiceGroup,
    },

    /// The request timeout was zero.
    #[snafu(display("Request timeout must be at least one second."))]
    ZeroTimeout,
}

impl ConfigurationError {
    /// Returns the status the check reports when configuration is unusable.
    pub fn severity(&self) -> HealthStatus {
        HealthStatus::Warning
    }
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        match e.kind {
            Kind::InvalidType(actual_ty, expected_ty) => Self::InvalidFieldType {
                field: e.path.join("."),
                expected_ty,
                actual_ty: actual_ty.to_string(),
            },
            _ => Self::Load { source: e },
        }
    }
}

/// Raw check configuration, as gathered from defaults, the environment and the command line.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CheckConfiguration {
    /// Base URL of the supervisor HTTP gateway.
    pub supervisor_url: String,

    /// Services to check, as `name.group`.
    ///
    /// When empty, every service loaded by the supervisor is checked.
    #[serde(default, deserialize_with = "deserialize_service_list")]
    pub services: Vec<String>,

    /// Request timeout, in seconds.
    pub timeout: u64,
}

impl Default for CheckConfiguration {
    fn default() -> Self {
        Self {
            supervisor_url: DEFAULT_SUPERVISOR_URL.to_string(),
            services: Vec::new(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CheckConfiguration {
    /// Validates the configuration.
    ///
    /// No network access is performed.
    ///
    /// # Errors
    ///
    /// If the supervisor URL cannot be parsed, or is not an HTTP(S) URL with a host and without a query or fragment, or
    /// if any explicitly requested service is not in the form `name.group`, or if the timeout is zero, an error is
    /// returned.
    pub fn validate(&self) -> Result<ValidatedConfiguration, ConfigurationError> {
        let parsed = Url::parse(&self.supervisor_url).context(InvalidSupervisorUrl {
            url: self.supervisor_url.clone(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https")
            || parsed.host_str().is_none()
            || parsed.query().is_some()
            || parsed.fragment().is_some()
        {
            return Err(ConfigurationError::UnsupportedSupervisorUrl {
                url: self.supervisor_url.clone(),
            });
        }

        let services = self
            .services
            .iter()
            .map(|raw| raw.parse::<ServiceGroup>())
            .collect::<Result<Vec<_>, _>>()
            .context(InvalidService)?;

        if self.timeout == 0 {
            return Err(ConfigurationError::ZeroTimeout);
        }

        Ok(ValidatedConfiguration {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            services: if services.is_empty() { None } else { Some(services) },
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

/// Configuration that has passed validation.
#[derive(Clone, Debug)]
pub struct ValidatedConfiguration {
    base_url: String,
    services: Option<Vec<ServiceGroup>>,
    timeout: Duration,
}

impl ValidatedConfiguration {
    /// Returns the supervisor base URL, without any trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the explicitly requested services, if any.
    pub fn services(&self) -> Option<&[ServiceGroup]> {
        self.services.as_deref()
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the absolute URL of a supervisor endpoint.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Values given explicitly on the command line.
///
/// Unset values do not override lower-priority sources.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConfigurationOverrides {
    /// Base URL of the supervisor HTTP gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_url: Option<String>,

    /// Services to check.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,

    /// Request timeout, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Loads [`CheckConfiguration`] from layered sources.
///
/// Sources added later take precedence over sources added earlier. The built-in defaults always have the lowest
/// priority.
pub struct ConfigurationLoader {
    figment: Figment,
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(CheckConfiguration::default())),
        }
    }
}

impl ConfigurationLoader {
    /// Loads configuration from environment variables with the given prefix.
    ///
    /// The prefix is uppercased and given a trailing underscore if it lacks one. Only the known configuration keys
    /// are read: `<PREFIX>SUPERVISOR_URL`, `<PREFIX>SERVICES` (comma-separated) and `<PREFIX>TIMEOUT`.
    ///
    /// # Errors
    ///
    /// If the prefix is empty, an error is returned.
    pub fn from_environment(mut self, prefix: &str) -> Result<Self, ConfigurationError> {
        if prefix.is_empty() {
            return Err(ConfigurationError::EmptyPrefix);
        }

        let mut prefix = prefix.to_uppercase();
        if !prefix.ends_with('_') {
            prefix.push('_');
        }

        debug!(%prefix, "Loading configuration from environment.");

        let env = Env::prefixed(&prefix).only(CONFIGURATION_KEYS);
        self.figment = self.figment.merge(env);
        Ok(self)
    }

    /// Applies values given explicitly on the command line.
    pub fn with_overrides(mut self, overrides: ConfigurationOverrides) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(overrides));
        self
    }

    /// Extracts the configuration.
    ///
    /// # Errors
    ///
    /// If a source holds a value of the wrong type, an error is returned.
    pub fn into_configuration(self) -> Result<CheckConfiguration, ConfigurationError> {
        Ok(self.figment.extract()?)
    }
}

fn deserialize_service_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ServiceListVisitor;

    impl<'de> de::Visitor<'de> for ServiceListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a list of services or a comma-separated string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect())
        }

        // Numeric-looking values such as `1.5` are read from the environment as numbers.
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut services = Vec::new();
            while let Some(service) = seq.next_element::<String>()? {
                services.push(service);
            }
            Ok(services)
        }
    }

    deserializer.deserialize_any(ServiceListVisitor)
}
