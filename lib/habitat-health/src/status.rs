use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Health of a supervised service, or of the check as a whole.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum HealthStatus {
    /// The service is healthy.
    Ok,

    /// The service is degraded.
    Warning,

    /// The service is unhealthy.
    Critical,

    /// The health of the service could not be determined.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Parses a status word as reported by the supervisor.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace. Anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("ok") {
            Self::Ok
        } else if raw.eq_ignore_ascii_case("warning") {
            Self::Warning
        } else if raw.eq_ignore_ascii_case("critical") {
            Self::Critical
        } else {
            Self::Unknown
        }
    }

    /// Returns the upper-case status word.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Returns the process exit code conventionally used by monitoring checks for this status.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    /// Returns `true` if the status is `Ok`.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HealthStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl Serialize for HealthStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Reduces a set of per-service statuses into the overall status of the check.
///
/// A single critical or unknown service makes the whole check critical. Otherwise, a single warning makes it a warning.
/// An empty set is healthy.
pub fn aggregate<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    let mut overall = HealthStatus::Ok;
    for status in statuses {
        match status {
            HealthStatus::Critical | HealthStatus::Unknown => return HealthStatus::Critical,
            HealthStatus::Warning => overall = HealthStatus::Warning,
            HealthStatus::Ok => {}
        }
    }

    overall
}
