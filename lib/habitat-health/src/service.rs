use std::{fmt, str::FromStr};

use snafu::Snafu;

/// A malformed service group identifier.
#[derive(Debug, Eq, PartialEq, Snafu)]
#[snafu(display(
    "Service '{}' is malformed: expected 'service_name.service_group' using only letters, digits, '-' and '_'.",
    raw
))]
pub struct InvalidServiceGroup {
    raw: String,
}

/// A service group identifier, in the form `name.group`.
///
/// Both parts are restricted to ASCII letters, digits, `-` and `_`, so they can be placed in a request path as-is.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ServiceGroup {
    name: String,
    group: String,
}

impl ServiceGroup {
    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the group the service belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the path of the health endpoint for this service, relative to the supervisor base URL.
    pub fn health_path(&self) -> String {
        format!("services/{}/{}/health", self.name, self.group)
    }
}

impl FromStr for ServiceGroup {
    type Err = InvalidServiceGroup;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.split_once('.') {
            Some((name, group)) if is_valid_part(name) && is_valid_part(group) => Ok(Self {
                name: name.to_string(),
                group: group.to_string(),
            }),
            _ => Err(InvalidServiceGroup { raw: raw.to_string() }),
        }
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl fmt::Display for ServiceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.group)
    }
}
