//! Health checking for services run by a Habitat supervisor.
//!
//! The check queries the supervisor HTTP gateway for the health of each service it runs, and reduces the individual
//! results into a single status suitable for a monitoring pipeline.
#![deny(missing_docs)]

mod check;
pub use self::check::{execute, run, CheckError, CheckOutcome, ServiceResult, ALL_OK_MESSAGE, NO_SERVICES_MESSAGE};

pub mod client;
pub use self::client::SupervisorClient;

pub mod config;
pub use self::config::{CheckConfiguration, ConfigurationError, ConfigurationLoader, ValidatedConfiguration};

mod report;
pub use self::report::{OutputFormat, Reporter};

mod service;
pub use self::service::{InvalidServiceGroup, ServiceGroup};

mod status;
pub use self::status::{aggregate, HealthStatus};
