//! Client for the supervisor HTTP gateway.

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, StatusCode,
};
use serde::Deserialize;
use snafu::{ResultExt as _, Snafu};
use tracing::debug;

use crate::{HealthStatus, ServiceGroup, ValidatedConfiguration};

/// A supervisor client error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ClientError {
    /// The HTTP client could not be built.
    #[snafu(display("Failed to build HTTP client: {}", source))]
    Build {
        /// Error source.
        source: reqwest::Error,
    },

    /// The request could not be completed.
    #[snafu(display("Request to '{}' failed: {}", url, source))]
    Request {
        /// Requested URL.
        url: String,

        /// Error source.
        source: reqwest::Error,
    },

    /// The supervisor responded with an unexpected status code.
    #[snafu(display("Received non-success response ({}) from '{}'.", status, url))]
    UnexpectedStatus {
        /// Requested URL.
        url: String,

        /// Response status.
        status: StatusCode,
    },

    /// The response body could not be decoded.
    #[snafu(display("Failed to decode response from '{}': {}", url, source))]
    Decode {
        /// Requested URL.
        url: String,

        /// Error source.
        source: reqwest::Error,
    },
}

/// A service loaded by the supervisor.
///
/// Only the fields needed to locate the service's health endpoint are decoded.
#[derive(Clone, Debug, Deserialize)]
pub struct LoadedService {
    /// Service group identifier, in the form `name.group`.
    pub service_group: String,
}

/// Result of a service's health check hook, as reported by the supervisor.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceHealth {
    /// Reported status.
    pub status: HealthStatus,

    /// Standard output of the health check hook.
    #[serde(default)]
    pub stdout: Option<String>,

    /// Standard error of the health check hook.
    #[serde(default)]
    pub stderr: Option<String>,
}

/// Typed client for the supervisor HTTP gateway.
pub struct SupervisorClient {
    inner: Client,
    config: ValidatedConfiguration,
}

impl SupervisorClient {
    /// Creates a new `SupervisorClient`.
    ///
    /// Every request carries `Accept: application/json` and is bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// If the underlying HTTP client cannot be built, an error is returned.
    pub fn new(config: ValidatedConfiguration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let inner = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .context(Build)?;

        Ok(Self { inner, config })
    }

    /// Returns the configuration this client was built from.
    pub fn config(&self) -> &ValidatedConfiguration {
        &self.config
    }

    /// Lists the services currently loaded by the supervisor.
    ///
    /// # Errors
    ///
    /// If the request fails, the supervisor responds with a non-success status code, or the body cannot be decoded, an
    /// error is returned.
    pub async fn list_services(&self) -> Result<Vec<LoadedService>, ClientError> {
        let url = self.config.endpoint("services");
        let response = self.get(&url).await?;
        if !response.status().is_success() {
            return Err(ClientError::UnexpectedStatus {
                url,
                status: response.status(),
            });
        }

        response.json().await.context(Decode { url })
    }

    /// Retrieves the result of the most recent health check of a service.
    ///
    /// # Errors
    ///
    /// If the request fails, the supervisor responds with anything other than `200 OK` (such as `404` for a service
    /// that is not loaded), or the body cannot be decoded, an error is returned.
    pub async fn service_health(&self, service: &ServiceGroup) -> Result<ServiceHealth, ClientError> {
        let url = self.config.endpoint(&service.health_path());
        let response = self.get(&url).await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus {
                url,
                status: response.status(),
            });
        }

        response.json().await.context(Decode { url })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ClientError> {
        debug!(%url, "Querying supervisor.");

        let response = self.inner.get(url).send().await.context(Request { url })?;

        debug!(%url, status = %response.status(), "Supervisor responded.");
        Ok(response)
    }
}
