use std::time::Duration;

use metrica_core::MetricaError;

use crate::{EndpointPaths, HttpBackend, HttpBackendConfig};

/// Consuming builder for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendBuilder {
    config: HttpBackendConfig,
    client: Option<reqwest::Client>,
}

impl HttpBackendBuilder {
    /// Start from the default settings for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: HttpBackendConfig::new(base_url),
            client: None,
        }
    }

    /// Start from a complete config.
    #[must_use]
    pub const fn from_config(config: HttpBackendConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.bearer_token = Some(token.into());
        self
    }

    /// Per-request timeout. Ignored when a custom client is supplied.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Replace all endpoint templates.
    #[must_use]
    pub fn paths(mut self, paths: EndpointPaths) -> Self {
        self.config.paths = paths;
        self
    }

    /// Use a preconfigured `reqwest::Client`.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the backend.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an unusable base URL and `Other` if the HTTP
    /// client cannot be constructed.
    pub fn build(self) -> Result<HttpBackend, MetricaError> {
        match self.client {
            Some(client) => HttpBackend::with_client(client, self.config),
            None => HttpBackend::new(self.config),
        }
    }
}
