use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the (percent-encoded) job id in endpoint templates.
pub const JOB_ID_PLACEHOLDER: &str = "{job_id}";

/// Endpoint path templates, relative to the base URL.
///
/// Templates are split on `/`; a segment equal to `{job_id}` is replaced by the
/// job id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    /// `POST`: submit a job.
    pub create_job: String,
    /// `GET`: job status.
    pub job_status: String,
    /// `GET`: job result.
    pub job_result: String,
    /// `POST`: immediate data.
    pub immediate: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            create_job: "/jobs".into(),
            job_status: "/jobs/{job_id}/status".into(),
            job_result: "/jobs/{job_id}/data".into(),
            immediate: "/data".into(),
        }
    }
}

/// Connection settings for [`crate::HttpBackend`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBackendConfig {
    /// Base URL; endpoint paths are appended to its path.
    pub base_url: String,
    /// Opaque token sent as `Authorization: Bearer <token>`.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Per-request timeout applied by the HTTP client.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    /// Endpoint templates.
    #[serde(default)]
    pub paths: EndpointPaths,
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl HttpBackendConfig {
    /// Settings for `base_url` with no token and the default paths.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            timeout: default_timeout(),
            paths: EndpointPaths::default(),
        }
    }
}

impl fmt::Debug for HttpBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackendConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("paths", &self.paths)
            .finish()
    }
}
