//! metrica-http
//!
//! Production backend that implements `CampaignBackend` over HTTP. It speaks
//! the asynchronous job protocol (submit, poll status, download result) and
//! the immediate data path, mapping transport and status failures onto
//! `MetricaError`.
#![warn(missing_docs)]

mod builder;
mod config;

pub use builder::HttpBackendBuilder;
pub use config::{EndpointPaths, HttpBackendConfig, JOB_ID_PLACEHOLDER};

use async_trait::async_trait;
use chrono::NaiveDate;
use metrica_core::{
    CampaignBackend, ImmediateRequest, ImmediateResponse, JobId, JobProvider, JobResult, JobSpec,
    JobStatusReport, JobTicket, MetricaError, ResourceKey, SnapshotProvider,
};
use reqwest::{RequestBuilder, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Keys under which a job-creation response may carry the job id, in order.
const JOB_ID_KEYS: [&str; 3] = ["id", "job_id", "request_id"];

/// Public backend type. Construct with [`HttpBackend::builder`] or
/// [`HttpBackend::new`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    paths: EndpointPaths,
    auth: Option<String>,
}

#[derive(Serialize)]
struct CreateJobBody<'a> {
    table_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct ImmediateBody<'a> {
    table_name: &'a str,
    #[serde(flatten)]
    request: &'a ImmediateRequest,
}

impl HttpBackend {
    /// Stable backend name used in errors and logs.
    pub const NAME: &'static str = "metrica-http";

    /// Build a backend with a fresh `reqwest::Client`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the base URL does not parse or cannot carry a
    /// path, and `Other` if the HTTP client cannot be constructed.
    pub fn new(config: HttpBackendConfig) -> Result<Self, MetricaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MetricaError::Other(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(client, config)
    }

    /// Build a backend around an existing client. The config's timeout is
    /// ignored in favor of whatever the client was built with.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the base URL does not parse or cannot carry a path.
    pub fn with_client(
        client: reqwest::Client,
        config: HttpBackendConfig,
    ) -> Result<Self, MetricaError> {
        let base = Url::parse(config.base_url.trim()).map_err(|e| {
            MetricaError::InvalidArg(format!("invalid base url {:?}: {e}", config.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(MetricaError::InvalidArg(format!(
                "base url {base} cannot carry a path"
            )));
        }
        Ok(Self {
            client,
            base,
            paths: config.paths,
            auth: config
                .bearer_token
                .filter(|t| !t.trim().is_empty())
                .map(|t| format!("Bearer {}", t.trim())),
        })
    }

    /// Start a builder for `base_url`.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> HttpBackendBuilder {
        HttpBackendBuilder::new(base_url)
    }

    /// Resolve an endpoint template against the base URL.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the base URL cannot carry a path.
    pub fn endpoint(&self, template: &str, job_id: Option<&JobId>) -> Result<Url, MetricaError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                MetricaError::InvalidArg(format!("base url {} cannot carry a path", self.base))
            })?;
            segments.pop_if_empty();
            for seg in template.split('/').filter(|s| !s.is_empty()) {
                match job_id {
                    Some(id) if seg == JOB_ID_PLACEHOLDER => segments.push(id.as_str()),
                    _ => segments.push(seg),
                };
            }
        }
        Ok(url)
    }

    fn transport(err: &reqwest::Error) -> MetricaError {
        MetricaError::network(Self::NAME, err.to_string())
    }

    /// Send a request and decode a JSON body.
    ///
    /// A 404 becomes `NotReady` when `not_found_means_pending` names a job.
    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        not_found_means_pending: Option<&JobId>,
    ) -> Result<T, MetricaError> {
        let req = match &self.auth {
            Some(value) => req.header(header::AUTHORIZATION, value),
            None => req,
        };
        let resp = req.send().await.map_err(|e| Self::transport(&e))?;
        let status = resp.status();
        if !status.is_success() {
            if status == StatusCode::NOT_FOUND
                && let Some(job_id) = not_found_means_pending
            {
                return Err(MetricaError::not_ready(job_id.as_str()));
            }
            let body = resp.text().await.unwrap_or_default();
            let msg = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown status").to_string()
            } else {
                body
            };
            return Err(MetricaError::server(Self::NAME, status.as_u16(), msg));
        }
        let bytes = resp.bytes().await.map_err(|e| Self::transport(&e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| MetricaError::Data(format!("undecodable response body: {e}")))
    }
}

/// Extract the job id from a job-creation response.
///
/// Accepts string or numeric ids under `id`, `job_id` or `request_id`, in that
/// order.
///
/// # Errors
/// Returns `Data` when none of the keys holds a usable id.
pub fn job_id_from_response(body: &Value) -> Result<JobId, MetricaError> {
    JOB_ID_KEYS
        .iter()
        .find_map(|key| match body.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(JobId::new(s.trim())),
            Value::Number(n) => Some(JobId::new(n.to_string())),
            _ => None,
        })
        .ok_or_else(|| MetricaError::Data("job creation response carries no job id".into()))
}

#[async_trait]
impl JobProvider for HttpBackend {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "metrica_http::create_job",
            skip(self, spec),
            fields(resource = %spec.resource_key),
        )
    )]
    async fn create_job(&self, spec: &JobSpec) -> Result<JobTicket, MetricaError> {
        let url = self.endpoint(&self.paths.create_job, None)?;
        let body = CreateJobBody {
            table_name: spec.resource_key.as_str(),
            start_date: spec.range.map(|r| r.start()),
            end_date: spec.range.map(|r| r.end()),
        };
        let raw: Value = self.send(self.client.post(url).json(&body), None).await?;
        let job_id = job_id_from_response(&raw)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(job_id = %job_id, "job accepted");
        Ok(JobTicket { job_id })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "metrica_http::job_status", skip(self), fields(job_id = %job_id))
    )]
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, MetricaError> {
        let url = self.endpoint(&self.paths.job_status, Some(job_id))?;
        self.send(self.client.get(url), None).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "metrica_http::job_result", skip(self), fields(job_id = %job_id))
    )]
    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, MetricaError> {
        let url = self.endpoint(&self.paths.job_result, Some(job_id))?;
        self.send(self.client.get(url), Some(job_id)).await
    }
}

#[async_trait]
impl SnapshotProvider for HttpBackend {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "metrica_http::immediate_data",
            skip(self, req),
            fields(
                resource = %resource,
                start = %req.start_date,
                end = %req.end_date,
                force_refresh = req.force_refresh,
            ),
        )
    )]
    async fn immediate_data(
        &self,
        resource: &ResourceKey,
        req: &ImmediateRequest,
    ) -> Result<ImmediateResponse, MetricaError> {
        let url = self.endpoint(&self.paths.immediate, None)?;
        let body = ImmediateBody {
            table_name: resource.as_str(),
            request: req,
        };
        self.send(self.client.post(url).json(&body), None).await
    }
}

#[async_trait]
impl CampaignBackend for HttpBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn vendor(&self) -> &'static str {
        "HTTP"
    }

    fn as_job_provider(&self) -> Option<&dyn JobProvider> {
        Some(self as &dyn JobProvider)
    }

    fn as_snapshot_provider(&self) -> Option<&dyn SnapshotProvider> {
        Some(self as &dyn SnapshotProvider)
    }
}
