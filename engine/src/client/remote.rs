//! HTTP client for the upstream employee service
//!
//! `list_all` is a single unguarded GET. The single-employee operations run
//! through [`Resilience::execute`] with the policy names from the
//! `[resilience]` config section.

use async_trait::async_trait;
use directory_sdk::errors::DirectoryError;
use directory_sdk::types::{CreatedEmployee, EmployeeListEnvelope, EmployeeRecord};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{EmployeeApi, Result};
use crate::config::{Config, ResilienceConfig, UpstreamConfig};
use crate::resilience::{PolicyRegistry, Resilience, UpstreamFailure};

/// Status marker attached to the envelope synthesised for a 404 lookup
const NOT_FOUND_STATUS: &str = "not found";

pub struct RemoteDirectoryClient {
    base_url: Url,
    http: reqwest::Client,
    resilience: Resilience,
    retry_name: String,
    breaker_name: String,
}

impl RemoteDirectoryClient {
    pub fn new(
        upstream: &UpstreamConfig,
        policies: &ResilienceConfig,
        registry: Arc<PolicyRegistry>,
    ) -> std::result::Result<Self, DirectoryError> {
        let base_url = upstream.parsed_base_url()?;

        let mut builder = reqwest::Client::builder().connect_timeout(upstream.connect_timeout());
        if let Some(user_agent) = &upstream.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let http = builder
            .build()
            .map_err(|e| DirectoryError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            http,
            resilience: Resilience::new(registry),
            retry_name: policies.retry.clone(),
            breaker_name: policies.circuit_breaker.clone(),
        })
    }

    pub fn from_config(
        config: &Config,
        registry: Arc<PolicyRegistry>,
    ) -> std::result::Result<Self, DirectoryError> {
        Self::new(&config.upstream, &config.resilience, registry)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Send `request` and return the body of a successful answer
async fn send(request: RequestBuilder) -> std::result::Result<String, UpstreamFailure> {
    let response = request.send().await.map_err(UpstreamFailure::from_transport)?;
    let status = response.status();
    let body = response.text().await.map_err(UpstreamFailure::from_transport)?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(UpstreamFailure::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> std::result::Result<T, UpstreamFailure> {
    serde_json::from_str(body).map_err(|e| UpstreamFailure::Decode(e.to_string()))
}

/// Like [`decode`], but an empty body decodes to the default value
fn decode_or_default<T: DeserializeOwned + Default>(
    body: &str,
) -> std::result::Result<T, UpstreamFailure> {
    if body.trim().is_empty() {
        Ok(T::default())
    } else {
        decode(body)
    }
}

#[async_trait]
impl EmployeeApi for RemoteDirectoryClient {
    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<EmployeeRecord>> {
        let url = self.endpoint(&[""]);

        let body = send(self.http.get(url)).await.map_err(|failure| match failure {
            UpstreamFailure::Transport(cause) => DirectoryError::RemoteUnavailable(cause),
            other => other.into_directory_error(),
        })?;

        let envelope: EmployeeListEnvelope =
            decode_or_default(&body).map_err(UpstreamFailure::into_directory_error)?;
        debug!(count = envelope.data.len(), "Fetched employee list");
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<EmployeeListEnvelope> {
        let url = self.endpoint(&["employees", id]);

        self.resilience
            .execute(&self.retry_name, &self.breaker_name, || {
                let request = self.http.get(url.clone());
                async move {
                    match send(request).await {
                        Ok(body) => decode_or_default(&body),
                        Err(UpstreamFailure::Status { status: 404, .. }) => {
                            Ok(EmployeeListEnvelope::empty(NOT_FOUND_STATUS))
                        }
                        Err(failure) => Err(failure),
                    }
                }
            })
            .await
    }

    #[instrument(skip(self, record), fields(name = %record.name))]
    async fn create(&self, record: &EmployeeRecord) -> Result<EmployeeRecord> {
        let url = self.endpoint(&["employees"]);

        let created: CreatedEmployee = self
            .resilience
            .execute(&self.retry_name, &self.breaker_name, || {
                let request = self.http.post(url.clone()).json(record);
                async move {
                    send(request)
                        .await
                        .and_then(|body| decode::<CreatedEmployee>(&body))
                }
            })
            .await?;

        let created = created.into_record();
        debug!(id = ?created.id, "Employee created upstream");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "v1", "employee", id]);

        self.resilience
            .execute(&self.retry_name, &self.breaker_name, || {
                let request = self.http.delete(url.clone());
                async move { send(request).await.map(|_| ()) }
            })
            .await
    }
}
