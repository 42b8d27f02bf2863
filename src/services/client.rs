use std::time::Duration;

use log::error;
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

use crate::app_config::EndpointConfig;
use crate::errors::ServiceError;

/// Shared HTTP plumbing for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl ApiClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.endpoint)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of an API route below the base endpoint
    pub fn url(&self, route: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|e| ServiceError::RequestFailed(format!("Invalid route {}: {}", route, e)))
    }

    /// POST builder with authentication applied
    pub fn post(&self, route: &str) -> Result<RequestBuilder, ServiceError> {
        let mut builder = self.client.post(self.url(route)?);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        Ok(builder)
    }

    /// Send a request and turn non-success statuses into `ApiError`
    pub async fn send(&self, builder: RequestBuilder, service: &str) -> Result<Response, ServiceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed(format!("{} request failed: {}", service, e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("{} API error ({}): {}", service, status, message);
            return Err(ServiceError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

/// Parse an endpoint, defaulting to http:// and ending with a slash so
/// relative routes join below it
pub fn normalize_base_url(endpoint: &str) -> Result<Url, ServiceError> {
    let trimmed = endpoint.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let with_slash = format!("{}/", with_scheme.trim_end_matches('/'));

    Url::parse(&with_slash)
        .map_err(|e| ServiceError::RequestFailed(format!("Failed to parse endpoint URL {}: {}", endpoint, e)))
}
