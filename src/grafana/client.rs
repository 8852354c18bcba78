//! # Grafana HTTP Client
//!
//! `reqwest` implementation of [`GrafanaApi`]. One request per call, no retries:
//! retrying is left to the controller's requeue and backoff policy.

use super::{
    Authenticator, Folder, GrafanaApi, GrafanaConnector, GrafanaError, HealthResponse,
    SaveDashboardRequest, SaveDashboardResponse,
};
use crate::constants::DEFAULT_GRAFANA_TIMEOUT_SECS;
use crate::observability::metrics;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Connection settings for one Grafana instance
#[derive(Clone)]
pub struct GrafanaClientConfig {
    /// Base URL without trailing slash, e.g. `http://grafana-service.monitoring.svc.cluster.local:3000`
    pub base_url: String,
    /// Timeout of a single request
    pub timeout: Duration,
    /// Bearer token, set by [`Authenticator::ApiToken`]
    pub api_token: Option<String>,
    /// Username and password, set by [`Authenticator::Basic`]
    pub basic_auth: Option<(String, String)>,
}

impl GrafanaClientConfig {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_GRAFANA_TIMEOUT_SECS),
            api_token: None,
            basic_auth: None,
        }
    }
}

impl std::fmt::Debug for GrafanaClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrafanaClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field(
                "basic_auth",
                &self.basic_auth.as_ref().map(|(user, _)| (user.as_str(), "***")),
            )
            .finish()
    }
}

/// Grafana API client over HTTP
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    http: reqwest::Client,
    config: GrafanaClientConfig,
}

impl GrafanaClient {
    /// Build a client for the given configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` when the base URL is not an absolute http(s) URL and
    /// `Transport` when the HTTP client cannot be constructed.
    pub fn new(config: GrafanaClientConfig) -> Result<Self, GrafanaError> {
        let parsed =
            reqwest::Url::parse(&config.base_url).map_err(|e| GrafanaError::InvalidUrl {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GrafanaError::InvalidUrl {
                url: config.base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Base URL this client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let builder = self
            .http
            .request(method, url)
            .header("accept", "application/json");
        if let Some(token) = &self.config.api_token {
            builder.bearer_auth(token)
        } else if let Some((username, password)) = &self.config.basic_auth {
            builder.basic_auth(username, Some(password))
        } else {
            builder
        }
    }

    /// Send a request, record the call and fail on non-2xx answers
    async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<Response, GrafanaError> {
        let start = Instant::now();
        let result = async {
            let response = builder.send().await?;
            let status = response.status();
            if status.is_success() {
                Ok(response)
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(GrafanaError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
        .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_not_found() => "not_found",
            Err(_) => "error",
        };
        metrics::record_grafana_call(operation, outcome, start.elapsed().as_secs_f64());
        debug!(
            grafana.operation = operation,
            grafana.outcome = outcome,
            "grafana.api.call"
        );
        result
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, GrafanaError> {
        let response = self.send(operation, builder).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| GrafanaError::Decode(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl GrafanaApi for GrafanaClient {
    async fn health(&self) -> Result<HealthResponse, GrafanaError> {
        self.send_json("health", self.request(Method::GET, "/api/health"))
            .await
    }

    async fn folders(&self) -> Result<Vec<Folder>, GrafanaError> {
        self.send_json("list_folders", self.request(Method::GET, "/api/folders"))
            .await
    }

    async fn create_folder(&self, title: &str) -> Result<Folder, GrafanaError> {
        let builder = self
            .request(Method::POST, "/api/folders")
            .json(&json!({ "title": title }));
        self.send_json("create_folder", builder).await
    }

    async fn update_folder(&self, uid: &str, title: &str) -> Result<Folder, GrafanaError> {
        let builder = self
            .request(Method::PUT, &format!("/api/folders/{uid}"))
            .json(&json!({ "title": title, "overwrite": true }));
        self.send_json("update_folder", builder).await
    }

    async fn folder_by_uid(&self, uid: &str) -> Result<Folder, GrafanaError> {
        self.send_json(
            "get_folder",
            self.request(Method::GET, &format!("/api/folders/{uid}")),
        )
        .await
    }

    async fn save_dashboard(
        &self,
        request: &SaveDashboardRequest,
    ) -> Result<SaveDashboardResponse, GrafanaError> {
        let builder = self
            .request(Method::POST, "/api/dashboards/db")
            .json(request);
        self.send_json("save_dashboard", builder).await
    }

    async fn delete_dashboard(&self, uid: &str) -> Result<(), GrafanaError> {
        self.send(
            "delete_dashboard",
            self.request(Method::DELETE, &format!("/api/dashboards/uid/{uid}")),
        )
        .await
        .map(|_| ())
    }
}

/// Connector producing [`GrafanaClient`]s with a fixed request timeout
#[derive(Debug, Clone)]
pub struct HttpGrafanaConnector {
    timeout: Duration,
}

impl HttpGrafanaConnector {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GrafanaConnector for HttpGrafanaConnector {
    fn connect(
        &self,
        base_url: &str,
        authenticator: &Authenticator,
    ) -> Result<Arc<dyn GrafanaApi>, GrafanaError> {
        let mut config = GrafanaClientConfig::new(base_url);
        config.timeout = self.timeout;
        authenticator.apply_to(&mut config);
        Ok(Arc::new(GrafanaClient::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_strips_trailing_slash() {
        let config = GrafanaClientConfig::new("http://grafana:3000/");
        assert_eq!(config.base_url, "http://grafana:3000");
    }

    #[test]
    fn test_rejects_relative_url() {
        let result = GrafanaClient::new(GrafanaClientConfig::new("grafana-service:3000"));
        assert!(matches!(result, Err(GrafanaError::InvalidUrl { .. })));
    }

    #[test]
    fn test_rejects_empty_url() {
        let result = GrafanaClient::new(GrafanaClientConfig::new(""));
        assert!(matches!(result, Err(GrafanaError::InvalidUrl { .. })));
    }

    #[test]
    fn test_connector_applies_timeout() {
        let connector = HttpGrafanaConnector::new(Duration::from_secs(2));
        let auth = Authenticator::ApiToken("token".to_string());
        assert!(connector.connect("http://grafana:3000", &auth).is_ok());
    }

    #[test]
    fn test_config_debug_redacts_credentials() {
        let mut config = GrafanaClientConfig::new("http://grafana:3000");
        Authenticator::ApiToken("very-secret".to_string()).apply_to(&mut config);
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
