//! # Grafana API
//!
//! Typed access to the subset of the Grafana HTTP API the operator needs:
//! health, folders and dashboards.
//!
//! - `auth`: token / basic authentication strategies
//! - `client`: `reqwest` implementation of [`GrafanaApi`]
//! - `types`: request and response bodies

mod auth;
mod client;
mod types;

pub use auth::Authenticator;
pub use client::{GrafanaClient, GrafanaClientConfig, HttpGrafanaConnector};
pub use types::{Folder, HealthResponse, SaveDashboardRequest, SaveDashboardResponse};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by the Grafana API client
#[derive(Debug, Error)]
pub enum GrafanaError {
    #[error("Grafana request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Grafana returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Grafana is not healthy: database '{database}', version '{version}'")]
    Unhealthy { database: String, version: String },

    #[error("Grafana did not accept the dashboard, status: {0}")]
    UnexpectedSaveStatus(String),

    #[error("Failed to decode Grafana response: {0}")]
    Decode(String),

    #[error("Invalid Grafana URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl GrafanaError {
    /// Whether Grafana answered 404 for the requested object
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, GrafanaError::Status { status: 404, .. })
    }
}

/// Remote dashboard service operations
///
/// One implementation per transport; the controllers only ever see this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrafanaApi: Send + Sync {
    /// `GET /api/health`
    async fn health(&self) -> Result<HealthResponse, GrafanaError>;

    /// `GET /api/folders`
    async fn folders(&self) -> Result<Vec<Folder>, GrafanaError>;

    /// `POST /api/folders`
    async fn create_folder(&self, title: &str) -> Result<Folder, GrafanaError>;

    /// `PUT /api/folders/{uid}`
    async fn update_folder(&self, uid: &str, title: &str) -> Result<Folder, GrafanaError>;

    /// `GET /api/folders/{uid}`
    async fn folder_by_uid(&self, uid: &str) -> Result<Folder, GrafanaError>;

    /// `POST /api/dashboards/db`
    async fn save_dashboard(
        &self,
        request: &SaveDashboardRequest,
    ) -> Result<SaveDashboardResponse, GrafanaError>;

    /// `DELETE /api/dashboards/uid/{uid}`
    async fn delete_dashboard(&self, uid: &str) -> Result<(), GrafanaError>;
}

/// Builds a [`GrafanaApi`] for one Grafana endpoint
///
/// Injected into the dashboard controller so tests can hand out mocks.
pub trait GrafanaConnector: Send + Sync {
    fn connect(
        &self,
        base_url: &str,
        authenticator: &Authenticator,
    ) -> Result<Arc<dyn GrafanaApi>, GrafanaError>;
}
