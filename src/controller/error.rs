//! # Errors
//!
//! Errors surfaced by the reconcilers. Nothing is retried inside a pass: every error
//! propagates to the controller runtime, which applies the error policy.

use crate::grafana::GrafanaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Lookup, create or update of a cluster object failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// A referenced object that must exist was not found
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// A prerequisite produced by an earlier stage is missing
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Grafana transport failure or non-success answer
    #[error("Grafana API error: {0}")]
    RemoteApi(#[from] GrafanaError),

    /// Input that can never succeed as is
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Writing back to the cluster (status, finalizers) failed
    #[error("Failed to persist {what}: {source}")]
    Persist {
        what: &'static str,
        #[source]
        source: kube::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Short label for metrics
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Kube(_) => "kube",
            Error::NotFound { .. } => "not_found",
            Error::Precondition(_) => "precondition",
            Error::RemoteApi(_) => "remote_api",
            Error::Validation(_) => "validation",
            Error::Persist { .. } => "persist",
            Error::Serialization(_) => "serialization",
        }
    }

    pub(crate) fn persist(what: &'static str) -> impl FnOnce(kube::Error) -> Self {
        move |source| Error::Persist { what, source }
    }
}
