//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use grafana_operator::prelude::*;
//! ```
//!
//! This brings into scope:
//! - The CRD types (GrafanaInstance, GrafanaDashboard and their specs and statuses)
//! - The cluster and Grafana seams (ObjectStore, GrafanaApi, GrafanaConnector)
//! - The reconcile entry points and the shared error type
//! - The operator configuration

// CRD types
pub use crate::crd::*;

// Seams
pub use crate::cluster::{KubeStore, ManagedObject, ObjectStore};
pub use crate::grafana::{
    Authenticator, GrafanaApi, GrafanaClient, GrafanaConnector, GrafanaError,
    HttpGrafanaConnector,
};

// Reconcilers
pub use crate::controller::dashboard::{reconcile_dashboard, DashboardContext, DashboardState};
pub use crate::controller::instance::{reconcile_instance, Stage};
pub use crate::controller::Error;

// Configuration
pub use crate::config::{LogFormat, OperatorConfig};
