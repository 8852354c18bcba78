//! # Custom Resource Definitions
//!
//! CRD types for the Grafana Operator.
//!
//! ## Module Structure
//!
//! - `instance.rs` - `GrafanaInstance`: a Grafana deployment and its supporting objects
//! - `dashboard.rs` - `GrafanaDashboard`: one dashboard synced into a `GrafanaInstance`

mod dashboard;
mod instance;

// Re-export all public types
pub use dashboard::{
    default_folder, GrafanaDashboard, GrafanaDashboardSpec, GrafanaDashboardStatus,
    GrafanaInstanceRef,
};
pub use instance::{
    default_image, default_port, DeploymentConditionStatus, GrafanaInstance, GrafanaInstanceSpec,
    GrafanaInstanceStatus, GrafanaUiStatus,
};
