//! Grafana Operator Library
//!
//! This library provides the core functionality for the Grafana Operator:
//! the GrafanaInstance convergence pipeline, the credential change detection
//! that forces a redeploy, and the GrafanaDashboard synchronization against the
//! Grafana HTTP API.
//!
//! Tests are included in the module files (e.g., `controller/instance/mod.rs`).
//!
//! ## Quick Start
//!
//! ```rust
//! use grafana_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod cluster;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod grafana;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
