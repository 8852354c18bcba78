//! # Controller
//!
//! Core reconciliation logic of the Grafana Operator.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `checksum`: credential generation and fingerprinting
//! - `dashboard`: GrafanaDashboard lifecycle, folder resolution and dashboard sync
//! - `duration`: Go-style duration parsing for `syncPeriod`
//! - `error`: error taxonomy shared by both controllers
//! - `ini`: grafana.ini merge and rendering
//! - `instance`: GrafanaInstance stages and orchestrator
//! - `naming`: object names and labels of instance-owned objects

pub mod backoff;
pub mod checksum;
pub mod dashboard;
pub mod duration;
pub mod error;
pub mod ini;
pub mod instance;
pub mod naming;

pub use error::Error;
