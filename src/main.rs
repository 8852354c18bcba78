//! # Grafana Operator
//!
//! A Kubernetes operator that runs Grafana instances and keeps their dashboards in sync.
//!
//! ## Overview
//!
//! 1. **GrafanaInstance** - converges the admin credentials Secret, the `grafana.ini`
//!    ConfigMap, the data PVC, the Deployment and the Service, and reports the
//!    Deployment's availability on the instance status
//! 2. **Credential rollout** - the Deployment's pod template carries the checksum of the
//!    credentials Secret, so changed credentials roll out new pods
//! 3. **GrafanaDashboard** - resolves the dashboard's folder, pushes the dashboard model
//!    to the referenced instance on every sync period, and deletes it from Grafana
//!    before the resource goes away
//!
//! ## Usage
//!
//! See the [README.md](../README.md) for detailed usage instructions and examples.

use anyhow::Result;
use grafana_operator::runtime::{initialize, run_watch_loops};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loops(init).await?;

    info!("Grafana Operator stopped");
    Ok(())
}
