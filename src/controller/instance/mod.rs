//! # GrafanaInstance Orchestrator
//!
//! Converges the objects a Grafana instance needs, one stage per object kind, in a
//! fixed order:
//!
//! 1. `Secret` - generated admin credentials and their checksum
//! 2. `ConfigMap` - rendered grafana.ini
//! 3. `Pvc` - Grafana data volume
//! 4. `Deployment` - Grafana pods, annotated with the Secret checksum
//! 5. `Service` - stable endpoint selecting the Deployment's pods
//!
//! The Deployment stage reads the Secret's checksum and the PVC name, and the Service
//! selects the Deployment's labels, so the order matters. The first failing stage
//! stops the pass; the next pass repairs partial state since every stage is idempotent.
//! After all stages succeed the Deployment is read back into the instance status.

mod config_map;
mod deployment;
mod pvc;
mod secret;
mod service;

pub use config_map::desired_config_map;
pub use deployment::{desired_deployment, template_checksum};
pub use pvc::desired_pvc;
pub use secret::{desired_secret, read_credentials, secret_checksum};
pub use service::desired_service;

use crate::cluster::{ManagedObject, ObjectStore};
use crate::controller::naming;
use crate::controller::Error;
use crate::crd::{DeploymentConditionStatus, GrafanaInstance, GrafanaInstanceStatus, GrafanaUiStatus};
use crate::observability::metrics;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use tracing::{debug, info, Instrument};

/// One object kind converged for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Secret,
    ConfigMap,
    Pvc,
    Deployment,
    Service,
}

impl Stage {
    /// Stages in the order they run
    pub const ORDER: [Stage; 5] = [
        Stage::Secret,
        Stage::ConfigMap,
        Stage::Pvc,
        Stage::Deployment,
        Stage::Service,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Secret => "secret",
            Stage::ConfigMap => "configmap",
            Stage::Pvc => "pvc",
            Stage::Deployment => "deployment",
            Stage::Service => "service",
        }
    }

    /// Converge this stage's object for `instance`
    ///
    /// # Errors
    ///
    /// Any lookup, create or update failure, unchanged.
    pub async fn reconcile<S: ObjectStore>(
        self,
        store: &S,
        instance: &GrafanaInstance,
    ) -> Result<Outcome, Error> {
        match self {
            Stage::Secret => secret::reconcile(store, instance).await,
            Stage::ConfigMap => config_map::reconcile(store, instance).await,
            Stage::Pvc => pvc::reconcile(store, instance).await,
            Stage::Deployment => deployment::reconcile(store, instance).await,
            Stage::Service => service::reconcile(store, instance).await,
        }
    }
}

/// What a stage did to its object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// Create `desired` when absent, otherwise let `update` decide whether the existing
/// object must be replaced
///
/// `update` receives the live object and the desired one and returns the object to
/// write, or `None` when the live object already matches on the fields the stage owns.
pub(crate) async fn ensure_object<S, K, F>(
    store: &S,
    stage: Stage,
    desired: K,
    update: F,
) -> Result<Outcome, Error>
where
    S: ObjectStore,
    K: ManagedObject,
    F: FnOnce(K, &K) -> Result<Option<K>, Error> + Send,
{
    let name = desired.name_any();
    let namespace = desired.namespace().unwrap_or_default();

    match store.get::<K>(&namespace, &name).await? {
        None => {
            info!(stage = stage.as_str(), name = %name, "Creating {}", K::kind(&()));
            store.create(&namespace, &desired).await?;
            metrics::increment_stage_operations(stage.as_str(), "create");
            Ok(Outcome::Created)
        }
        Some(existing) => match update(existing, &desired)? {
            Some(updated) => {
                info!(stage = stage.as_str(), name = %name, "Updating {}", K::kind(&()));
                store.replace(&namespace, &updated).await?;
                metrics::increment_stage_operations(stage.as_str(), "update");
                Ok(Outcome::Updated)
            }
            None => {
                debug!(stage = stage.as_str(), name = %name, "Skip reconcile: {} is up-to-date", K::kind(&()));
                Ok(Outcome::Unchanged)
            }
        },
    }
}

/// Run all stages in order, then refresh the instance status from the Deployment
///
/// # Errors
///
/// The first stage error, `NotFound` when the Deployment cannot be read back, or
/// `Persist` when the status write fails.
pub async fn reconcile_instance<S: ObjectStore>(
    store: &S,
    instance: &GrafanaInstance,
) -> Result<(), Error> {
    for stage in Stage::ORDER {
        let span = tracing::info_span!("instance.stage", stage = stage.as_str());
        stage.reconcile(store, instance).instrument(span).await?;
    }

    update_status(store, instance).await
}

/// Read the Deployment back and persist availability, conditions and service URL
///
/// The write is skipped when the status would not change.
async fn update_status<S: ObjectStore>(
    store: &S,
    instance: &GrafanaInstance,
) -> Result<(), Error> {
    let namespace = instance.namespace();
    let deployment_name = naming::deployment_name(instance);
    let deployment = store
        .get::<Deployment>(namespace, &deployment_name)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "Deployment",
            namespace: namespace.to_string(),
            name: deployment_name.clone(),
        })?;

    let status = GrafanaInstanceStatus {
        grafana_ui: GrafanaUiStatus {
            available_replicas: replica_ratio(&deployment),
            conditions: conditions_of(&deployment),
            service_url: naming::service_url(instance),
        },
    };

    if instance.status.as_ref() == Some(&status) {
        debug!("Skip status update: GrafanaInstance status is up-to-date");
        return Ok(());
    }

    let available = status.grafana_ui.available_replicas.clone();
    let mut updated = instance.clone();
    updated.status = Some(status);
    store
        .replace_status(namespace, &updated)
        .await
        .map_err(Error::persist("GrafanaInstance status"))?;
    info!(available = %available, "Updated GrafanaInstance status");
    Ok(())
}

/// `<available>/<desired>` replicas; an unset replica count means one
#[must_use]
pub fn replica_ratio(deployment: &Deployment) -> String {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let available = deployment
        .status
        .as_ref()
        .and_then(|status| status.available_replicas)
        .unwrap_or(0);
    format!("{available}/{desired}")
}

fn conditions_of(deployment: &Deployment) -> Vec<DeploymentConditionStatus> {
    deployment
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .map(|c| DeploymentConditionStatus {
                    r#type: c.type_.clone(),
                    status: c.status.clone(),
                    reason: c.reason.clone(),
                    message: c.message.clone(),
                    last_update_time: time_text(c.last_update_time.as_ref()),
                    last_transition_time: time_text(c.last_transition_time.as_ref()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// RFC 3339 text of a Kubernetes timestamp
fn time_text<T: serde::Serialize>(time: Option<&T>) -> Option<String> {
    time.and_then(|t| serde_json::to_value(t).ok())
        .and_then(|v| v.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests;
