//! PersistentVolumeClaim stage: Grafana's data volume.
//!
//! Created once. A bound claim's spec is immutable, so an existing claim is left alone.

use super::{ensure_object, Outcome, Stage};
use crate::cluster::ObjectStore;
use crate::constants::DEFAULT_PVC_STORAGE;
use crate::controller::{naming, Error};
use crate::crd::GrafanaInstance;
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

pub(super) async fn reconcile<S: ObjectStore>(
    store: &S,
    instance: &GrafanaInstance,
) -> Result<Outcome, Error> {
    ensure_object(store, Stage::Pvc, desired_pvc(instance), |_, _| Ok(None)).await
}

/// 1Gi ReadWriteOnce claim on the default storage class
#[must_use]
pub fn desired_pvc(instance: &GrafanaInstance) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: naming::owned_meta(instance, naming::pvc_name(instance), "pvc"),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(DEFAULT_PVC_STORAGE.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
