//! # Naming
//!
//! Names and labels of the objects owned by a GrafanaInstance.

use crate::constants::OPERATOR_NAME;
use crate::crd::GrafanaInstance;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use std::collections::BTreeMap;

pub const DEPLOYMENT_SUFFIX: &str = "ui";
pub const PVC_SUFFIX: &str = "pvc";
pub const CONFIG_MAP_SUFFIX: &str = "config-ini";
pub const SERVICE_SUFFIX: &str = "service";

/// `<instance>-<suffix>`
#[must_use]
pub fn prefixed_name(instance_name: &str, suffix: &str) -> String {
    format!("{instance_name}-{suffix}")
}

#[must_use]
pub fn deployment_name(instance: &GrafanaInstance) -> String {
    prefixed_name(instance.name(), DEPLOYMENT_SUFFIX)
}

#[must_use]
pub fn pvc_name(instance: &GrafanaInstance) -> String {
    prefixed_name(instance.name(), PVC_SUFFIX)
}

#[must_use]
pub fn config_map_name(instance: &GrafanaInstance) -> String {
    prefixed_name(instance.name(), CONFIG_MAP_SUFFIX)
}

#[must_use]
pub fn service_name(instance: &GrafanaInstance) -> String {
    prefixed_name(instance.name(), SERVICE_SUFFIX)
}

/// In-cluster URL of the instance's Service
#[must_use]
pub fn service_url(instance: &GrafanaInstance) -> String {
    format!(
        "http://{}.{}.svc.cluster.local:{}",
        service_name(instance),
        instance.namespace(),
        instance.spec.port
    )
}

/// Standard labels of an instance-owned object
#[must_use]
pub fn labels(instance_name: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app.kubernetes.io/name".to_string(), "grafana".to_string()),
        (
            "app.kubernetes.io/instance".to_string(),
            instance_name.to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            OPERATOR_NAME.to_string(),
        ),
        (
            "app.kubernetes.io/component".to_string(),
            component.to_string(),
        ),
    ])
}

/// Metadata of an instance-owned object, with a controller owner reference when the
/// instance has a UID
#[must_use]
pub fn owned_meta(instance: &GrafanaInstance, name: String, component: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(instance.namespace().to_string()),
        labels: Some(labels(instance.name(), component)),
        owner_references: instance.controller_owner_ref(&()).map(|owner| vec![owner]),
        ..Default::default()
    }
}
