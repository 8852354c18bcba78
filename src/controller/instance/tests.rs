//! Orchestrator scenarios against the in-memory store.

use super::*;
use crate::cluster::memory::{MemoryStore, Operation};
use crate::controller::checksum::{self, Credentials};
use crate::crd::GrafanaInstanceSpec;
use k8s_openapi::api::apps::v1::{DeploymentCondition, DeploymentStatus};
use k8s_openapi::api::core::v1::Secret;

fn instance() -> GrafanaInstance {
    let mut instance = GrafanaInstance::new("grafana", GrafanaInstanceSpec::default());
    instance.metadata.namespace = Some("monitoring".to_string());
    instance.metadata.uid = Some("7f1c2a3b".to_string());
    instance
}

/// Store seeded with the instance itself so status writes have a target
fn store_with(instance: &GrafanaInstance) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(instance);
    store
}

fn stored_instance(store: &MemoryStore) -> GrafanaInstance {
    store.fetch("monitoring", "grafana").unwrap()
}

fn mark_available(store: &MemoryStore, available: i32) {
    let mut deployment: Deployment = store.fetch("monitoring", "grafana-ui").unwrap();
    deployment.status = Some(DeploymentStatus {
        available_replicas: Some(available),
        conditions: Some(vec![DeploymentCondition {
            type_: "Available".to_string(),
            status: "True".to_string(),
            reason: Some("MinimumReplicasAvailable".to_string()),
            message: Some("Deployment has minimum availability.".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    });
    store.insert(&deployment);
}

fn seed_secret(store: &MemoryStore, instance: &GrafanaInstance, credentials: &Credentials) {
    store.insert(&secret::desired_secret(instance, credentials));
}

#[tokio::test]
async fn test_new_instance_creates_all_objects_in_order() {
    let instance = instance();
    let store = store_with(&instance);

    reconcile_instance(&store, &instance).await.unwrap();

    assert_eq!(
        store.operations(),
        vec![
            Operation::new("Secret", "create", "grafana-admin-credentials"),
            Operation::new("ConfigMap", "create", "grafana-config-ini"),
            Operation::new("PersistentVolumeClaim", "create", "grafana-pvc"),
            Operation::new("Deployment", "create", "grafana-ui"),
            Operation::new("Service", "create", "grafana-service"),
            Operation::new("GrafanaInstance", "replace_status", "grafana"),
        ]
    );

    let status = stored_instance(&store).status.unwrap().grafana_ui;
    assert_eq!(status.available_replicas, "0/1");
    assert_eq!(
        status.service_url,
        "http://grafana-service.monitoring.svc.cluster.local:3000"
    );
}

#[tokio::test]
async fn test_status_reflects_deployment_replicas_and_conditions() {
    let instance = instance();
    let store = store_with(&instance);
    reconcile_instance(&store, &instance).await.unwrap();

    mark_available(&store, 1);
    let current = stored_instance(&store);
    reconcile_instance(&store, &current).await.unwrap();

    let status = stored_instance(&store).status.unwrap().grafana_ui;
    assert_eq!(status.available_replicas, "1/1");
    assert_eq!(status.conditions.len(), 1);
    assert_eq!(status.conditions[0].r#type, "Available");
    assert_eq!(
        status.conditions[0].reason.as_deref(),
        Some("MinimumReplicasAvailable")
    );
}

#[tokio::test]
async fn test_second_pass_performs_no_mutations() {
    let instance = instance();
    let store = store_with(&instance);
    reconcile_instance(&store, &instance).await.unwrap();
    store.clear_operations();

    let current = stored_instance(&store);
    reconcile_instance(&store, &current).await.unwrap();

    assert!(store.operations().is_empty(), "{:?}", store.operations());
}

#[tokio::test]
async fn test_matching_checksum_leaves_deployment_alone() {
    let instance = instance();
    let store = store_with(&instance);
    let credentials = Credentials {
        username: "admin".to_string(),
        password: "first".to_string(),
    };
    seed_secret(&store, &instance, &credentials);
    store.insert(&desired_deployment(&instance, &credentials.fingerprint()));

    reconcile_instance(&store, &instance).await.unwrap();

    assert!(store.operations_for("Deployment").is_empty());
    assert!(store.operations_for("Secret").is_empty());
}

#[tokio::test]
async fn test_regenerated_secret_rolls_deployment() {
    let instance = instance();
    let store = store_with(&instance);
    let first = Credentials {
        username: "admin".to_string(),
        password: "first".to_string(),
    };
    seed_secret(&store, &instance, &first);
    reconcile_instance(&store, &instance).await.unwrap();

    let deployment: Deployment = store.fetch("monitoring", "grafana-ui").unwrap();
    assert_eq!(template_checksum(&deployment), Some(first.fingerprint().as_str()));

    // Credentials rotated out of band, checksum annotation maintained alongside
    let second = Credentials {
        username: "admin".to_string(),
        password: "second".to_string(),
    };
    seed_secret(&store, &instance, &second);
    store.clear_operations();

    let current = stored_instance(&store);
    reconcile_instance(&store, &current).await.unwrap();

    assert_eq!(
        store.operations_for("Deployment"),
        vec![Operation::new("Deployment", "replace", "grafana-ui")]
    );
    let deployment: Deployment = store.fetch("monitoring", "grafana-ui").unwrap();
    assert_eq!(
        template_checksum(&deployment),
        Some(checksum::fingerprint("admin", "second").as_str())
    );
}

#[tokio::test]
async fn test_deployment_checksum_tracks_secret_after_every_pass() {
    let instance = instance();
    let store = store_with(&instance);

    reconcile_instance(&store, &instance).await.unwrap();

    let secret: Secret = store
        .fetch("monitoring", "grafana-admin-credentials")
        .unwrap();
    let deployment: Deployment = store.fetch("monitoring", "grafana-ui").unwrap();
    assert_eq!(secret_checksum(&secret), template_checksum(&deployment));
    assert_eq!(
        deployment.metadata.annotations.unwrap()["secret-checksum"],
        secret_checksum(&secret).unwrap()
    );
}

#[tokio::test]
async fn test_failing_stage_stops_the_pass() {
    let instance = instance();
    let store = store_with(&instance);
    // A Secret the operator cannot read: the Secret stage fails first
    let mut broken = secret::desired_secret(&instance, &Credentials::generate());
    broken.data = None;
    store.insert(&broken);

    let result = reconcile_instance(&store, &instance).await;

    assert!(matches!(result, Err(Error::Precondition(_))));
    assert!(store.operations().is_empty());
}

#[test]
fn test_replica_ratio_defaults_to_one_desired() {
    let deployment = Deployment::default();
    assert_eq!(replica_ratio(&deployment), "0/1");
}

#[test]
fn test_stage_order() {
    assert_eq!(
        Stage::ORDER.map(|stage| stage.as_str()),
        ["secret", "configmap", "pvc", "deployment", "service"]
    );
}
