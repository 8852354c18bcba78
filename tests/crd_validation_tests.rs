//! # CRD Validation Tests
//!
//! Tests for both CRDs to catch schema drift early: sample manifests must
//! deserialize with the expected defaults and the generated CRDs must keep
//! their group, names and status subresources.

use grafana_operator::crd::{GrafanaDashboard, GrafanaInstance};
use kube::CustomResourceExt;

#[test]
fn test_instance_manifest_with_all_fields() {
    let yaml = r#"
apiVersion: grafana.minicali.com/v1alpha1
kind: GrafanaInstance
metadata:
  name: grafana
  namespace: monitoring
spec:
  image: grafana/grafana:10.4.2
  port: 8080
  credentialsSecretName: grafana-admin
  iniConfig:
    server:
      root_url: https://grafana.example.com
    auth.anonymous:
      enabled: true
"#;

    let instance: GrafanaInstance =
        serde_yaml::from_str(yaml).expect("Should deserialize instance with all fields");

    assert_eq!(instance.spec.image, "grafana/grafana:10.4.2");
    assert_eq!(instance.spec.port, 8080);
    assert_eq!(instance.credentials_secret_name(), "grafana-admin");
    assert_eq!(instance.spec.ini_config.len(), 2);
    assert_eq!(
        instance.spec.ini_config["auth.anonymous"]["enabled"],
        serde_json::json!(true)
    );
}

#[test]
fn test_instance_manifest_minimal() {
    let yaml = r#"
apiVersion: grafana.minicali.com/v1alpha1
kind: GrafanaInstance
metadata:
  name: grafana
  namespace: monitoring
spec: {}
"#;

    let instance: GrafanaInstance =
        serde_yaml::from_str(yaml).expect("Should deserialize minimal instance");

    assert_eq!(instance.spec.image, "grafana/grafana:10.0.0");
    assert_eq!(instance.spec.port, 3000);
    assert_eq!(instance.credentials_secret_name(), "grafana-admin-credentials");
    assert!(instance.spec.ini_config.is_empty());
    assert!(instance.status.is_none());
}

#[test]
fn test_instance_status_field_names() {
    let yaml = r#"
apiVersion: grafana.minicali.com/v1alpha1
kind: GrafanaInstance
metadata:
  name: grafana
  namespace: monitoring
spec: {}
status:
  grafanaUI:
    availableReplicas: 1/1
    serviceURL: http://grafana-service.monitoring.svc.cluster.local:3000
    conditions:
      - type: Available
        status: "True"
        reason: MinimumReplicasAvailable
"#;

    let instance: GrafanaInstance =
        serde_yaml::from_str(yaml).expect("Should deserialize instance status");
    let ui = instance.status.expect("status present").grafana_ui;

    assert_eq!(ui.available_replicas, "1/1");
    assert_eq!(
        ui.service_url,
        "http://grafana-service.monitoring.svc.cluster.local:3000"
    );
    assert_eq!(ui.conditions.len(), 1);
    assert_eq!(ui.conditions[0].r#type, "Available");
    assert_eq!(
        ui.conditions[0].reason.as_deref(),
        Some("MinimumReplicasAvailable")
    );
}

#[test]
fn test_dashboard_manifest_with_all_fields() {
    let yaml = r#"
apiVersion: grafana.minicali.com/v1alpha1
kind: GrafanaDashboard
metadata:
  name: node-exporter
  namespace: apps
spec:
  grafanaInstanceRef:
    name: grafana
    namespace: monitoring
  folder: Infrastructure
  name: Node Exporter
  syncPeriod: 10m
  json: |
    {"title": "Node Exporter", "panels": []}
status:
  folderUID: nErXDvCkzz
  dashboardUID: cIBgcSjkk
"#;

    let dashboard: GrafanaDashboard =
        serde_yaml::from_str(yaml).expect("Should deserialize dashboard with all fields");

    assert_eq!(dashboard.instance_namespace(), "monitoring");
    assert_eq!(dashboard.folder(), "Infrastructure");
    assert_eq!(dashboard.spec.name, "Node Exporter");
    assert_eq!(dashboard.spec.sync_period, "10m");
    assert!(dashboard.spec.json.contains("\"panels\""));

    let status = dashboard.synced_status();
    assert_eq!(status.folder_uid, "nErXDvCkzz");
    assert_eq!(status.dashboard_uid, "cIBgcSjkk");
}

#[test]
fn test_dashboard_manifest_minimal() {
    let yaml = r#"
apiVersion: grafana.minicali.com/v1alpha1
kind: GrafanaDashboard
metadata:
  name: overview
  namespace: apps
spec:
  grafanaInstanceRef:
    name: grafana
  json: "{}"
"#;

    let dashboard: GrafanaDashboard =
        serde_yaml::from_str(yaml).expect("Should deserialize minimal dashboard");

    // Instance lives next to the dashboard when the ref has no namespace
    assert_eq!(dashboard.instance_namespace(), "apps");
    assert_eq!(dashboard.folder(), "General");
    assert!(dashboard.spec.sync_period.is_empty());
    assert_eq!(dashboard.synced_status().dashboard_uid, "");
}

#[test]
fn test_dashboard_requires_instance_ref_and_json() {
    let yaml = r#"
apiVersion: grafana.minicali.com/v1alpha1
kind: GrafanaDashboard
metadata:
  name: broken
spec:
  folder: Infrastructure
"#;

    let result: Result<GrafanaDashboard, _> = serde_yaml::from_str(yaml);
    assert!(result.is_err(), "grafanaInstanceRef and json are required");
}

#[test]
fn test_generated_crds() {
    let instance = GrafanaInstance::crd();
    assert_eq!(instance.spec.group, "grafana.minicali.com");
    assert_eq!(instance.spec.names.kind, "GrafanaInstance");
    assert_eq!(instance.spec.names.plural, "grafanainstances");
    assert_eq!(instance.spec.scope, "Namespaced");

    let dashboard = GrafanaDashboard::crd();
    assert_eq!(dashboard.spec.group, "grafana.minicali.com");
    assert_eq!(dashboard.spec.names.kind, "GrafanaDashboard");
    assert_eq!(
        dashboard.spec.names.short_names,
        Some(vec!["gd".to_string()])
    );

    for crd in [&instance, &dashboard] {
        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1alpha1");
        assert!(
            version
                .subresources
                .as_ref()
                .and_then(|s| s.status.as_ref())
                .is_some(),
            "{} must expose a status subresource",
            crd.spec.names.kind
        );
    }
}

#[test]
fn test_generated_crds_serialize_to_yaml() {
    let yaml = serde_yaml::to_string(&GrafanaInstance::crd()).expect("serialize instance CRD");
    assert!(yaml.contains("iniConfig"));
    assert!(yaml.contains("x-kubernetes-preserve-unknown-fields"));

    let yaml = serde_yaml::to_string(&GrafanaDashboard::crd()).expect("serialize dashboard CRD");
    assert!(yaml.contains("grafanaInstanceRef"));
    assert!(yaml.contains("syncPeriod"));
}
