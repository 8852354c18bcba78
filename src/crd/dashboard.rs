//! # GrafanaDashboard
//!
//! A dashboard document bound to one GrafanaInstance.

use crate::constants::GENERAL_FOLDER;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// GrafanaDashboard Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: grafana.minicali.com/v1alpha1
/// kind: GrafanaDashboard
/// metadata:
///   name: node-exporter
///   namespace: monitoring
/// spec:
///   grafanaInstanceRef:
///     name: grafana
///   folder: Infrastructure
///   name: Node Exporter
///   syncPeriod: 10m
///   json: |
///     {"title": "Node Exporter", "panels": []}
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "GrafanaDashboard",
    group = "grafana.minicali.com",
    version = "v1alpha1",
    namespaced,
    status = "GrafanaDashboardStatus",
    shortname = "gd",
    printcolumn = r#"{"name":"Folder", "type":"string", "jsonPath":".spec.folder"}, {"name":"UID", "type":"string", "jsonPath":".status.dashboardUID"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaDashboardSpec {
    /// GrafanaInstance the dashboard is synced into
    pub grafana_instance_ref: GrafanaInstanceRef,
    /// Folder title. "General" is Grafana's built-in folder and is never created.
    /// Default: "General"
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Display name, used as the dashboard title when the JSON model has none
    #[serde(default)]
    pub name: String,
    /// Resync interval, Go duration format (e.g., "30s", "5m", "1h30m")
    /// Default: "5m"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sync_period: String,
    /// Dashboard JSON model
    pub json: String,
}

/// Reference to the GrafanaInstance a dashboard belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaInstanceRef {
    pub name: String,
    /// Defaults to the dashboard's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Default value for the dashboard folder
pub fn default_folder() -> String {
    GENERAL_FOLDER.to_string()
}

/// Identifiers Grafana assigned on the last successful sync
///
/// Empty values are serialized so a status merge patch clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct GrafanaDashboardStatus {
    #[serde(rename = "folderUID", default)]
    pub folder_uid: String,
    #[serde(rename = "dashboardUID", default)]
    pub dashboard_uid: String,
}

impl GrafanaDashboard {
    /// Namespace of the referenced GrafanaInstance
    #[must_use]
    pub fn instance_namespace(&self) -> String {
        self.spec
            .grafana_instance_ref
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .or_else(|| self.metadata.namespace.clone())
            .unwrap_or_else(|| "default".to_string())
    }

    /// Folder the dashboard should live in, "General" when unset
    #[must_use]
    pub fn folder(&self) -> &str {
        if self.spec.folder.trim().is_empty() {
            GENERAL_FOLDER
        } else {
            &self.spec.folder
        }
    }

    /// Status identifiers, empty until the first successful sync
    #[must_use]
    pub fn synced_status(&self) -> GrafanaDashboardStatus {
        self.status.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dashboard(spec: serde_json::Value) -> GrafanaDashboard {
        let mut dashboard =
            GrafanaDashboard::new("overview", serde_json::from_value(spec).unwrap());
        dashboard.metadata.namespace = Some("apps".to_string());
        dashboard
    }

    #[test]
    fn test_spec_defaults() {
        let d = dashboard(json!({
            "grafanaInstanceRef": {"name": "grafana"},
            "json": "{}"
        }));
        assert_eq!(d.spec.folder, "General");
        assert_eq!(d.spec.sync_period, "");
        assert_eq!(d.instance_namespace(), "apps");
    }

    #[test]
    fn test_instance_namespace_override() {
        let d = dashboard(json!({
            "grafanaInstanceRef": {"name": "grafana", "namespace": "monitoring"},
            "json": "{}"
        }));
        assert_eq!(d.instance_namespace(), "monitoring");
    }

    #[test]
    fn test_status_field_names() {
        let status = GrafanaDashboardStatus {
            folder_uid: "f1".to_string(),
            dashboard_uid: "d1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"folderUID": "f1", "dashboardUID": "d1"})
        );
    }

    #[test]
    fn test_empty_status_fields_are_serialized() {
        let status = GrafanaDashboardStatus {
            folder_uid: String::new(),
            dashboard_uid: "d1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"folderUID": "", "dashboardUID": "d1"})
        );
    }
}
