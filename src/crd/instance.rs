//! # GrafanaInstance
//!
//! Desired state of a Grafana deployment and the status read back from it.

use crate::constants::{DEFAULT_GRAFANA_IMAGE, DEFAULT_GRAFANA_PORT};
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GrafanaInstance Custom Resource Definition
///
/// The operator converges five objects for every instance, in this order:
/// the admin credentials Secret, the `grafana.ini` ConfigMap, the data PVC,
/// the Deployment and the Service.
///
/// # Example
///
/// ```yaml
/// apiVersion: grafana.minicali.com/v1alpha1
/// kind: GrafanaInstance
/// metadata:
///   name: grafana
///   namespace: monitoring
/// spec:
///   image: grafana/grafana:10.0.0
///   port: 3000
///   iniConfig:
///     server:
///       root_url: https://grafana.example.com
///     auth.anonymous:
///       enabled: true
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "GrafanaInstance",
    group = "grafana.minicali.com",
    version = "v1alpha1",
    namespaced,
    status = "GrafanaInstanceStatus",
    shortname = "gi",
    printcolumn = r#"{"name":"Available", "type":"string", "jsonPath":".status.grafanaUI.availableReplicas"}, {"name":"URL", "type":"string", "jsonPath":".status.grafanaUI.serviceURL"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaInstanceSpec {
    /// Grafana container image
    /// Default: "grafana/grafana:10.0.0"
    #[serde(default = "default_image")]
    pub image: String,
    /// Port Grafana listens on, also used as the Service port
    /// Default: 3000
    #[serde(default = "default_port")]
    pub port: i32,
    /// Name of the Secret holding the generated admin credentials
    /// Default: "<name>-admin-credentials"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub credentials_secret_name: String,
    /// grafana.ini content: section name to key/value document
    /// Merged over the operator defaults, user values win.
    #[serde(default)]
    #[schemars(schema_with = "ini_config_schema")]
    pub ini_config: BTreeMap<String, serde_json::Value>,
}

impl Default for GrafanaInstanceSpec {
    fn default() -> Self {
        Self {
            image: default_image(),
            port: default_port(),
            credentials_secret_name: String::new(),
            ini_config: BTreeMap::new(),
        }
    }
}

/// Default value for the Grafana image
pub fn default_image() -> String {
    DEFAULT_GRAFANA_IMAGE.to_string()
}

/// Default value for the Grafana port
pub fn default_port() -> i32 {
    DEFAULT_GRAFANA_PORT
}

fn ini_config_schema(_gen: &mut SchemaGenerator) -> Schema {
    // Sections are free-form; keep unknown fields instead of pruning them
    let schema_value = serde_json::json!({
        "type": "object",
        "description": "grafana.ini sections. Each key is a section name, each value a key/value document.",
        "additionalProperties": {
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true
        }
    });
    Schema::try_from(schema_value).expect("Failed to create Schema for iniConfig")
}

/// Observed state of a GrafanaInstance
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaInstanceStatus {
    #[serde(rename = "grafanaUI", default)]
    pub grafana_ui: GrafanaUiStatus,
}

/// Status of the Grafana workload
///
/// Empty values are serialized so a status merge patch clears them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaUiStatus {
    /// "<available>/<desired>" replicas of the Deployment
    #[serde(default)]
    pub available_replicas: String,
    /// Deployment conditions, copied verbatim
    #[serde(default)]
    pub conditions: Vec<DeploymentConditionStatus>,
    /// In-cluster URL of the Grafana Service
    #[serde(rename = "serviceURL", default)]
    pub service_url: String,
}

/// A Deployment condition as reported on the instance status
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConditionStatus {
    #[serde(rename = "type")]
    pub r#type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl GrafanaInstance {
    /// Instance name, empty when unset
    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Instance namespace, "default" when unset
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("default")
    }

    /// Name of the admin credentials Secret
    #[must_use]
    pub fn credentials_secret_name(&self) -> String {
        if self.spec.credentials_secret_name.trim().is_empty() {
            format!("{}-admin-credentials", self.name())
        } else {
            self.spec.credentials_secret_name.clone()
        }
    }
}
