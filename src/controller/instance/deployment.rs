//! Deployment stage: the Grafana pods.
//!
//! The pod template carries the credentials Secret's checksum as an annotation, so a
//! credentials change alters the template and triggers a rollout. Drift detection only
//! looks at the fields this stage sets, not at server-side defaults.

use super::secret::secret_checksum;
use super::{ensure_object, Outcome, Stage};
use crate::cluster::ObjectStore;
use crate::constants::{
    GRAFANA_CONFIG_MOUNT_PATH, GRAFANA_CONTAINER_PORT_NAME, GRAFANA_DATA_MOUNT_PATH,
    GRAFANA_FS_GROUP, GRAFANA_INI_KEY, SECRET_CHECKSUM_ANNOTATION, SECRET_PASSWORD_KEY,
    SECRET_USERNAME_KEY,
};
use crate::controller::{naming, Error};
use crate::crd::GrafanaInstance;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource,
    PersistentVolumeClaimVolumeSource, PodSecurityContext, PodSpec, PodTemplateSpec, Secret,
    SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;
use tracing::info;

const CONTAINER_NAME: &str = "grafana";
const CONFIG_VOLUME: &str = "grafana-config";
const CONFIG_FILE_MODE: i32 = 0o644;

pub(super) async fn reconcile<S: ObjectStore>(
    store: &S,
    instance: &GrafanaInstance,
) -> Result<Outcome, Error> {
    let secret_name = instance.credentials_secret_name();
    let secret = store
        .get::<Secret>(instance.namespace(), &secret_name)
        .await?
        .ok_or_else(|| {
            Error::Precondition(format!(
                "credentials Secret {}/{secret_name} does not exist",
                instance.namespace()
            ))
        })?;
    let checksum = secret_checksum(&secret).ok_or_else(|| {
        Error::Precondition(format!(
            "credentials Secret {}/{secret_name} has no checksum annotation",
            instance.namespace()
        ))
    })?;

    let desired = desired_deployment(instance, checksum);

    ensure_object(store, Stage::Deployment, desired, |mut existing, desired| {
        if TemplateView::of(&existing) == TemplateView::of(desired) {
            return Ok(None);
        }
        info!(
            from = template_checksum(&existing).unwrap_or("none"),
            to = template_checksum(desired).unwrap_or("none"),
            "Deployment pod template drifted"
        );
        existing
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(
                SECRET_CHECKSUM_ANNOTATION.to_string(),
                checksum.to_string(),
            );
        let desired_template = desired.spec.as_ref().map(|spec| spec.template.clone());
        match (&mut existing.spec, desired_template) {
            (Some(spec), Some(template)) => spec.template = template,
            (spec, _) => spec.clone_from(&desired.spec),
        }
        Ok(Some(existing))
    })
    .await
}

/// Grafana Deployment reading its admin credentials from the instance's Secret
#[must_use]
pub fn desired_deployment(instance: &GrafanaInstance, secret_checksum: &str) -> Deployment {
    let labels = naming::labels(instance.name(), "deployment");
    let annotations = BTreeMap::from([(
        SECRET_CHECKSUM_ANNOTATION.to_string(),
        secret_checksum.to_string(),
    )]);

    let mut metadata = naming::owned_meta(instance, naming::deployment_name(instance), "deployment");
    metadata.annotations = Some(annotations.clone());

    Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(annotations),
                    ..Default::default()
                }),
                spec: Some(pod_spec(instance)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_spec(instance: &GrafanaInstance) -> PodSpec {
    let pvc_name = naming::pvc_name(instance);
    let secret_name = instance.credentials_secret_name();

    PodSpec {
        security_context: Some(PodSecurityContext {
            fs_group: Some(GRAFANA_FS_GROUP),
            supplemental_groups: Some(vec![0]),
            ..Default::default()
        }),
        containers: vec![Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(instance.spec.image.clone()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            ports: Some(vec![ContainerPort {
                container_port: instance.spec.port,
                name: Some(GRAFANA_CONTAINER_PORT_NAME.to_string()),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            env: Some(vec![
                secret_env("GF_SECURITY_ADMIN_USER", &secret_name, SECRET_USERNAME_KEY),
                secret_env(
                    "GF_SECURITY_ADMIN_PASSWORD",
                    &secret_name,
                    SECRET_PASSWORD_KEY,
                ),
            ]),
            volume_mounts: Some(vec![
                VolumeMount {
                    name: pvc_name.clone(),
                    mount_path: GRAFANA_DATA_MOUNT_PATH.to_string(),
                    ..Default::default()
                },
                VolumeMount {
                    name: CONFIG_VOLUME.to_string(),
                    mount_path: format!("{GRAFANA_CONFIG_MOUNT_PATH}/{GRAFANA_INI_KEY}"),
                    sub_path: Some(GRAFANA_INI_KEY.to_string()),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }],
        volumes: Some(vec![
            Volume {
                name: pvc_name.clone(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: pvc_name,
                    ..Default::default()
                }),
                ..Default::default()
            },
            Volume {
                name: CONFIG_VOLUME.to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: naming::config_map_name(instance),
                    default_mode: Some(CONFIG_FILE_MODE),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

fn secret_env(name: &str, secret_name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret_name.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Secret checksum recorded on a Deployment's pod template
#[must_use]
pub fn template_checksum(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.metadata.as_ref())
        .and_then(|meta| meta.annotations.as_ref())
        .and_then(|annotations| annotations.get(SECRET_CHECKSUM_ANNOTATION))
        .map(String::as_str)
}

/// The pod template fields owned by this stage
#[derive(Debug, PartialEq, Eq)]
struct TemplateView<'a> {
    checksum: Option<&'a str>,
    image: Option<&'a str>,
    ports: Vec<(Option<&'a str>, i32)>,
    env: Vec<(&'a str, Option<(&'a str, &'a str)>)>,
    mounts: Vec<(&'a str, &'a str)>,
    claims: Vec<&'a str>,
    config_maps: Vec<&'a str>,
}

impl<'a> TemplateView<'a> {
    fn of(deployment: &'a Deployment) -> Self {
        let pod = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.template.spec.as_ref());
        let container = pod.and_then(|pod| pod.containers.iter().find(|c| c.name == CONTAINER_NAME));
        let volumes = pod.and_then(|pod| pod.volumes.as_deref()).unwrap_or_default();

        Self {
            checksum: template_checksum(deployment),
            image: container.and_then(|c| c.image.as_deref()),
            ports: container
                .and_then(|c| c.ports.as_deref())
                .unwrap_or_default()
                .iter()
                .map(|p| (p.name.as_deref(), p.container_port))
                .collect(),
            env: container
                .and_then(|c| c.env.as_deref())
                .unwrap_or_default()
                .iter()
                .map(|e| {
                    let reference = e
                        .value_from
                        .as_ref()
                        .and_then(|source| source.secret_key_ref.as_ref())
                        .map(|r| (r.name.as_str(), r.key.as_str()));
                    (e.name.as_str(), reference)
                })
                .collect(),
            mounts: container
                .and_then(|c| c.volume_mounts.as_deref())
                .unwrap_or_default()
                .iter()
                .map(|m| (m.name.as_str(), m.mount_path.as_str()))
                .collect(),
            claims: volumes
                .iter()
                .filter_map(|v| v.persistent_volume_claim.as_ref())
                .map(|claim| claim.claim_name.as_str())
                .collect(),
            config_maps: volumes
                .iter()
                .filter_map(|v| v.config_map.as_ref())
                .map(|cm| cm.name.as_str())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::MemoryStore;
    use crate::controller::checksum::Credentials;
    use crate::controller::instance::secret::desired_secret;
    use crate::crd::GrafanaInstanceSpec;

    fn instance() -> GrafanaInstance {
        let mut instance = GrafanaInstance::new("grafana", GrafanaInstanceSpec::default());
        instance.metadata.namespace = Some("monitoring".to_string());
        instance
    }

    #[test]
    fn test_desired_deployment_shape() {
        let deployment = desired_deployment(&instance(), "abc");
        assert_eq!(deployment.metadata.name.as_deref(), Some("grafana-ui"));
        assert_eq!(template_checksum(&deployment), Some("abc"));

        let pod = deployment.spec.unwrap().template.spec.unwrap();
        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some("grafana/grafana:10.0.0"));
        assert_eq!(
            container.ports.as_ref().unwrap()[0].name.as_deref(),
            Some("http-grafana")
        );

        let env = container.env.as_ref().unwrap();
        let user = env[0].value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap();
        assert_eq!(env[0].name, "GF_SECURITY_ADMIN_USER");
        assert_eq!(user.name, "grafana-admin-credentials");
        assert_eq!(user.key, "admin_username");
        assert!(env.iter().all(|e| e.value.is_none()));

        let claim = pod.volumes.unwrap()[0]
            .persistent_volume_claim
            .clone()
            .unwrap();
        assert_eq!(claim.claim_name, "grafana-pvc");
        assert_eq!(pod.security_context.unwrap().fs_group, Some(472));
    }

    #[tokio::test]
    async fn test_missing_secret_is_precondition_error() {
        let store = MemoryStore::new();
        let result = reconcile(&store, &instance()).await;
        assert!(matches!(result, Err(Error::Precondition(_))));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_secret_without_checksum_is_precondition_error() {
        let store = MemoryStore::new();
        let mut secret = desired_secret(&instance(), &Credentials::generate());
        secret.metadata.annotations = None;
        store.insert(&secret);

        let result = reconcile(&store, &instance()).await;
        assert!(matches!(result, Err(Error::Precondition(_))));
    }

    #[tokio::test]
    async fn test_image_change_updates_template() {
        let store = MemoryStore::new();
        store.insert(&desired_secret(&instance(), &Credentials::generate()));
        assert_eq!(reconcile(&store, &instance()).await.unwrap(), Outcome::Created);

        let mut upgraded = instance();
        upgraded.spec.image = "grafana/grafana:11.0.0".to_string();
        assert_eq!(reconcile(&store, &upgraded).await.unwrap(), Outcome::Updated);
        assert_eq!(reconcile(&store, &upgraded).await.unwrap(), Outcome::Unchanged);

        let deployment: Deployment = store.fetch("monitoring", "grafana-ui").unwrap();
        let image = deployment.spec.unwrap().template.spec.unwrap().containers[0]
            .image
            .clone();
        assert_eq!(image.as_deref(), Some("grafana/grafana:11.0.0"));
    }

    #[test]
    fn test_server_defaults_do_not_count_as_drift() {
        let desired = desired_deployment(&instance(), "abc");
        let mut live = desired.clone();
        let pod = live.spec.as_mut().unwrap().template.spec.as_mut().unwrap();
        pod.containers[0].termination_message_path = Some("/dev/termination-log".to_string());
        pod.restart_policy = Some("Always".to_string());
        pod.dns_policy = Some("ClusterFirst".to_string());
        assert_eq!(TemplateView::of(&live), TemplateView::of(&desired));
    }
}
