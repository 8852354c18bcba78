//! Service stage: a ClusterIP Service in front of the Grafana pods.

use super::{ensure_object, Outcome, Stage};
use crate::cluster::ObjectStore;
use crate::constants::GRAFANA_CONTAINER_PORT_NAME;
use crate::controller::{naming, Error};
use crate::crd::GrafanaInstance;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

const SERVICE_PORT_NAME: &str = "http";

pub(super) async fn reconcile<S: ObjectStore>(
    store: &S,
    instance: &GrafanaInstance,
) -> Result<Outcome, Error> {
    let desired = desired_service(instance);

    ensure_object(store, Stage::Service, desired, |mut existing, desired| {
        let Some(desired_spec) = desired.spec.as_ref() else {
            return Ok(None);
        };
        match &mut existing.spec {
            Some(spec) => {
                if port_view(spec) == port_view(desired_spec)
                    && spec.selector == desired_spec.selector
                {
                    return Ok(None);
                }
                // clusterIP and other allocated fields stay as they are
                spec.ports.clone_from(&desired_spec.ports);
                spec.selector.clone_from(&desired_spec.selector);
            }
            slot @ None => *slot = Some(desired_spec.clone()),
        }
        Ok(Some(existing))
    })
    .await
}

/// Service exposing the instance port, targeting the named container port
#[must_use]
pub fn desired_service(instance: &GrafanaInstance) -> Service {
    Service {
        metadata: naming::owned_meta(instance, naming::service_name(instance), "service"),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(naming::labels(instance.name(), "deployment")),
            ports: Some(vec![ServicePort {
                name: Some(SERVICE_PORT_NAME.to_string()),
                port: instance.spec.port,
                target_port: Some(IntOrString::String(
                    GRAFANA_CONTAINER_PORT_NAME.to_string(),
                )),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn port_view(spec: &ServiceSpec) -> Vec<(Option<&str>, i32, Option<&IntOrString>)> {
    spec.ports
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|p| (p.name.as_deref(), p.port, p.target_port.as_ref()))
        .collect()
}
