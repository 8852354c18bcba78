//! ConfigMap stage: the rendered grafana.ini.

use super::{ensure_object, Outcome, Stage};
use crate::cluster::ObjectStore;
use crate::constants::GRAFANA_INI_KEY;
use crate::controller::{ini, naming, Error};
use crate::crd::GrafanaInstance;
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;

pub(super) async fn reconcile<S: ObjectStore>(
    store: &S,
    instance: &GrafanaInstance,
) -> Result<Outcome, Error> {
    let desired = desired_config_map(instance);

    ensure_object(store, Stage::ConfigMap, desired, |mut existing, desired| {
        if existing.data == desired.data {
            return Ok(None);
        }
        existing.data.clone_from(&desired.data);
        Ok(Some(existing))
    })
    .await
}

/// ConfigMap carrying the merged grafana.ini
#[must_use]
pub fn desired_config_map(instance: &GrafanaInstance) -> ConfigMap {
    ConfigMap {
        metadata: naming::owned_meta(instance, naming::config_map_name(instance), "config"),
        data: Some(BTreeMap::from([(
            GRAFANA_INI_KEY.to_string(),
            ini::desired_ini(instance),
        )])),
        ..Default::default()
    }
}
