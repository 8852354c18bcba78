//! # Dashboard Lifecycle Controller
//!
//! Drives a `GrafanaDashboard` through two states:
//!
//! - **Active**: the finalizer is added first (and persisted on its own pass). Once it
//!   is present the referenced Grafana instance is resolved, its health confirmed, the
//!   folder and dashboard synced and the status identifiers recorded. The pass requeues
//!   after the dashboard's sync period.
//! - **Terminating**: the dashboard is deleted from Grafana using the stored UID, then
//!   the finalizer is removed so the object can go away.
//!
//! Each finalizer write ends the pass; the next pass starts from the persisted object.

pub mod finalizer;
pub mod folder;
pub mod sync;

pub use folder::{ensure_folder, find_folder_uid_by_name, folder_id_by_uid, is_general_folder};
pub use sync::{
    dashboard_document, delete_dashboard, pin_dashboard_uid, save_message, upsert_dashboard,
};

use crate::cluster::ObjectStore;
use crate::constants::DASHBOARD_FINALIZER;
use crate::controller::instance::read_credentials;
use crate::controller::{duration, naming, Error};
use crate::crd::{GrafanaDashboard, GrafanaDashboardStatus, GrafanaInstance};
use crate::grafana::{Authenticator, GrafanaApi, GrafanaConnector, GrafanaError};
use k8s_openapi::api::core::v1::Secret;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dependencies of the dashboard controller
pub struct DashboardContext<S> {
    pub store: S,
    /// Builds a Grafana client for an instance endpoint
    pub connector: Arc<dyn GrafanaConnector>,
}

impl<S> DashboardContext<S> {
    pub fn new(store: S, connector: Arc<dyn GrafanaConnector>) -> Self {
        Self { store, connector }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for DashboardContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardContext")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of a dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
    Active,
    Terminating,
}

impl DashboardState {
    #[must_use]
    pub fn of(dashboard: &GrafanaDashboard) -> Self {
        if dashboard.metadata.deletion_timestamp.is_some() {
            DashboardState::Terminating
        } else {
            DashboardState::Active
        }
    }
}

/// Reconcile one dashboard
///
/// # Errors
///
/// `Validation` for an unusable sync period or document, `NotFound` when the instance
/// or its credentials are missing, `RemoteApi` for Grafana failures (including an
/// unhealthy instance) and `Persist` when a finalizer or status write fails.
pub async fn reconcile_dashboard<S: ObjectStore>(
    ctx: &DashboardContext<S>,
    dashboard: &GrafanaDashboard,
) -> Result<Action, Error> {
    let finalized = finalizer::has_finalizer(dashboard, DASHBOARD_FINALIZER);

    match (DashboardState::of(dashboard), finalized) {
        (DashboardState::Active, false) => {
            let updated = finalizer::with_finalizer(dashboard, DASHBOARD_FINALIZER);
            persist_finalizers(ctx, &updated).await?;
            info!("Added finalizer");
            Ok(Action::await_change())
        }
        (DashboardState::Active, true) => sync(ctx, dashboard).await,
        (DashboardState::Terminating, true) => {
            cleanup(ctx, dashboard).await?;
            let updated = finalizer::without_finalizer(dashboard, DASHBOARD_FINALIZER);
            persist_finalizers(ctx, &updated).await?;
            info!("Removed finalizer");
            Ok(Action::await_change())
        }
        (DashboardState::Terminating, false) => {
            debug!("Dashboard is being deleted and holds no finalizer, nothing to do");
            Ok(Action::await_change())
        }
    }
}

async fn sync<S: ObjectStore>(
    ctx: &DashboardContext<S>,
    dashboard: &GrafanaDashboard,
) -> Result<Action, Error> {
    let interval = duration::sync_interval(&dashboard.spec.sync_period)?;

    let instance = resolve_instance(ctx, dashboard)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "GrafanaInstance",
            namespace: dashboard.instance_namespace(),
            name: dashboard.spec.grafana_instance_ref.name.clone(),
        })?;
    let api = connect(ctx, &instance).await?;

    let health = api.health().await?;
    if !health.is_healthy() {
        return Err(GrafanaError::Unhealthy {
            database: health.database,
            version: health.version,
        }
        .into());
    }
    debug!(grafana.version = %health.version, "Grafana is healthy");

    let document = sync::dashboard_document(dashboard)?;
    let previous = dashboard.synced_status();
    let folder_uid = folder::ensure_folder(&*api, dashboard.folder(), &previous.folder_uid).await?;
    let saved =
        sync::upsert_dashboard(&*api, document, &folder_uid, &previous.dashboard_uid).await?;

    let synced = GrafanaDashboardStatus {
        folder_uid,
        dashboard_uid: saved.uid,
    };
    if synced == previous {
        debug!("Skip status update: GrafanaDashboard status is up-to-date");
    } else {
        let mut updated = dashboard.clone();
        updated.status = Some(synced);
        ctx.store
            .replace_status(&dashboard_namespace(dashboard), &updated)
            .await
            .map_err(Error::persist("GrafanaDashboard status"))?;
    }

    debug!(requeue_after = ?interval, "Dashboard in sync");
    Ok(Action::requeue(interval))
}

/// Remove the remote dashboard before the finalizer is released
async fn cleanup<S: ObjectStore>(
    ctx: &DashboardContext<S>,
    dashboard: &GrafanaDashboard,
) -> Result<(), Error> {
    let uid = dashboard.synced_status().dashboard_uid;
    if uid.is_empty() {
        info!("Dashboard was never synced, nothing to delete in Grafana");
        return Ok(());
    }

    let Some(instance) = resolve_instance(ctx, dashboard).await? else {
        warn!(
            dashboard.uid = %uid,
            instance = %dashboard.spec.grafana_instance_ref.name,
            "GrafanaInstance is gone, releasing dashboard without remote cleanup"
        );
        return Ok(());
    };

    let api = connect(ctx, &instance).await?;
    match sync::delete_dashboard(&*api, &uid).await {
        Err(Error::RemoteApi(e)) if e.is_not_found() => {
            debug!(dashboard.uid = %uid, "Dashboard already absent from Grafana");
            Ok(())
        }
        other => other,
    }
}

async fn resolve_instance<S: ObjectStore>(
    ctx: &DashboardContext<S>,
    dashboard: &GrafanaDashboard,
) -> Result<Option<GrafanaInstance>, Error> {
    let namespace = dashboard.instance_namespace();
    let name = &dashboard.spec.grafana_instance_ref.name;
    Ok(ctx.store.get::<GrafanaInstance>(&namespace, name).await?)
}

/// Client for `instance`, authenticated with its generated admin credentials
async fn connect<S: ObjectStore>(
    ctx: &DashboardContext<S>,
    instance: &GrafanaInstance,
) -> Result<Arc<dyn GrafanaApi>, Error> {
    let secret_name = instance.credentials_secret_name();
    let secret = ctx
        .store
        .get::<Secret>(instance.namespace(), &secret_name)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "Secret",
            namespace: instance.namespace().to_string(),
            name: secret_name,
        })?;
    let credentials = read_credentials(&secret)?;

    let url = instance
        .status
        .as_ref()
        .map(|status| status.grafana_ui.service_url.clone())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| naming::service_url(instance));

    let authenticator = Authenticator::Basic {
        username: credentials.username,
        password: credentials.password,
    };
    Ok(ctx.connector.connect(&url, &authenticator)?)
}

async fn persist_finalizers<S: ObjectStore>(
    ctx: &DashboardContext<S>,
    dashboard: &GrafanaDashboard,
) -> Result<(), Error> {
    ctx.store
        .replace(&dashboard_namespace(dashboard), dashboard)
        .await
        .map_err(Error::persist("GrafanaDashboard finalizers"))?;
    Ok(())
}

fn dashboard_namespace(dashboard: &GrafanaDashboard) -> String {
    dashboard
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string())
}
