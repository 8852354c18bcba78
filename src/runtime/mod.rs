//! # Runtime
//!
//! Wiring between the reconcilers and `kube_runtime`:
//!
//! - `initialization`: rustls, logging, metrics, HTTP server, client and the startup pass
//! - `watch_loop`: the GrafanaInstance and GrafanaDashboard controllers
//! - `error_policy`: per-resource Fibonacci backoff and watch error handling
//! - `keyed_locks`: one in-flight reconcile per resource key

pub mod error_policy;
pub mod initialization;
pub mod keyed_locks;
pub mod watch_loop;

pub use error_policy::{handle_reconciliation_error, BackoffRegistry};
pub use initialization::{initialize, InitializationResult};
pub use keyed_locks::KeyedLocks;
pub use watch_loop::run_watch_loops;

use crate::cluster::KubeStore;
use crate::config::OperatorConfig;
use crate::controller::dashboard::{reconcile_dashboard, DashboardContext};
use crate::controller::instance::reconcile_instance;
use crate::controller::Error;
use crate::crd::{GrafanaDashboard, GrafanaInstance};
use crate::grafana::GrafanaConnector;
use crate::observability::metrics;
use kube::Resource;
use kube_runtime::controller::Action;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};

/// Shared state of both controllers
pub struct Operator {
    pub store: KubeStore,
    pub dashboards: DashboardContext<KubeStore>,
    pub backoff: BackoffRegistry,
    pub locks: KeyedLocks,
}

impl Operator {
    #[must_use]
    pub fn new(
        store: KubeStore,
        connector: Arc<dyn GrafanaConnector>,
        config: &OperatorConfig,
    ) -> Self {
        Self {
            dashboards: DashboardContext::new(store.clone(), connector),
            store,
            backoff: BackoffRegistry::new(config.backoff_min_secs, config.backoff_max_secs),
            locks: KeyedLocks::new(),
        }
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("backoff", &self.backoff)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

/// `<kind>/<namespace>/<name>` of a resource
pub fn resource_key<K: Resource<DynamicType = ()>>(object: &K) -> String {
    let meta = object.meta();
    KeyedLocks::key(
        &K::kind(&()),
        meta.namespace.as_deref().unwrap_or("default"),
        meta.name.as_deref().unwrap_or("unknown"),
    )
}

/// Reconcile entry point of the GrafanaInstance controller
///
/// # Errors
///
/// Whatever the orchestrator returns; the error policy schedules the retry.
pub async fn reconcile_instance_resource(
    instance: Arc<GrafanaInstance>,
    ctx: Arc<Operator>,
) -> Result<Action, Error> {
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.kind = "GrafanaInstance",
        resource.name = instance.name(),
        resource.namespace = instance.namespace(),
    );
    guarded(&ctx, instance.as_ref(), async {
        reconcile_instance(&ctx.store, &instance).await?;
        Ok(Action::await_change())
    })
    .instrument(span)
    .await
}

/// Reconcile entry point of the GrafanaDashboard controller
///
/// # Errors
///
/// Whatever the lifecycle controller returns; the error policy schedules the retry.
pub async fn reconcile_dashboard_resource(
    dashboard: Arc<GrafanaDashboard>,
    ctx: Arc<Operator>,
) -> Result<Action, Error> {
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.kind = "GrafanaDashboard",
        resource.name = dashboard.metadata.name.as_deref().unwrap_or("unknown"),
        resource.namespace = dashboard.metadata.namespace.as_deref().unwrap_or("default"),
    );
    guarded(
        &ctx,
        dashboard.as_ref(),
        reconcile_dashboard(&ctx.dashboards, &dashboard),
    )
    .instrument(span)
    .await
}

/// Run `pass` under the resource's lock, with metrics and backoff bookkeeping
async fn guarded<K, F>(ctx: &Operator, object: &K, pass: F) -> Result<Action, Error>
where
    K: Resource<DynamicType = ()>,
    F: Future<Output = Result<Action, Error>>,
{
    let kind = K::kind(&());
    let key = resource_key(object);

    let guard = ctx.locks.lock(&key).await;
    metrics::increment_reconciliations(&kind);
    let start = Instant::now();
    let result = pass.await;
    metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());
    drop(guard);
    ctx.locks.release(&key);

    if let Ok(action) = &result {
        if ctx.backoff.reset(&key) {
            info!("Reconciliation recovered, backoff reset");
        }
        if *action != Action::await_change() {
            metrics::increment_requeues_total("sync-interval");
        }
    }
    result
}
