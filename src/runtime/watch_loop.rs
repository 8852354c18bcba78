//! # Watch Loop
//!
//! Runs the GrafanaInstance and GrafanaDashboard controllers side by side.
//!
//! The instance controller also watches the objects it owns (Secret, ConfigMap, PVC,
//! Deployment, Service) through their owner references, so a deleted or edited child
//! triggers a pass of its instance. Both loops restart when their stream ends and stop
//! once a shutdown signal marked the operator not ready.

use super::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use super::initialization::{scoped_api, InitializationResult};
use super::{reconcile_dashboard_resource, reconcile_instance_resource, Operator};
use crate::constants::OPERATOR_NAME;
use crate::controller::Error;
use crate::crd::{GrafanaDashboard, GrafanaInstance};
use crate::server::ServerState;
use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use kube::Client;
use kube_runtime::controller::{self, Action};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Run both controllers until shutdown
///
/// # Errors
///
/// Currently infallible once initialized; kept fallible for the binary's error path.
pub async fn run_watch_loops(init: InitializationResult) -> anyhow::Result<()> {
    let InitializationResult {
        client,
        operator,
        server_state,
        config,
    } = init;
    let namespace = config.watch_namespace.clone();
    let restart_delay = config.watch_restart_delay();

    spawn_shutdown_listener(Arc::clone(&server_state));

    let instances = run_instance_controller(
        client.clone(),
        Arc::clone(&operator),
        Arc::clone(&server_state),
        namespace.clone(),
        restart_delay,
    )
    .instrument(tracing::info_span!("controller.watch", controller = "GrafanaInstance"));
    let dashboards = run_dashboard_controller(
        client,
        operator,
        Arc::clone(&server_state),
        namespace,
        restart_delay,
    )
    .instrument(tracing::info_span!("controller.watch", controller = "GrafanaDashboard"));

    futures::join!(instances, dashboards);

    info!("Controllers stopped gracefully");
    Ok(())
}

/// Mark the operator not ready on SIGINT/SIGTERM so the loops stop restarting
fn spawn_shutdown_listener(server_state: Arc<ServerState>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, initiating graceful shutdown...");
            server_state.set_ready(false);
        }
    });
}

/// Only children created by this operator are watched
fn owned_objects() -> watcher::Config {
    watcher::Config::default().labels(&format!("app.kubernetes.io/managed-by={OPERATOR_NAME}"))
}

async fn run_instance_controller(
    client: Client,
    operator: Arc<Operator>,
    server_state: Arc<ServerState>,
    namespace: Option<String>,
    restart_delay: Duration,
) {
    let ns = namespace.as_deref();
    while server_state.is_ready() {
        info!("Starting GrafanaInstance controller");
        let stream = Controller::new(
            scoped_api::<GrafanaInstance>(&client, ns),
            watcher::Config::default().any_semantic(),
        )
        .owns(scoped_api::<Secret>(&client, ns), owned_objects())
        .owns(scoped_api::<ConfigMap>(&client, ns), owned_objects())
        .owns(scoped_api::<PersistentVolumeClaim>(&client, ns), owned_objects())
        .owns(scoped_api::<Deployment>(&client, ns), owned_objects())
        .owns(scoped_api::<Service>(&client, ns), owned_objects())
        .shutdown_on_signal()
        .run(
            reconcile_instance_resource,
            handle_reconciliation_error::<GrafanaInstance>,
            Arc::clone(&operator),
        );
        drain(stream, restart_delay).await;

        if !restart_after_end(&server_state, restart_delay).await {
            break;
        }
    }
}

async fn run_dashboard_controller(
    client: Client,
    operator: Arc<Operator>,
    server_state: Arc<ServerState>,
    namespace: Option<String>,
    restart_delay: Duration,
) {
    let ns = namespace.as_deref();
    while server_state.is_ready() {
        info!("Starting GrafanaDashboard controller");
        let stream = Controller::new(
            scoped_api::<GrafanaDashboard>(&client, ns),
            watcher::Config::default().any_semantic(),
        )
        .shutdown_on_signal()
        .run(
            reconcile_dashboard_resource,
            handle_reconciliation_error::<GrafanaDashboard>,
            Arc::clone(&operator),
        );
        drain(stream, restart_delay).await;

        if !restart_after_end(&server_state, restart_delay).await {
            break;
        }
    }
}

type ControllerResult<K> = Result<(ObjectRef<K>, Action), controller::Error<Error, watcher::Error>>;

/// Consume a controller stream, routing stream errors through the watch error policy
async fn drain<K, S>(stream: S, restart_delay: Duration)
where
    K: kube::Resource<DynamicType = ()>,
    S: Stream<Item = ControllerResult<K>>,
{
    stream
        .for_each(|result| async move {
            match result {
                Ok((object, _action)) => {
                    debug!(object = %object.name, "watch.event.success");
                }
                // Already handled by the reconcile error policy
                Err(controller::Error::ReconcilerFailed(_, _)) => {}
                Err(e) => {
                    let error_string = format!("{e:?}");
                    handle_watch_stream_error(&error_string, restart_delay).await;
                }
            }
        })
        .await;
}

/// Whether a controller whose stream ended should start again
async fn restart_after_end(server_state: &ServerState, delay: Duration) -> bool {
    if !server_state.is_ready() {
        info!("Shutdown requested, exiting watch loop");
        return false;
    }
    warn!(
        "Controller watch stream ended, restarting in {} seconds...",
        delay.as_secs()
    );
    tokio::time::sleep(delay).await;
    server_state.is_ready()
}
