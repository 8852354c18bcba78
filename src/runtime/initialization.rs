//! # Initialization
//!
//! Operator startup: rustls crypto provider, tracing, metrics, the HTTP server, the
//! Kubernetes client, and a pass over resources that existed before the operator started.

use super::{reconcile_dashboard_resource, reconcile_instance_resource, Operator};
use crate::cluster::KubeStore;
use crate::config::OperatorConfig;
use crate::crd::{GrafanaDashboard, GrafanaInstance};
use crate::grafana::HttpGrafanaConnector;
use crate::observability;
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

/// Everything the watch loops need
pub struct InitializationResult {
    pub client: Client,
    pub operator: Arc<Operator>,
    pub server_state: Arc<ServerState>,
    pub config: OperatorConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// # Errors
///
/// Fails when logging or metrics cannot be set up, the HTTP server does not come up in
/// time, or no Kubernetes client can be built.
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    let config = OperatorConfig::from_env();
    observability::init_logging(config.log_format)?;

    info!("Starting Grafana Operator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let connector = Arc::new(HttpGrafanaConnector::new(config.grafana_timeout()));
    let operator = Arc::new(Operator::new(
        KubeStore::new(client.clone()),
        connector,
        &config,
    ));

    // Runs alongside the watches; the keyed locks keep passes for one resource apart
    let startup_client = client.clone();
    let startup_operator = Arc::clone(&operator);
    let startup_namespace = config.watch_namespace.clone();
    tokio::spawn(
        async move {
            reconcile_existing_resources(&startup_client, &startup_operator, startup_namespace.as_deref())
                .await;
        }
        .instrument(tracing::info_span!(
            "controller.startup.reconcile_existing",
            operation = "reconcile_existing_resources"
        )),
    );

    match &config.watch_namespace {
        Some(namespace) => info!("Operator initialized, watching namespace '{}'", namespace),
        None => info!("Operator initialized, watching all namespaces"),
    }

    Ok(InitializationResult {
        client,
        operator,
        server_state,
        config,
    })
}

/// Wait for the HTTP server to bind
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &OperatorConfig,
) -> Result<()> {
    let startup_timeout = std::time::Duration::from_secs(config.server_startup_timeout_secs);
    let poll_interval = std::time::Duration::from_millis(config.server_poll_interval_ms);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// `Api` for `K`, namespaced when the operator is restricted to one namespace
pub(crate) fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Reconcile resources created before the operator started
async fn reconcile_existing_resources(
    client: &Client,
    operator: &Arc<Operator>,
    namespace: Option<&str>,
) {
    let instances = scoped_api::<GrafanaInstance>(client, namespace);
    reconcile_existing(&instances, |instance| {
        reconcile_instance_resource(Arc::new(instance), Arc::clone(operator))
    })
    .await;

    let dashboards = scoped_api::<GrafanaDashboard>(client, namespace);
    reconcile_existing(&dashboards, |dashboard| {
        reconcile_dashboard_resource(Arc::new(dashboard), Arc::clone(operator))
    })
    .await;
}

async fn reconcile_existing<K, F, Fut>(api: &Api<K>, reconcile: F)
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<kube_runtime::controller::Action, crate::controller::Error>>,
{
    let kind = K::kind(&());
    let list = match api.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            error!("{} CRD is not queryable: {}. Is the CRD installed?", kind, e);
            warn!("Continuing without the startup pass, the watch will retry");
            return;
        }
    };

    if list.items.is_empty() {
        info!("No existing {} resources found, watch will pick up new resources", kind);
        return;
    }

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        let meta = item.meta();
        by_namespace
            .entry(meta.namespace.clone().unwrap_or_else(|| "default".to_string()))
            .or_default()
            .push(meta.name.clone().unwrap_or_else(|| "unknown".to_string()));
    }
    info!(
        "Startup summary: {} {} resources in {} namespaces",
        list.items.len(),
        kind,
        by_namespace.len()
    );
    for (namespace, mut names) in by_namespace {
        names.sort();
        info!("  {}: {}", namespace, names.join(", "));
    }

    for item in list.items {
        let name = item.meta().name.clone().unwrap_or_default();
        let namespace = item.meta().namespace.clone().unwrap_or_default();
        match reconcile(item).await {
            Ok(_action) => info!("Reconciled existing {} {}/{}", kind, namespace, name),
            Err(e) => error!(
                "Failed to reconcile existing {} {}/{}: {}",
                kind, namespace, name, e
            ),
        }
    }
}
