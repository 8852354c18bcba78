//! # Cluster Access
//!
//! The seam between the reconcilers and the Kubernetes API. Reconcilers talk to an
//! [`ObjectStore`]; production code uses [`KubeStore`], unit tests use an in-memory store
//! that records every mutating call.

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A namespaced Kubernetes object the operator reads or writes
pub trait ManagedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> ManagedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Get/create/update access to namespaced objects, keyed by (kind, namespace, name)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, `None` when it does not exist
    async fn get<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error>;

    /// Create a new object
    async fn create<K: ManagedObject>(&self, namespace: &str, object: &K)
        -> Result<K, kube::Error>;

    /// Replace an existing object (metadata and spec)
    async fn replace<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error>;

    /// Write the status subresource of an existing object
    async fn replace_status<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error>;
}

/// JSON merge patch body carrying only the status block of `object`
///
/// Keys absent from the body are left untouched by the API server, so status types
/// serialize their empty fields to clear stale values.
///
/// # Errors
///
/// When `object` cannot be serialized.
pub fn status_patch<K: Serialize>(object: &K) -> Result<serde_json::Value, serde_json::Error> {
    let value = serde_json::to_value(object)?;
    let status = value
        .get("status")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    Ok(serde_json::json!({ "status": status }))
}

/// Apply a JSON merge patch (RFC 7386) to `target`
pub fn apply_merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let serde_json::Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = serde_json::Value::Object(serde_json::Map::new());
    }
    if let serde_json::Value::Object(current) = target {
        for (key, value) in fields {
            if value.is_null() {
                current.remove(key);
            } else {
                apply_merge_patch(
                    current.entry(key.clone()).or_insert(serde_json::Value::Null),
                    value,
                );
            }
        }
    }
}

/// [`ObjectStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: ManagedObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error> {
        match self.api::<K>(namespace).get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error> {
        self.api::<K>(namespace)
            .create(&PostParams::default(), object)
            .await
    }

    async fn replace<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error> {
        self.api::<K>(namespace)
            .replace(&object.name_any(), &PostParams::default(), object)
            .await
    }

    async fn replace_status<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error> {
        let patch = status_patch(object).map_err(kube::Error::SerdeError)?;
        self.api::<K>(namespace)
            .patch_status(&object.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
    }
}
