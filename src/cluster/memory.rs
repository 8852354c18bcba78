//! In-memory [`ObjectStore`] for unit tests.

use super::{apply_merge_patch, status_patch, ManagedObject, ObjectStore};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Mutating call recorded by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: String,
    pub verb: &'static str,
    pub name: String,
}

impl Operation {
    pub fn new(kind: &str, verb: &'static str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            verb,
            name: name.to_string(),
        }
    }
}

type Key = (String, String, String);

/// Objects stored as JSON keyed by (kind, namespace, name)
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<Key, serde_json::Value>>,
    operations: Mutex<Vec<Operation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording an operation
    pub fn insert<K: ManagedObject>(&self, object: &K) {
        let key = key_of(object);
        let value = serde_json::to_value(object).unwrap();
        self.objects.lock().unwrap().insert(key, value);
    }

    /// Read an object without going through the trait
    pub fn fetch<K: ManagedObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (K::kind(&()).to_string(), namespace.to_string(), name.to_string());
        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .map(|value| serde_json::from_value(value.clone()).unwrap())
    }

    /// Mutating calls in the order they were issued
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.lock().unwrap().clone()
    }

    /// Mutating calls issued for one kind
    pub fn operations_for(&self, kind: &str) -> Vec<Operation> {
        self.operations()
            .into_iter()
            .filter(|op| op.kind == kind)
            .collect()
    }

    pub fn clear_operations(&self) {
        self.operations.lock().unwrap().clear();
    }

    fn record<K: ManagedObject>(&self, verb: &'static str, object: &K) {
        self.operations.lock().unwrap().push(Operation::new(
            &K::kind(&()),
            verb,
            &object.name_any(),
        ));
    }
}

fn key_of<K: ManagedObject>(object: &K) -> Key {
    (
        K::kind(&()).to_string(),
        object.namespace().unwrap_or_default(),
        object.name_any(),
    )
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error> {
        Ok(self.fetch(namespace, name))
    }

    async fn create<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error> {
        let mut stored = object.clone();
        stored.meta_mut().namespace = Some(namespace.to_string());
        self.record("create", &stored);
        self.insert(&stored);
        Ok(stored)
    }

    async fn replace<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error> {
        let mut stored = object.clone();
        stored.meta_mut().namespace = Some(namespace.to_string());
        self.record("replace", &stored);
        self.insert(&stored);
        Ok(stored)
    }

    async fn replace_status<K: ManagedObject>(
        &self,
        namespace: &str,
        object: &K,
    ) -> Result<K, kube::Error> {
        // Same merge patch body the API server receives
        self.record("replace_status", object);
        let key = (
            K::kind(&()).to_string(),
            namespace.to_string(),
            object.name_any(),
        );
        let patch = status_patch(object).unwrap();
        let mut objects = self.objects.lock().unwrap();
        let entry = objects
            .entry(key)
            .or_insert_with(|| serde_json::to_value(object).unwrap());
        apply_merge_patch(entry, &patch);
        Ok(serde_json::from_value(entry.clone()).unwrap())
    }
}
