//! Secret stage: generated admin credentials.
//!
//! Credentials are generated once, when the Secret is created, and never regenerated
//! by the operator. On later passes only the checksum annotation is refreshed, and only
//! when it no longer matches the Secret's current contents.

use super::{ensure_object, Outcome, Stage};
use crate::cluster::ObjectStore;
use crate::constants::{
    CHECKSUM_ANNOTATION, GENERATED_BY_ANNOTATION, OPERATOR_NAME, SECRET_PASSWORD_KEY,
    SECRET_USERNAME_KEY,
};
use crate::controller::checksum::Credentials;
use crate::controller::{naming, Error};
use crate::crd::GrafanaInstance;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

pub(super) async fn reconcile<S: ObjectStore>(
    store: &S,
    instance: &GrafanaInstance,
) -> Result<Outcome, Error> {
    // Only used when the Secret does not exist yet
    let desired = desired_secret(instance, &Credentials::generate());

    ensure_object(store, Stage::Secret, desired, |mut existing, _| {
        let credentials = read_credentials(&existing)?;
        let current = credentials.fingerprint();
        if secret_checksum(&existing) == Some(current.as_str()) {
            return Ok(None);
        }
        existing
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(CHECKSUM_ANNOTATION.to_string(), current);
        Ok(Some(existing))
    })
    .await
}

/// Secret holding `credentials`, annotated with their checksum
#[must_use]
pub fn desired_secret(instance: &GrafanaInstance, credentials: &Credentials) -> Secret {
    let mut metadata = naming::owned_meta(instance, instance.credentials_secret_name(), "secret");
    metadata.annotations = Some(BTreeMap::from([
        (
            GENERATED_BY_ANNOTATION.to_string(),
            OPERATOR_NAME.to_string(),
        ),
        (CHECKSUM_ANNOTATION.to_string(), credentials.fingerprint()),
    ]));

    Secret {
        metadata,
        data: Some(BTreeMap::from([
            (
                SECRET_USERNAME_KEY.to_string(),
                ByteString(credentials.username.clone().into_bytes()),
            ),
            (
                SECRET_PASSWORD_KEY.to_string(),
                ByteString(credentials.password.clone().into_bytes()),
            ),
        ])),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Checksum annotation of a credentials Secret
#[must_use]
pub fn secret_checksum(secret: &Secret) -> Option<&str> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(CHECKSUM_ANNOTATION))
        .map(String::as_str)
}

/// Admin credentials stored in a Secret
///
/// # Errors
///
/// Returns `Precondition` when a key is missing or not UTF-8.
pub fn read_credentials(secret: &Secret) -> Result<Credentials, Error> {
    Ok(Credentials {
        username: read_key(secret, SECRET_USERNAME_KEY)?,
        password: read_key(secret, SECRET_PASSWORD_KEY)?,
    })
}

fn read_key(secret: &Secret, key: &str) -> Result<String, Error> {
    let name = secret.metadata.name.as_deref().unwrap_or_default();
    if let Some(value) = secret.data.as_ref().and_then(|data| data.get(key)) {
        return String::from_utf8(value.0.clone()).map_err(|_utf8_err| {
            Error::Precondition(format!("key '{key}' of Secret {name} is not valid UTF-8"))
        });
    }
    // stringData is only present on objects that were never round-tripped through the API
    secret
        .string_data
        .as_ref()
        .and_then(|data| data.get(key))
        .cloned()
        .ok_or_else(|| Error::Precondition(format!("Secret {name} has no '{key}' key")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::{MemoryStore, Operation};
    use crate::crd::GrafanaInstanceSpec;

    fn instance() -> GrafanaInstance {
        let mut instance = GrafanaInstance::new("grafana", GrafanaInstanceSpec::default());
        instance.metadata.namespace = Some("monitoring".to_string());
        instance
    }

    #[tokio::test]
    async fn test_creates_secret_with_checksum() {
        let store = MemoryStore::new();
        let outcome = reconcile(&store, &instance()).await.unwrap();
        assert_eq!(outcome, Outcome::Created);

        let secret: Secret = store
            .fetch("monitoring", "grafana-admin-credentials")
            .unwrap();
        let credentials = read_credentials(&secret).unwrap();
        assert_eq!(credentials.username.len(), 10);
        assert_eq!(secret_checksum(&secret), Some(credentials.fingerprint().as_str()));
        assert_eq!(
            secret.metadata.annotations.unwrap()[GENERATED_BY_ANNOTATION],
            "grafana-operator"
        );
    }

    #[tokio::test]
    async fn test_second_pass_keeps_credentials_and_writes_nothing() {
        let store = MemoryStore::new();
        reconcile(&store, &instance()).await.unwrap();
        let first: Secret = store
            .fetch("monitoring", "grafana-admin-credentials")
            .unwrap();
        store.clear_operations();

        let outcome = reconcile(&store, &instance()).await.unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(store.operations().is_empty());

        let second: Secret = store
            .fetch("monitoring", "grafana-admin-credentials")
            .unwrap();
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn test_refreshes_checksum_after_external_edit() {
        let store = MemoryStore::new();
        let original = Credentials {
            username: "admin".to_string(),
            password: "old".to_string(),
        };
        let mut secret = desired_secret(&instance(), &original);
        // Password changed by hand, annotation left stale
        secret.data.as_mut().unwrap().insert(
            SECRET_PASSWORD_KEY.to_string(),
            ByteString(b"new".to_vec()),
        );
        store.insert(&secret);

        let outcome = reconcile(&store, &instance()).await.unwrap();
        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(
            store.operations(),
            vec![Operation::new("Secret", "replace", "grafana-admin-credentials")]
        );

        let refreshed: Secret = store
            .fetch("monitoring", "grafana-admin-credentials")
            .unwrap();
        let expected = crate::controller::checksum::fingerprint("admin", "new");
        assert_eq!(secret_checksum(&refreshed), Some(expected.as_str()));
        assert_eq!(read_credentials(&refreshed).unwrap().password, "new");
    }

    #[tokio::test]
    async fn test_missing_key_is_precondition_error() {
        let store = MemoryStore::new();
        let mut secret = desired_secret(&instance(), &Credentials::generate());
        secret
            .data
            .as_mut()
            .unwrap()
            .remove(SECRET_PASSWORD_KEY);
        store.insert(&secret);

        let result = reconcile(&store, &instance()).await;
        assert!(matches!(result, Err(Error::Precondition(_))));
    }

    #[tokio::test]
    async fn test_custom_secret_name() {
        let store = MemoryStore::new();
        let mut instance = instance();
        instance.spec.credentials_secret_name = "grafana-admin".to_string();

        reconcile(&store, &instance).await.unwrap();
        assert!(store.fetch::<Secret>("monitoring", "grafana-admin").is_some());
    }
}
