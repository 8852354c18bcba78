//! Finalizer bookkeeping on object metadata. Persisting the result is up to the caller.

use kube::Resource;

/// Whether `object` carries `finalizer`
pub fn has_finalizer<K: Resource>(object: &K, finalizer: &str) -> bool {
    object
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == finalizer))
}

/// Copy of `object` with `finalizer` appended, unless already present
pub fn with_finalizer<K: Resource + Clone>(object: &K, finalizer: &str) -> K {
    let mut updated = object.clone();
    if !has_finalizer(object, finalizer) {
        updated
            .meta_mut()
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(finalizer.to_string());
    }
    updated
}

/// Copy of `object` without `finalizer`; other finalizers are kept in order
pub fn without_finalizer<K: Resource + Clone>(object: &K, finalizer: &str) -> K {
    let mut updated = object.clone();
    if let Some(finalizers) = updated.meta_mut().finalizers.as_mut() {
        finalizers.retain(|f| f != finalizer);
    }
    updated
}
