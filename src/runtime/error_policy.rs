//! # Error Policy
//!
//! Error handling and backoff for the controller watch loops.
//! Failed reconciles are retried with a per-resource Fibonacci backoff; watch stream
//! errors are classified and either tolerated or answered with a restart.

use super::{resource_key, Operator};
use crate::controller::backoff::BackoffState;
use crate::controller::Error;
use crate::observability::metrics;
use kube::Resource;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Backoff state per resource key
///
/// A failing resource is retried at least every `max_seconds`. An entry whose last
/// failure is older than [`STALE_AFTER_RETRIES`] maximum delays belongs to a resource
/// that is no longer reconciled (deleted while failing) and is pruned.
#[derive(Debug)]
pub struct BackoffRegistry {
    min_seconds: u64,
    max_seconds: u64,
    states: Mutex<HashMap<String, (BackoffState, Instant)>>,
}

/// Missed maximum-delay retries after which a backoff entry is dropped
pub const STALE_AFTER_RETRIES: u32 = 3;

impl BackoffRegistry {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            max_seconds,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure of `key`, returning the delay before the next attempt and the
    /// number of consecutive failures
    pub fn record_failure(&self, key: &str) -> (Duration, u32) {
        self.record_failure_at(key, Instant::now())
    }

    fn record_failure_at(&self, key: &str, now: Instant) -> (Duration, u32) {
        let stale_after = Duration::from_secs(self.max_seconds) * STALE_AFTER_RETRIES;
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);

        let before = states.len();
        states.retain(|_, (_, last_failure)| {
            now.saturating_duration_since(*last_failure) < stale_after
        });
        if states.len() < before {
            debug!(pruned = before - states.len(), "Dropped backoff state of idle resources");
        }

        let (state, last_failure) = states.entry(key.to_string()).or_insert_with(|| {
            (BackoffState::new(self.min_seconds, self.max_seconds), now)
        });
        *last_failure = now;
        state.increment_error();
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Number of resources currently backing off
    #[must_use]
    pub fn len(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget the failures of `key`; returns whether it was backing off
    pub fn reset(&self, key: &str) -> bool {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some_and(|(state, _)| state.error_count > 0)
    }
}

/// Error policy shared by both controllers
///
/// Backoff state is tracked per resource so one failing dashboard never slows down
/// the others.
pub fn handle_reconciliation_error<K>(object: Arc<K>, error: &Error, ctx: Arc<Operator>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let key = resource_key(object.as_ref());

    let error_span = tracing::error_span!(
        "controller.watch.reconciliation_error",
        resource.key = key.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!(reason = error.reason(), "Reconciliation failed: {}", error);
    metrics::increment_reconciliation_errors(&kind, error.reason());

    let (delay, error_count) = ctx.backoff.record_failure(&key);
    info!(
        "Retrying in {}s (error count: {}, trigger source: error-backoff)",
        delay.as_secs(),
        error_count
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Watch stream failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// RBAC revoked or token expired
    Unauthorized,
    /// Resource version too old, the watch restarts from a fresh list
    Expired,
    /// API server throttling or reinitializing storage
    Throttled,
    /// CRD missing or the watched object is gone
    NotFound,
    Other,
}

/// Classify a watch stream error from its debug rendering
#[must_use]
pub fn classify_watch_error(error: &str) -> WatchErrorKind {
    // 404 first: a plain-text 404 body surfaces as a serde error mentioning WatchFailed
    let is_not_found =
        error.contains("ObjectNotFound") || error.contains("404") || error.contains("not found");

    if (error.contains("401") || error.contains("Unauthorized")) && !is_not_found {
        WatchErrorKind::Unauthorized
    } else if error.contains("410")
        || error.contains("too old resource version")
        || error.contains("Expired")
        || error.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error.contains("429")
        || error.contains("storage is (re)initializing")
        || error.contains("TooManyRequests")
    {
        WatchErrorKind::Throttled
    } else if is_not_found {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Handle a watch stream error, sleeping when the watch should not resume right away
pub async fn handle_watch_stream_error(error: &str, restart_delay: Duration) {
    let kind = classify_watch_error(error);
    let error_span = tracing::warn_span!("controller.watch.error", error = %error, kind = ?kind);

    let pause = error_span.in_scope(|| match kind {
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401), RBAC may have been revoked or the token expired");
            warn!("Waiting {}s before retrying the watch", restart_delay.as_secs());
            true
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410), watch will restart");
            false
        }
        WatchErrorKind::Throttled => {
            warn!("API server is throttling (429), backing off for {}s", restart_delay.as_secs());
            true
        }
        WatchErrorKind::NotFound => {
            warn!("Watched resource not found (404), the CRD may be missing: {}", error);
            false
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error);
            true
        }
    });

    if pause {
        tokio::time::sleep(restart_delay).await;
    }
}
