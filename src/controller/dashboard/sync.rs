//! # Dashboard Synchronizer
//!
//! Pushes dashboard documents to Grafana and removes them again.

use crate::controller::Error;
use crate::crd::GrafanaDashboard;
use crate::grafana::{GrafanaApi, GrafanaError, SaveDashboardRequest, SaveDashboardResponse};
use chrono::{DateTime, Utc};
use tracing::info;

/// Version message attached to every save
#[must_use]
pub fn save_message(now: DateTime<Utc>) -> String {
    format!(
        "Upserted by Grafana-Operator at {}",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Parse the dashboard JSON model, filling in the title from the display name
///
/// # Errors
///
/// `Validation` when the document is not a JSON object.
pub fn dashboard_document(dashboard: &GrafanaDashboard) -> Result<serde_json::Value, Error> {
    let mut document: serde_json::Value = serde_json::from_str(&dashboard.spec.json)
        .map_err(|e| Error::Validation(format!("dashboard JSON is not valid: {e}")))?;

    let Some(model) = document.as_object_mut() else {
        return Err(Error::Validation(
            "dashboard JSON must be an object".to_string(),
        ));
    };

    let has_title = model
        .get("title")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|title| !title.is_empty());
    if !has_title && !dashboard.spec.name.is_empty() {
        model.insert(
            "title".to_string(),
            serde_json::Value::String(dashboard.spec.name.clone()),
        );
    }

    Ok(document)
}

/// Pin the document to the UID Grafana assigned on an earlier save
///
/// A UID already present in the model is kept. An empty `dashboard_uid` leaves the
/// document untouched, so Grafana assigns one.
pub fn pin_dashboard_uid(document: &mut serde_json::Value, dashboard_uid: &str) {
    if dashboard_uid.is_empty() {
        return;
    }
    let Some(model) = document.as_object_mut() else {
        return;
    };
    let has_uid = model
        .get("uid")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|uid| !uid.is_empty());
    if !has_uid {
        model.insert(
            "uid".to_string(),
            serde_json::Value::String(dashboard_uid.to_string()),
        );
    }
}

/// Create or overwrite a dashboard in `folder_uid` (empty means General)
///
/// A non-empty `dashboard_uid` updates that dashboard instead of matching by title.
///
/// # Errors
///
/// `RemoteApi` on transport failure, or with `UnexpectedSaveStatus` when Grafana answers
/// with anything but `success`.
pub async fn upsert_dashboard<G>(
    api: &G,
    mut document: serde_json::Value,
    folder_uid: &str,
    dashboard_uid: &str,
) -> Result<SaveDashboardResponse, Error>
where
    G: GrafanaApi + ?Sized,
{
    pin_dashboard_uid(&mut document, dashboard_uid);
    let request = SaveDashboardRequest {
        dashboard: document,
        folder_uid: folder_uid.to_string(),
        overwrite: true,
        message: save_message(Utc::now()),
    };

    let response = api.save_dashboard(&request).await?;
    if response.status != "success" {
        return Err(GrafanaError::UnexpectedSaveStatus(response.status).into());
    }

    info!(
        dashboard.uid = %response.uid,
        dashboard.version = response.version,
        folder.uid = folder_uid,
        "Saved dashboard"
    );
    Ok(response)
}

/// Delete the dashboard with `dashboard_uid`
///
/// # Errors
///
/// `Validation` on an empty UID without calling Grafana, `RemoteApi` when the call fails.
pub async fn delete_dashboard<G>(api: &G, dashboard_uid: &str) -> Result<(), Error>
where
    G: GrafanaApi + ?Sized,
{
    if dashboard_uid.is_empty() {
        return Err(Error::Validation("dashboard UID is empty".to_string()));
    }

    api.delete_dashboard(dashboard_uid).await?;
    info!(dashboard.uid = dashboard_uid, "Deleted dashboard");
    Ok(())
}
