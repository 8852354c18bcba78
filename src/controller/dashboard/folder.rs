//! # Folder Resolver
//!
//! Maps a dashboard's folder title to a Grafana folder UID.
//!
//! Folder identity is fixed once Grafana assigns it: later passes only rename the folder
//! whose UID was stored on the dashboard status. The create path never looks the title up
//! first, so two dashboards racing on a new title can create two folders.

use crate::constants::GENERAL_FOLDER;
use crate::controller::Error;
use crate::grafana::GrafanaApi;
use tracing::{debug, info};

/// Whether `name` is Grafana's built-in folder (case-insensitive)
#[must_use]
pub fn is_general_folder(name: &str) -> bool {
    name.eq_ignore_ascii_case(GENERAL_FOLDER)
}

/// Resolve the folder UID a dashboard should be saved into
///
/// - the General folder resolves to an empty UID with no remote call
/// - a known UID is renamed to `desired_name` and returned unchanged
/// - otherwise a new folder is created and its UID returned
///
/// # Errors
///
/// `RemoteApi` when the create or update call fails.
pub async fn ensure_folder<G>(
    api: &G,
    desired_name: &str,
    previous_uid: &str,
) -> Result<String, Error>
where
    G: GrafanaApi + ?Sized,
{
    if is_general_folder(desired_name) {
        debug!("Dashboard targets the General folder, no folder operation required");
        return Ok(String::new());
    }

    if !previous_uid.is_empty() {
        api.update_folder(previous_uid, desired_name).await?;
        debug!(folder.uid = previous_uid, folder.title = desired_name, "Folder title converged");
        return Ok(previous_uid.to_string());
    }

    let folder = api.create_folder(desired_name).await?;
    info!(folder.uid = %folder.uid, folder.title = desired_name, "Created Grafana folder");
    Ok(folder.uid)
}

/// UID of the first folder whose title matches `name` case-insensitively
///
/// # Errors
///
/// `NotFound` when no folder matches, `RemoteApi` when listing fails.
pub async fn find_folder_uid_by_name<G>(api: &G, name: &str) -> Result<String, Error>
where
    G: GrafanaApi + ?Sized,
{
    api.folders()
        .await?
        .into_iter()
        .find(|folder| folder.title.eq_ignore_ascii_case(name))
        .map(|folder| folder.uid)
        .ok_or_else(|| Error::NotFound {
            kind: "Folder",
            namespace: String::new(),
            name: name.to_string(),
        })
}

/// Numeric id of the folder with `uid`
///
/// # Errors
///
/// `Validation` on an empty UID (no remote call), `NotFound` when Grafana has no such
/// folder, `RemoteApi` otherwise.
pub async fn folder_id_by_uid<G>(api: &G, uid: &str) -> Result<i64, Error>
where
    G: GrafanaApi + ?Sized,
{
    if uid.is_empty() {
        return Err(Error::Validation("folder UID is empty".to_string()));
    }

    match api.folder_by_uid(uid).await {
        Ok(folder) => Ok(folder.id),
        Err(e) if e.is_not_found() => Err(Error::NotFound {
            kind: "Folder",
            namespace: String::new(),
            name: uid.to_string(),
        }),
        Err(e) => Err(Error::RemoteApi(e)),
    }
}
