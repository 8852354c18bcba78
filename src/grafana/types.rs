//! Request and response bodies of the Grafana HTTP API.

use serde::{Deserialize, Serialize};

/// `GET /api/health`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub version: String,
}

impl HealthResponse {
    /// Grafana is usable when its database reports `ok` and it announces a version
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.database == "ok" && !self.version.is_empty()
    }
}

/// A Grafana folder as returned by the folder endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub id: i64,
    pub uid: String,
    pub title: String,
}

/// `POST /api/dashboards/db` body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDashboardRequest {
    pub dashboard: serde_json::Value,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub folder_uid: String,
    pub overwrite: bool,
    pub message: String,
}

/// `POST /api/dashboards/db` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDashboardResponse {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub slug: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_health_requires_ok_database_and_version() {
        let healthy: HealthResponse =
            serde_json::from_value(json!({"commit": "abc", "database": "ok", "version": "10.0.0"}))
                .unwrap();
        assert!(healthy.is_healthy());

        let no_version: HealthResponse =
            serde_json::from_value(json!({"database": "ok"})).unwrap();
        assert!(!no_version.is_healthy());

        let failing: HealthResponse =
            serde_json::from_value(json!({"database": "failing", "version": "10.0.0"})).unwrap();
        assert!(!failing.is_healthy());
    }

    #[test]
    fn test_save_request_omits_general_folder() {
        let request = SaveDashboardRequest {
            dashboard: json!({"title": "Overview"}),
            folder_uid: String::new(),
            overwrite: true,
            message: "m".to_string(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("folderUid").is_none());
        assert_eq!(body["overwrite"], json!(true));
    }
}
