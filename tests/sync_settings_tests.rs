//! # Dashboard Sync Settings Tests
//!
//! Public behavior of the helpers the dashboard controller relies on: resync
//! intervals, document preparation, save messages and folder naming.

use chrono::{TimeZone, Utc};
use grafana_operator::controller::dashboard::{dashboard_document, is_general_folder, save_message};
use grafana_operator::controller::duration::{parse_go_duration, sync_interval};
use grafana_operator::controller::Error;
use grafana_operator::crd::{GrafanaDashboard, GrafanaDashboardSpec, GrafanaInstanceRef};
use serde_json::json;
use std::time::Duration;

fn dashboard(name: &str, model: &str) -> GrafanaDashboard {
    let mut dashboard = GrafanaDashboard::new(
        "overview",
        GrafanaDashboardSpec {
            grafana_instance_ref: GrafanaInstanceRef {
                name: "grafana".to_string(),
                namespace: None,
            },
            folder: "General".to_string(),
            name: name.to_string(),
            sync_period: String::new(),
            json: model.to_string(),
        },
    );
    dashboard.metadata.namespace = Some("apps".to_string());
    dashboard
}

#[test]
fn test_sync_interval_accepts_go_durations() {
    let cases = [
        ("30s", 30),
        ("5m", 300),
        ("5m0s", 300),
        ("1h30m", 5400),
        ("1.5h", 5400),
    ];
    for (input, secs) in cases {
        assert_eq!(
            sync_interval(input).expect(input),
            Duration::from_secs(secs),
            "syncPeriod '{input}'"
        );
    }
}

#[test]
fn test_sync_interval_defaults_to_five_minutes() {
    for input in ["", "   ", "0", "0s"] {
        assert_eq!(
            sync_interval(input).expect(input),
            Duration::from_secs(300),
            "syncPeriod '{input}'"
        );
    }
}

#[test]
fn test_sync_interval_rejects_garbage() {
    for input in ["five minutes", "10", "3d", "-1m"] {
        assert!(
            matches!(sync_interval(input), Err(Error::Validation(_))),
            "syncPeriod '{input}' must be rejected"
        );
    }
    assert!(matches!(parse_go_duration(""), Err(Error::Validation(_))));
}

#[test]
fn test_document_title_comes_from_display_name() {
    let document = dashboard_document(&dashboard("Node Exporter", r#"{"panels": []}"#))
        .expect("valid document");
    assert_eq!(document, json!({"title": "Node Exporter", "panels": []}));
}

#[test]
fn test_document_keeps_its_own_title() {
    let document = dashboard_document(&dashboard("Ignored", r#"{"title": "Kept"}"#))
        .expect("valid document");
    assert_eq!(document["title"], json!("Kept"));
}

#[test]
fn test_document_must_be_a_json_object() {
    for model in ["not json", "[1, 2]", "\"title\""] {
        assert!(
            matches!(
                dashboard_document(&dashboard("x", model)),
                Err(Error::Validation(_))
            ),
            "model {model} must be rejected"
        );
    }
}

#[test]
fn test_save_message_format() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    assert_eq!(
        save_message(at),
        "Upserted by Grafana-Operator at 2024-05-01 10:00:00"
    );
}

#[test]
fn test_general_folder_is_case_insensitive() {
    assert!(is_general_folder("General"));
    assert!(is_general_folder("general"));
    assert!(is_general_folder("GENERAL"));
    assert!(!is_general_folder("Generals"));
    assert!(!is_general_folder("Infrastructure"));
}
