//! # grafana.ini
//!
//! Deep merge of the operator defaults with the user's `iniConfig`, and rendering of
//! the merged document to INI text.
//!
//! Merge rule: the right-hand (user) value wins on every key it sets. Two values are
//! merged recursively only when both are objects; otherwise the user value replaces
//! the default wholesale.

use crate::crd::GrafanaInstance;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, warn};

/// Merge `overrides` into `base`; `overrides` wins at every level
#[must_use]
pub fn merge_documents(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, override_value) in override_map {
                let value = match merged.get(key) {
                    Some(base_value) => merge_documents(base_value, override_value),
                    None => override_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (_, other) => other.clone(),
    }
}

/// Operator defaults every instance starts from
#[must_use]
pub fn default_config(instance: &GrafanaInstance) -> Value {
    json!({
        "metrics": {
            "enabled": true,
            "disable_total_stats": false
        },
        "server": {
            "http_port": instance.spec.port.to_string()
        }
    })
}

/// The merged configuration document of an instance
#[must_use]
pub fn effective_config(instance: &GrafanaInstance) -> Value {
    let user: Map<String, Value> = instance
        .spec
        .ini_config
        .iter()
        .map(|(section, body)| (section.clone(), body.clone()))
        .collect();
    merge_documents(&default_config(instance), &Value::Object(user))
}

/// Render a configuration document as INI text
///
/// Top-level scalars go to the default section, objects become `[section]` blocks.
/// Sections and keys are sorted so the output is stable across reconciles.
/// Scalars render as text; nulls, arrays and nested objects are skipped. Section names,
/// keys and values spanning more than one line are skipped too, they would start new
/// INI lines of their own.
#[must_use]
pub fn render_ini(document: &Value) -> String {
    let Some(root) = document.as_object() else {
        return String::new();
    };
    let root: BTreeMap<&String, &Value> = root.iter().collect();

    let mut out = String::new();
    for (key, value) in &root {
        if let Some(text) = scalar_text(value) {
            if is_single_line(key) && is_single_line(&text) {
                let _ = writeln!(out, "{key} = {text}");
            } else {
                warn!(key = ?key, "skipping multi-line ini entry");
            }
        }
    }
    if !out.is_empty() {
        out.push('\n');
    }

    for (section, body) in &root {
        let Some(body) = body.as_object() else {
            continue;
        };
        if !is_single_line(section) {
            warn!(section = ?section, "skipping multi-line ini section name");
            continue;
        }
        let _ = writeln!(out, "[{section}]");
        let keys: BTreeMap<&String, &Value> = body.iter().collect();
        for (key, value) in keys {
            match scalar_text(value) {
                Some(text) if is_single_line(key) && is_single_line(&text) => {
                    let _ = writeln!(out, "{key} = {text}");
                }
                Some(_) => warn!(section = %section, key = ?key, "skipping multi-line ini entry"),
                None => debug!(section = %section, key = %key, "skipping non-scalar ini value"),
            }
        }
        out.push('\n');
    }
    out
}

/// Rendered grafana.ini of an instance
#[must_use]
pub fn desired_ini(instance: &GrafanaInstance) -> String {
    render_ini(&effective_config(instance))
}

fn is_single_line(text: &str) -> bool {
    !text.contains(['\n', '\r'])
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::GrafanaInstanceSpec;

    #[test]
    fn test_merge_user_wins_on_scalars() {
        let merged = merge_documents(
            &json!({"metrics": {"enabled": true, "disable_total_stats": false}}),
            &json!({"metrics": {"enabled": false}}),
        );
        assert_eq!(
            merged,
            json!({"metrics": {"enabled": false, "disable_total_stats": false}})
        );
    }

    #[test]
    fn test_merge_replaces_when_shapes_differ() {
        let merged = merge_documents(
            &json!({"a": {"nested": 1}, "b": "scalar"}),
            &json!({"a": "flat", "b": {"nested": 2}}),
        );
        assert_eq!(merged, json!({"a": "flat", "b": {"nested": 2}}));
    }

    #[test]
    fn test_render_sorted_sections() {
        let text = render_ini(&json!({
            "server": {"root_url": "https://grafana.example.com", "http_port": "3000"},
            "metrics": {"enabled": true}
        }));
        assert_eq!(
            text,
            "[metrics]\nenabled = true\n\n[server]\nhttp_port = 3000\nroot_url = https://grafana.example.com\n\n"
        );
    }

    #[test]
    fn test_render_skips_non_scalars() {
        let text = render_ini(&json!({
            "auth": {"nested": {"x": 1}, "list": [1, 2], "missing": null, "enabled": "true"}
        }));
        assert_eq!(text, "[auth]\nenabled = true\n\n");
    }

    #[test]
    fn test_render_rejects_line_breaks() {
        let text = render_ini(&json!({
            "server": {
                "domain": "grafana.example.com\n[security]\nadmin_password = x",
                "root_url": "https://grafana.example.com",
                "bad\rkey": "1"
            },
            "users\n[auth]": {"enabled": true},
            "top\nlevel": "x"
        }));
        assert_eq!(text, "[server]\nroot_url = https://grafana.example.com\n\n");
    }

    #[test]
    fn test_desired_ini_contains_defaults_and_user_values() {
        let mut spec = GrafanaInstanceSpec::default();
        spec.ini_config
            .insert("metrics".to_string(), json!({"disable_total_stats": true}));
        let instance = GrafanaInstance::new("grafana", spec);

        let text = desired_ini(&instance);
        assert!(text.contains("[metrics]\ndisable_total_stats = true\nenabled = true\n"));
        assert!(text.contains("[server]\nhttp_port = 3000\n"));
    }
}
