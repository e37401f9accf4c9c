//! Configuration merge logic
//!
//! Implements the layered merge with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both objects: deep merge
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        // Arrays: REPLACE (no concatenation)
        (Value::Array(_), overlay @ Value::Array(_)) => overlay,

        // Scalars and any other case: overlay wins
        (_, overlay) => overlay,
    }
}

/// Merge multiple config layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

/// Convert a TOML value to a JSON value
pub fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtin() -> Value {
        json!({
            "format": {"line_width": 72, "line_ending": "crlf"},
            "merge": {"parallel": true}
        })
    }

    #[test]
    fn test_project_merge_table_keeps_user_format() {
        let user = json!({"format": {"line_width": 90, "line_ending": "lf"}});
        let project = json!({"merge": {"parallel": false}});

        let result = merge_layers(vec![builtin(), user, project]);

        assert_eq!(result["format"]["line_width"], 90);
        assert_eq!(result["format"]["line_ending"], "lf");
        assert_eq!(result["merge"]["parallel"], false);
    }

    #[test]
    fn test_partial_format_table_only_touches_named_keys() {
        let project = json!({"format": {"line_ending": "lf"}});
        let result = deep_merge(builtin(), project);

        assert_eq!(result["format"]["line_ending"], "lf");
        assert_eq!(result["format"]["line_width"], 72);
        assert_eq!(result["merge"]["parallel"], true);
    }

    #[test]
    fn test_section_list_replaced_not_appended() {
        let user = json!({"exclude_sections": ["internal", "test-only"]});
        let project = json!({"exclude_sections": ["internal"]});
        let result = deep_merge(user, project);

        assert_eq!(result["exclude_sections"], json!(["internal"]));
    }

    #[test]
    fn test_unknown_table_carried_through() {
        let user = json!({"format": {"line_width": 100}, "editor": {"theme": "dark"}});
        let result = merge_layers(vec![builtin(), user]);

        assert_eq!(result["editor"]["theme"], "dark");
        assert_eq!(result["format"]["line_width"], 100);
    }

    #[test]
    fn test_cli_layer_beats_every_file_layer() {
        let user = json!({"format": {"line_width": 80}});
        let project = json!({"format": {"line_width": 100}, "merge": {"parallel": false}});
        let cli = json!({"format": {"line_width": 120}, "merge": {"parallel": true}});

        let result = merge_layers(vec![builtin(), user, project, cli]);

        assert_eq!(result["format"]["line_width"], 120);
        assert_eq!(result["format"]["line_ending"], "crlf");
        assert_eq!(result["merge"]["parallel"], true);
    }

    #[test]
    fn test_no_layers_is_null() {
        assert_eq!(merge_layers(Vec::new()), Value::Null);
    }

    #[test]
    fn test_toml_project_tables_to_json() {
        let toml: toml::Value =
            toml::from_str("[format]\nline_width = 90\nline_ending = \"lf\"\n\n[merge]\nparallel = false\n").unwrap();
        let json = toml_to_json(toml);

        assert_eq!(json, json!({
            "format": {"line_width": 90, "line_ending": "lf"},
            "merge": {"parallel": false}
        }));
    }
}
