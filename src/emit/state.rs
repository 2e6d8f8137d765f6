//! `state_defaults.rs`: default values keyed by path-id plus JSON load/save.

use super::{CodeWriter, float_lit};
use crate::{resolve::StateEntry, widget::lit};
use serde_json::Value;

const HELPERS: &str = r#"fn coerce_like_default(value: &Value, default: &Value) -> Value {
    if !default.is_number() {
        return value.clone();
    }
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| default.clone(), Value::Number)
}

/// Defaults overlaid with the known keys of a saved JSON object. Numeric
/// values that do not parse keep their default.
pub fn load_state(path: &Path) -> BTreeMap<String, Value> {
    let mut state = state_defaults();
    let Ok(text) = std::fs::read_to_string(path) else {
        return state;
    };
    let Ok(Value::Object(saved)) = serde_json::from_str::<Value>(&text) else {
        return state;
    };
    for (key, value) in saved {
        if let Some(default) = state.get(&key) {
            let coerced = coerce_like_default(&value, default);
            state.insert(key, coerced);
        }
    }
    state
}

pub fn save_state(state: &BTreeMap<String, Value>, path: &Path) -> std::io::Result<()> {
    let text = serde_json::to_string_pretty(state).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}"#;

/// Rust expression that evaluates to `v`.
pub(crate) fn value_expr(v: &Value) -> String {
    match v {
        Value::Null => "Value::Null".to_owned(),
        Value::Bool(b) => format!("Value::Bool({b})"),
        Value::Number(n) => match n.as_i64() {
            Some(i) => format!("Value::from({i}_i64)"),
            None => format!("Value::from({})", float_lit(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => format!("Value::from({})", lit(s)),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(value_expr).collect();
            format!("Value::Array(vec![{}])", items.join(", "))
        }
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", lit(k), value_expr(v)))
                .collect();
            format!("serde_json::json!({{ {} }})", fields.join(", "))
        }
    }
}

pub fn render(entries: &[StateEntry]) -> String {
    let mut w = CodeWriter::new();
    w.line("//! Generated by layout-builder. Default widget values keyed by path-id.");
    w.blank();
    w.line("#![allow(dead_code)]");
    w.blank();
    w.line("use serde_json::Value;");
    w.line("use std::{collections::BTreeMap, path::Path};");
    w.blank();
    w.open("pub fn state_defaults() -> BTreeMap<String, Value> {");
    w.line("let mut state = BTreeMap::new();");
    for e in entries {
        w.line(format!(
            "state.insert({}.to_owned(), {});",
            lit(&e.path_id),
            value_expr(&e.default)
        ));
    }
    w.line("state");
    w.close("}");
    w.blank();
    w.block(HELPERS);
    w.finish()
}
