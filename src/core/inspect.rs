//! Compact value rendering for context display and breadcrumbs.
//!
//! Context values can be arbitrarily large; a diagnostic line that dumps a
//! whole record set is worse than useless. These helpers render scalars
//! as-is and collapse anything big into a short summary.

use serde_json::{Map, Value};

use crate::constants::{MAX_INSPECT_ITEMS, MAX_INSPECT_STRING_LEN};

/// Renders a named-value map as `key: value, key: value`.
pub fn render_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a Value)>) -> String {
    pairs
        .map(|(name, value)| format!("{name}: {}", render_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders one value on a single line, truncating anything oversized.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => render_string(s),
        Value::Array(items) => render_array(items),
        Value::Object(map) => render_object(map),
    }
}

fn render_string(s: &str) -> String {
    if s.chars().count() <= MAX_INSPECT_STRING_LEN {
        format!("\"{s}\"")
    } else {
        let head: String = s.chars().take(MAX_INSPECT_STRING_LEN).collect();
        format!("\"{head}…\"")
    }
}

fn render_array(items: &[Value]) -> String {
    if items.len() > MAX_INSPECT_ITEMS {
        return format!("[{} items]", items.len());
    }
    let rendered: Vec<String> = items.iter().map(render_value).collect();
    format!("[{}]", rendered.join(", "))
}

fn render_object(map: &Map<String, Value>) -> String {
    // Records are usually more legible as their identifier than as a dump.
    if let Some(id) = map.get("id") {
        return format!("#<object id={}>", render_value(id));
    }
    if map.len() > MAX_INSPECT_ITEMS {
        return format!("{{{} keys}}", map.len());
    }
    let rendered: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("{key}: {}", render_value(value)))
        .collect();
    format!("{{{}}}", rendered.join(", "))
}
