//! `{{ variable }}` templating and value paths
//!
//! Paths are dotted with optional indexes: `user.id`, `$.items[0].sku`,
//! `$env.HOME`. A leading `$` refers to the root value.

use serde_json::Value;

use crate::trace::Vars;

/// Walk a path into a JSON value
pub fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    let mut current = root;

    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let (key, indexes) = match segment.find('[') {
            Some(i) => (&segment[..i], &segment[i..]),
            None => (segment, ""),
        };

        if !key.is_empty() {
            current = match current {
                Value::Object(map) => map.get(key)?,
                Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        for index in indexes.split('[').filter(|s| !s.is_empty()) {
            let index = index.strip_suffix(']')?.trim().parse::<usize>().ok()?;
            current = current.as_array()?.get(index)?;
        }
    }

    Some(current)
}

/// Resolve a variable path against the run's variables
pub fn lookup_var<'v>(vars: &'v Vars, path: &str) -> Option<&'v Value> {
    let path = path.trim();
    let (head, rest) = match path.find(['.', '[']) {
        Some(i) => (&path[..i], &path[i..]),
        None => (path, ""),
    };
    lookup(vars.get(head)?, rest)
}

/// Text form of a value as it appears inside a rendered string
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Substitute every `{{ path }}` in a string.
///
/// Unknown variables render as an empty string.
pub fn render(template: &str, vars: &Vars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        match lookup_var(vars, name) {
            Some(value) => out.push_str(&display(value)),
            None => tracing::debug!(variable = name.trim(), "undefined template variable"),
        }
        rest = &rest[start + 2 + len + 2..];
    }

    out.push_str(rest);
    out
}

/// Substitute placeholders throughout a JSON value.
///
/// A string that is exactly one placeholder is replaced by the variable's
/// value with its type intact.
pub fn render_value(value: &Value, vars: &Vars) -> Value {
    match value {
        Value::String(s) => {
            if let Some(name) = sole_placeholder(s) {
                if let Some(found) = lookup_var(vars, name) {
                    return found.clone();
                }
            }
            Value::String(render(s, vars))
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, vars)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sole_placeholder(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    (!inner.contains("{{") && !inner.contains("}}")).then_some(inner)
}
