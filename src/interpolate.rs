//! Variable resolution and placeholder interpolation.
//!
//! Placeholders take the form `{{ name }}`. Names start with a letter or
//! underscore and may contain letters, digits, `_`, `.` and `-`.
//! Placeholders whose name is not in the context are left untouched.

use crate::types::{VariableContext, VariableDecl};
use regex_lite::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("valid placeholder pattern")
});

/// Merge caller-supplied values over declared defaults.
///
/// Supplied values always win. Declarations without a default that were not
/// supplied stay absent.
pub fn resolve_variables(decls: &[VariableDecl], supplied: &VariableContext) -> VariableContext {
    let mut ctx = supplied.clone();
    for decl in decls {
        if ctx.contains_key(&decl.name) {
            continue;
        }
        if let Some(ref default) = decl.default {
            ctx.insert(decl.name.clone(), default.clone());
        }
    }
    ctx
}

/// Names of required variables missing from the context, in declaration order.
pub fn validate_required_variables(decls: &[VariableDecl], ctx: &VariableContext) -> Vec<String> {
    decls
        .iter()
        .filter(|d| d.required && !ctx.contains_key(&d.name))
        .map(|d| d.name.clone())
        .collect()
}

/// Render a variable value for insertion into a string.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace every resolvable placeholder in `s`.
pub fn interpolate_string(s: &str, ctx: &VariableContext) -> String {
    PLACEHOLDER
        .replace_all(s, |caps: &Captures| match ctx.get(&caps[1]) {
            Some(value) => stringify(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Deep interpolation of a structured value. Only string leaves change.
pub fn interpolate_metadata(value: &Value, ctx: &VariableContext) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate_string(s, ctx)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_metadata(item, ctx))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_metadata(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Placeholder names in `s` that the context cannot resolve.
pub fn unresolved_placeholders(s: &str, ctx: &VariableContext) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(s) {
        let name = &caps[1];
        if !ctx.contains_key(name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    missing
}
