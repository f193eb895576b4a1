//! Task metadata normalization and nested-template directives.
//!
//! A task's metadata may embed a directive that mounts another template
//! beneath the task:
//!
//! ```yaml
//! metadata:
//!   owner: "{{team}}"
//!   template_ref:
//!     template: service-setup
//!     variables:
//!       service: "{{service}}"
//! ```
//!
//! `templateRef` is accepted as an alias for `template_ref`.

use crate::types::TemplateRef;
use serde_json::{Map, Value};
use tracing::warn;

/// Metadata key carrying a nested template directive.
pub const TEMPLATE_REF_KEY: &str = "template_ref";

/// Accepted alias for [`TEMPLATE_REF_KEY`].
pub const TEMPLATE_REF_ALIAS: &str = "templateRef";

/// Normalize raw task metadata into an object.
///
/// - `null` becomes an empty object
/// - any other non-object value is wrapped as `{"value": ...}`
/// - top-level `null` entries are dropped
pub fn transform(meta: &Value) -> Value {
    match meta {
        Value::Null => Value::Object(Map::new()),
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            Value::Object(map)
        }
    }
}

/// Find the nested template directive, if any.
///
/// A malformed directive is logged and treated as absent.
pub fn extract_template_ref(meta: &Value) -> Option<TemplateRef> {
    let raw = meta
        .get(TEMPLATE_REF_KEY)
        .or_else(|| meta.get(TEMPLATE_REF_ALIAS))?;

    match serde_json::from_value::<TemplateRef>(raw.clone()) {
        Ok(template_ref) if !template_ref.template.trim().is_empty() => Some(template_ref),
        Ok(_) => {
            warn!("Ignoring template directive with an empty template id");
            None
        }
        Err(e) => {
            warn!(error = %e, "Ignoring malformed template directive");
            None
        }
    }
}

/// Copy of the metadata without any template directive.
pub fn remove_template_ref(meta: &Value) -> Value {
    match meta {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != TEMPLATE_REF_KEY && k.as_str() != TEMPLATE_REF_ALIAS)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
