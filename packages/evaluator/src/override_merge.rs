//! Override Merging
//!
//! A symbol definition is shared by many instances. Each instance stores only
//! what it changed: a base style for the definition root and, per child id,
//! an override map that is applied when the child is marked dirty.
//!
//! Style values tagged with `id`/`value`/`units` are replaced as a whole,
//! never field-merged, so a stale token `id` from the definition can not
//! survive an instance override of the `value`.

use cord_common::{merge, CommonError, Map, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Element properties keyed by element id
pub type MergedProperties = BTreeMap<String, Value>;

const STYLE: &str = "style";
const DISPLAY: &str = "display";
const STYLE_VALUE_KEYS: [&str; 4] = ["id", "value", "units", "type"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInstance {
    pub id: String,

    /// Base style applied on top of the definition root's style
    #[serde(default = "Value::empty_object")]
    pub style: Value,

    /// Sparse overrides keyed by definition child id
    #[serde(default)]
    pub instance_inputs: BTreeMap<String, Value>,

    /// Child ids whose overrides are in effect
    #[serde(default)]
    pub dirty_inputs: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDefinition {
    pub root_id: String,

    /// Properties of every element in the definition, root included
    pub elements: MergedProperties,
}

/// Merges instances onto one definition
pub struct OverrideMerger<'a> {
    definition: &'a SymbolDefinition,
}

impl<'a> OverrideMerger<'a> {
    pub fn new(definition: &'a SymbolDefinition) -> Self {
        Self { definition }
    }

    /// Properties the instance renders. Neither input is modified.
    pub fn merge(&self, instance: &SymbolInstance) -> Result<MergedProperties, CommonError> {
        let mut merged = self.definition.elements.clone();

        for child_id in &instance.dirty_inputs {
            let Some(overrides) = instance.instance_inputs.get(child_id) else {
                debug!(child = %child_id, "Dirty input without overrides");
                continue;
            };
            let Some(base) = merged.get(child_id) else {
                warn!(instance = %instance.id, child = %child_id, "Override for unknown child");
                continue;
            };
            let next = merge(base, overrides)?;
            merged.insert(child_id.clone(), next);
        }

        let root_id = &self.definition.root_id;
        let Some(root) = merged.get_mut(root_id) else {
            warn!(root = %root_id, "Definition root missing");
            return Ok(merged);
        };

        let definition_display = self
            .definition
            .elements
            .get(root_id)
            .and_then(|root| root.get(STYLE))
            .and_then(|style| style.get(DISPLAY));

        let base_style = root.get(STYLE).cloned().unwrap_or_else(Value::empty_object);
        let mut style = override_merge(&base_style, &instance.style)?;

        if let Some(display) =
            reconcile_display(definition_display, instance.style.get(DISPLAY))
        {
            if let Value::Object(fields) = &mut style {
                fields.insert(DISPLAY.to_string(), display);
            }
        }

        if let Value::Object(fields) = root {
            fields.insert(STYLE.to_string(), style);
        }
        Ok(merged)
    }
}

/// Merge one instance onto its definition
pub fn merge_overrides(
    instance: &SymbolInstance,
    definition: &SymbolDefinition,
) -> Result<MergedProperties, CommonError> {
    OverrideMerger::new(definition).merge(instance)
}

/// Deep merge where style value objects on the update side replace the base
/// value outright. `null` deletes, plain objects merge key by key.
pub fn override_merge(base: &Value, update: &Value) -> Result<Value, CommonError> {
    if let Some(path) = update.find_undefined() {
        return Err(CommonError::UndefinedValue { path });
    }
    Ok(override_merge_inner(base, update))
}

fn override_merge_inner(base: &Value, update: &Value) -> Value {
    let (Value::Object(base_fields), Value::Object(update_fields)) = (base, update) else {
        return strip_nulls(update);
    };
    if is_style_value(update) {
        return update.clone();
    }

    let mut merged: Map = base_fields.clone();
    for (key, value) in update_fields {
        match value {
            Value::Null => {
                merged.remove(key);
            }
            Value::Object(_) if !is_style_value(value) => {
                let next = match merged.get(key) {
                    Some(existing @ Value::Object(_)) if !is_style_value(existing) => {
                        override_merge_inner(existing, value)
                    }
                    _ => strip_nulls(value),
                };
                merged.insert(key.clone(), next);
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Tagged style value, e.g. `{ "id": "token-1", "value": 12, "units": "px" }`
fn is_style_value(value: &Value) -> bool {
    match value {
        Value::Object(fields) if !fields.is_empty() => {
            fields.keys().all(|k| STYLE_VALUE_KEYS.contains(&k.as_str()))
                && (fields.contains_key("id") || fields.contains_key("value"))
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayFamily {
    Block,
    Flex,
    Grid,
}

fn parse_display(display: &str) -> Option<(bool, DisplayFamily)> {
    let (inline, family) = match display.strip_prefix("inline-") {
        Some(rest) => (true, rest),
        None => (false, display),
    };
    let family = match family {
        "block" => DisplayFamily::Block,
        "flex" => DisplayFamily::Flex,
        "grid" => DisplayFamily::Grid,
        _ => return None,
    };
    Some((inline, family))
}

fn format_display(inline: bool, family: DisplayFamily) -> String {
    let family = match family {
        DisplayFamily::Block => "block",
        DisplayFamily::Flex => "flex",
        DisplayFamily::Grid => "grid",
    };
    if inline {
        format!("inline-{}", family)
    } else {
        family.to_string()
    }
}

fn display_text(value: &Value) -> Option<&str> {
    value
        .as_str()
        .or_else(|| value.get("value").and_then(Value::as_str))
}

/// Display the merged root should use when the instance changes inline-ness:
/// the definition's family with the instance's inline-ness, in the shape the
/// instance used. `None` leaves the merged display as it is.
pub fn reconcile_display(definition: Option<&Value>, instance: Option<&Value>) -> Option<Value> {
    let instance = instance?;
    let (definition_inline, family) = parse_display(display_text(definition?)?)?;
    let (instance_inline, _) = parse_display(display_text(instance)?)?;
    if definition_inline == instance_inline {
        return None;
    }

    let display = format_display(instance_inline, family);
    Some(match instance {
        Value::Object(fields) => {
            let mut fields = fields.clone();
            fields.insert("value".to_string(), Value::String(display));
            Value::Object(fields)
        }
        _ => Value::String(display),
    })
}
