//! Post-hoc normalization of model output against a feature schema.
//!
//! Repair never invents content. It cleans up what the model sent, fills
//! documented defaults, regenerates identifiers and enforces cross-field
//! rules; anything still wrong is left for re-validation to report.

use serde_json::{Map, Number, Value};
use tycoon_core::{
    defined_count, is_well_formed_id, validate_kind, CrossFieldRule, FieldKind, FieldSpec,
    OutputSchema, RandomExt, RandomSource,
};

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const GENERATED_ID_LEN: usize = 10;

/// Repaired record plus a log of what changed.
#[derive(Clone, Debug, PartialEq)]
pub struct RepairOutcome {
    pub value: Value,
    /// Human-readable notes, one per adjustment, in application order.
    pub actions: Vec<String>,
}

impl RepairOutcome {
    pub fn changed(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// Normalize `raw` towards `schema`. The result still needs validating.
pub fn repair(raw: Value, schema: &OutputSchema, rng: &mut dyn RandomSource) -> RepairOutcome {
    let mut actions = Vec::new();
    let mut obj = match raw {
        Value::Object(map) => map,
        other => {
            actions.push(format!("$: discarded non-object {}", type_label(&other)));
            Map::new()
        }
    };
    repair_fields(&mut obj, &schema.fields, "", rng, &mut actions);
    for rule in &schema.rules {
        apply_rule(&mut obj, schema, rule, &mut actions);
    }
    RepairOutcome {
        value: Value::Object(obj),
        actions,
    }
}

/// Generate `<prefix>` plus random lowercase alphanumerics.
pub fn generate_id(prefix: &str, rng: &mut dyn RandomSource) -> String {
    let mut id = String::with_capacity(prefix.len() + GENERATED_ID_LEN);
    id.push_str(prefix);
    for _ in 0..GENERATED_ID_LEN {
        id.push(ID_ALPHABET[rng.index(ID_ALPHABET.len())] as char);
    }
    id
}

fn repair_fields(
    obj: &mut Map<String, Value>,
    fields: &[FieldSpec],
    parent: &str,
    rng: &mut dyn RandomSource,
    actions: &mut Vec<String>,
) {
    for spec in fields {
        let path = if parent.is_empty() {
            spec.name.to_string()
        } else {
            format!("{parent}.{}", spec.name)
        };

        if let Some(fixed) = &spec.fixed {
            if obj.get(spec.name) != Some(fixed) {
                obj.insert(spec.name.to_string(), fixed.clone());
                actions.push(format!("{path}: forced to {fixed}"));
            }
            continue;
        }

        let original = obj.remove(spec.name).filter(|v| !v.is_null());
        let was_present = original.is_some();
        let repaired = original
            .clone()
            .and_then(|v| repair_value(v, &spec.kind, &path, rng, actions));

        match repaired {
            Some(v) => {
                if original.as_ref() != Some(&v) {
                    actions.push(format!("{path}: normalized"));
                }
                obj.insert(spec.name.to_string(), v);
            }
            None => {
                if let Some(default) = &spec.default {
                    obj.insert(spec.name.to_string(), default.clone());
                    actions.push(format!("{path}: filled default {default}"));
                } else if let FieldKind::Identifier { prefix } = &spec.kind {
                    let id = generate_id(prefix, rng);
                    actions.push(format!("{path}: generated {id}"));
                    obj.insert(spec.name.to_string(), Value::String(id));
                } else if was_present {
                    actions.push(format!("{path}: dropped unusable value"));
                }
            }
        }
    }
}

/// Repaired value, or `None` when nothing usable remains.
fn repair_value(
    value: Value,
    kind: &FieldKind,
    path: &str,
    rng: &mut dyn RandomSource,
    actions: &mut Vec<String>,
) -> Option<Value> {
    match kind {
        FieldKind::Text { max_len } => {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let cleaned = clean_text(&text);
            if cleaned.is_empty() {
                return None;
            }
            Some(Value::String(match max_len {
                Some(max) => truncate_chars(cleaned, *max),
                None => cleaned.to_string(),
            }))
        }
        FieldKind::Integer { min, max } => {
            let x = numeric(&value)?;
            let clamped = x.round().clamp(*min as f64, *max as f64);
            Some(Value::from(clamped as i64))
        }
        FieldKind::Number { min, max, decimals } => {
            let x = numeric(&value)?;
            let upper = max.unwrap_or(f64::INFINITY);
            let rounded = round_to(x.clamp(*min, upper), *decimals).clamp(*min, upper);
            Number::from_f64(rounded).map(Value::Number)
        }
        FieldKind::Bool => match value {
            Value::Bool(b) => Some(Value::Bool(b)),
            Value::String(s) => match clean_text(&s).to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(Value::Bool(true)),
                "false" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        FieldKind::Enum(allowed) => {
            let s = match &value {
                Value::String(s) => clean_text(s).to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            allowed
                .iter()
                .find(|token| token.eq_ignore_ascii_case(&s))
                .map(|token| Value::String(token.to_string()))
        }
        FieldKind::Identifier { prefix } => match value {
            Value::String(s) if is_well_formed_id(prefix, s.trim()) => {
                Some(Value::String(s.trim().to_string()))
            }
            _ => None,
        },
        FieldKind::Array {
            item, max_items, ..
        } => {
            let Value::Array(items) = value else {
                return None;
            };
            let before = items.len();
            let mut kept: Vec<Value> = items
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| {
                    let item_path = format!("{path}[{i}]");
                    let repaired = repair_value(v, item, &item_path, rng, actions)?;
                    validate_kind(&repaired, item, &item_path)
                        .is_empty()
                        .then_some(repaired)
                })
                .collect();
            if kept.len() < before {
                actions.push(format!("{path}: dropped {} invalid items", before - kept.len()));
            }
            if let Some(max) = max_items {
                if kept.len() > *max {
                    kept.truncate(*max);
                    actions.push(format!("{path}: truncated to {max} items"));
                }
            }
            Some(Value::Array(kept))
        }
        FieldKind::Object {
            fields,
            min_defined,
        } => {
            let Value::Object(mut obj) = value else {
                return None;
            };
            repair_fields(&mut obj, fields, path, rng, actions);
            let known: Vec<&str> = fields.iter().map(|f| f.name).collect();
            obj.retain(|k, _| known.contains(&k.as_str()));
            if defined_count(&obj, fields) < *min_defined {
                actions.push(format!("{path}: too few defined fields"));
            }
            Some(Value::Object(obj))
        }
    }
}

fn apply_rule(
    obj: &mut Map<String, Value>,
    schema: &OutputSchema,
    rule: &CrossFieldRule,
    actions: &mut Vec<String>,
) {
    match rule {
        CrossFieldRule::AtLeastMultiple {
            primary,
            secondary,
            factor,
        } => {
            let Some(p) = obj.get(*primary).and_then(Value::as_f64) else {
                return;
            };
            let floor = p * factor;
            let current = obj.get(*secondary).and_then(Value::as_f64);
            if current.is_some_and(|s| s >= floor) {
                return;
            }
            let raised = match schema.field_spec(secondary).map(|f| &f.kind) {
                Some(FieldKind::Integer { .. }) => Value::from(ceil_to(floor, 0) as i64),
                Some(FieldKind::Number { decimals, .. }) => match Number::from_f64(ceil_to(floor, *decimals)) {
                    Some(n) => Value::Number(n),
                    None => return,
                },
                _ => return,
            };
            actions.push(format!("{secondary}: raised to {raised} ({})", rule.describe()));
            obj.insert(secondary.to_string(), raised);
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let x = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => clean_text(s)
            .trim_start_matches('$')
            .replace(',', "")
            .trim()
            .parse::<f64>()
            .ok()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

/// Trim whitespace and one layer of wrapping quotes.
fn clean_text(s: &str) -> &str {
    let t = s.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if t.chars().count() >= 2 && t.starts_with(open) && t.ends_with(close) {
            let inner = &t[open.len_utf8()..t.len() - close.len_utf8()];
            return inner.trim();
        }
    }
    t
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte, _)) => s[..byte].trim_end().to_string(),
        None => s.to_string(),
    }
}

fn round_to(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale).round() / scale
}

fn ceil_to(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale - 1e-9).ceil() / scale
}

fn type_label(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
