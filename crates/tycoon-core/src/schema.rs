//! Declarative output schemas and the structural validator.
//!
//! A schema describes one generated record: which fields exist, whether they
//! are required, numeric bounds, enum sets, identifier formats, array sizes
//! and cross-field rules. The same descriptor drives validation, repair (in
//! `tycoon-ai`) and the JSON-Schema document sent to the model.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

/// Minimum number of alphanumeric characters after an identifier prefix.
pub const ID_MIN_SUFFIX: usize = 6;

/// Tolerance used when comparing floating point cross-field values.
const CROSS_FIELD_EPSILON: f64 = 1e-6;

/// Shape and bounds of a single field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// Non-empty string, optionally length-limited (in chars).
    Text { max_len: Option<usize> },
    /// Whole number within `[min, max]`.
    Integer { min: i64, max: i64 },
    /// Real number `>= min` and `<= max` when a max is given. `decimals` is the
    /// precision repair rounds to.
    Number {
        min: f64,
        max: Option<f64>,
        decimals: u32,
    },
    Bool,
    /// String drawn from a closed set.
    Enum(&'static [&'static str]),
    /// Token of the form `<prefix><alphanumerics>`.
    Identifier { prefix: &'static str },
    Array {
        item: Box<FieldKind>,
        min_items: usize,
        max_items: Option<usize>,
    },
    /// Nested record; `min_defined` counts fields that are present and non-null.
    Object {
        fields: Vec<FieldSpec>,
        min_defined: usize,
    },
}

impl FieldKind {
    pub fn text(max_len: usize) -> Self {
        FieldKind::Text {
            max_len: Some(max_len),
        }
    }

    pub fn money(min: f64, max: Option<f64>) -> Self {
        FieldKind::Number {
            min,
            max,
            decimals: 2,
        }
    }

    pub fn array_of(item: FieldKind, min_items: usize, max_items: usize) -> Self {
        FieldKind::Array {
            item: Box::new(item),
            min_items,
            max_items: Some(max_items),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } | FieldKind::Enum(_) | FieldKind::Identifier { .. } => "string",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Number { .. } => "number",
            FieldKind::Bool => "boolean",
            FieldKind::Array { .. } => "array",
            FieldKind::Object { .. } => "object",
        }
    }
}

/// A named field inside an object.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Value used by repair when the field is missing or unusable.
    pub default: Option<Value>,
    /// The only legal value; repair force-sets it.
    pub fixed: Option<Value>,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            fixed: None,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn fixed(mut self, value: Value) -> Self {
        self.fixed = Some(value);
        self
    }
}

/// Invariants spanning several top-level fields.
#[derive(Clone, Debug, PartialEq)]
pub enum CrossFieldRule {
    /// `secondary >= primary * factor`.
    AtLeastMultiple {
        primary: &'static str,
        secondary: &'static str,
        factor: f64,
    },
}

impl CrossFieldRule {
    pub fn describe(&self) -> String {
        match self {
            CrossFieldRule::AtLeastMultiple {
                primary,
                secondary,
                factor,
            } => format!("{secondary} >= {primary} * {factor}"),
        }
    }
}

/// A single problem found in a candidate record.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Violation {
    #[error("{path}: required field is missing")]
    Missing { path: String },
    #[error("{path}: expected {expected}")]
    WrongType { path: String, expected: &'static str },
    #[error("{path}: text is empty")]
    EmptyText { path: String },
    #[error("{path}: {len} chars exceeds limit of {max}")]
    TooLong { path: String, len: usize, max: usize },
    #[error("{path}: {value} is outside [{min}, {max}]")]
    OutOfRange {
        path: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{path}: {value:?} is not one of {allowed:?}")]
    NotInEnum {
        path: String,
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("{path}: {value:?} is not a well-formed identifier")]
    MalformedId { path: String, value: String },
    #[error("{path}: must be {expected}")]
    FixedMismatch { path: String, expected: String },
    #[error("{path}: {len} items, at least {min} required")]
    TooFewItems { path: String, len: usize, min: usize },
    #[error("{path}: {len} items, at most {max} allowed")]
    TooManyItems { path: String, len: usize, max: usize },
    #[error("{path}: {defined} fields defined, at least {min} required")]
    TooFewDefined {
        path: String,
        defined: usize,
        min: usize,
    },
    #[error("cross-field rule broken: {rule}")]
    CrossField { rule: String },
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Declarative contract for one generated record.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSchema {
    /// Short identifier, also used as the JSON-Schema name.
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
    pub rules: Vec<CrossFieldRule>,
}

impl OutputSchema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn rule(mut self, rule: CrossFieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the descriptor itself: unique names, sane bounds, defaults and
    /// fixed values that satisfy their own field, rules over numeric fields.
    pub fn is_well_formed(&self) -> bool {
        fields_well_formed(&self.fields)
            && self.rules.iter().all(|rule| match rule {
                CrossFieldRule::AtLeastMultiple {
                    primary,
                    secondary,
                    factor,
                } => {
                    factor.is_finite()
                        && *factor > 0.0
                        && [primary, secondary].iter().all(|name| {
                            matches!(
                                self.field_spec(name).map(|f| &f.kind),
                                Some(FieldKind::Number { .. }) | Some(FieldKind::Integer { .. })
                            )
                        })
                }
            })
    }

    /// Every violation in `raw`, in field order.
    pub fn validate(&self, raw: &Value) -> Vec<Violation> {
        let mut out = Vec::new();
        match raw.as_object() {
            Some(obj) => {
                check_fields(obj, &self.fields, "", &mut out);
                for rule in &self.rules {
                    check_rule(obj, rule, &mut out);
                }
            }
            None => out.push(Violation::WrongType {
                path: "$".to_string(),
                expected: "object",
            }),
        }
        out
    }

    /// Validate, then decode into the typed record.
    pub fn validate_into<T: DeserializeOwned>(&self, raw: &Value) -> Result<T, Vec<Violation>> {
        let violations = self.validate(raw);
        if !violations.is_empty() {
            return Err(violations);
        }
        serde_json::from_value(raw.clone()).map_err(|e| vec![Violation::Decode(e.to_string())])
    }

    /// JSON-Schema rendering sent along with model requests.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = object_schema(&self.fields, 0);
        if !self.rules.is_empty() {
            let rules: Vec<String> = self.rules.iter().map(CrossFieldRule::describe).collect();
            schema["description"] = json!(format!("Constraints: {}", rules.join("; ")));
        }
        schema
    }
}

/// Free-function form of [`OutputSchema::validate`].
pub fn validate(raw: &Value, schema: &OutputSchema) -> Vec<Violation> {
    schema.validate(raw)
}

/// Whether `value` is `prefix` followed by enough ASCII alphanumerics.
pub fn is_well_formed_id(prefix: &str, value: &str) -> bool {
    value.strip_prefix(prefix).is_some_and(|rest| {
        rest.len() >= ID_MIN_SUFFIX && rest.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// Violations of a single value against a field kind, reported under `path`.
pub fn validate_kind(value: &Value, kind: &FieldKind, path: &str) -> Vec<Violation> {
    let mut out = Vec::new();
    check_value(value, kind, path, &mut out);
    out
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn check_fields(obj: &Map<String, Value>, fields: &[FieldSpec], parent: &str, out: &mut Vec<Violation>) {
    for spec in fields {
        let path = join_path(parent, spec.name);
        match obj.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    out.push(Violation::Missing { path });
                }
            }
            Some(value) => {
                let before = out.len();
                check_value(value, &spec.kind, &path, out);
                if out.len() == before {
                    if let Some(fixed) = &spec.fixed {
                        if value != fixed {
                            out.push(Violation::FixedMismatch {
                                path,
                                expected: fixed.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
}

fn check_value(value: &Value, kind: &FieldKind, path: &str, out: &mut Vec<Violation>) {
    let wrong_type = |out: &mut Vec<Violation>| {
        out.push(Violation::WrongType {
            path: path.to_string(),
            expected: kind.type_name(),
        })
    };
    match kind {
        FieldKind::Text { max_len } => match value.as_str() {
            Some(s) if s.trim().is_empty() => out.push(Violation::EmptyText {
                path: path.to_string(),
            }),
            Some(s) => {
                let len = s.chars().count();
                if let Some(max) = max_len {
                    if len > *max {
                        out.push(Violation::TooLong {
                            path: path.to_string(),
                            len,
                            max: *max,
                        });
                    }
                }
            }
            None => wrong_type(out),
        },
        FieldKind::Integer { min, max } => match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) if i < *min || i > *max => out.push(Violation::OutOfRange {
                    path: path.to_string(),
                    value: i as f64,
                    min: *min as f64,
                    max: *max as f64,
                }),
                Some(_) => {}
                None if n.is_u64() => out.push(Violation::OutOfRange {
                    path: path.to_string(),
                    value: n.as_f64().unwrap_or(f64::MAX),
                    min: *min as f64,
                    max: *max as f64,
                }),
                None => wrong_type(out),
            },
            _ => wrong_type(out),
        },
        FieldKind::Number { min, max, .. } => match value.as_f64() {
            Some(x) => {
                let upper = max.unwrap_or(f64::INFINITY);
                if !x.is_finite() || x < *min || x > upper {
                    out.push(Violation::OutOfRange {
                        path: path.to_string(),
                        value: x,
                        min: *min,
                        max: upper,
                    });
                }
            }
            None => wrong_type(out),
        },
        FieldKind::Bool => {
            if !value.is_boolean() {
                wrong_type(out);
            }
        }
        FieldKind::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            Some(s) => out.push(Violation::NotInEnum {
                path: path.to_string(),
                value: s.to_string(),
                allowed: *allowed,
            }),
            None => wrong_type(out),
        },
        FieldKind::Identifier { prefix } => match value.as_str() {
            Some(s) if is_well_formed_id(prefix, s) => {}
            Some(s) => out.push(Violation::MalformedId {
                path: path.to_string(),
                value: s.to_string(),
            }),
            None => wrong_type(out),
        },
        FieldKind::Array {
            item,
            min_items,
            max_items,
        } => match value.as_array() {
            Some(items) => {
                if items.len() < *min_items {
                    out.push(Violation::TooFewItems {
                        path: path.to_string(),
                        len: items.len(),
                        min: *min_items,
                    });
                }
                if let Some(max) = max_items {
                    if items.len() > *max {
                        out.push(Violation::TooManyItems {
                            path: path.to_string(),
                            len: items.len(),
                            max: *max,
                        });
                    }
                }
                for (i, v) in items.iter().enumerate() {
                    check_value(v, item, &format!("{path}[{i}]"), out);
                }
            }
            None => wrong_type(out),
        },
        FieldKind::Object {
            fields,
            min_defined,
        } => match value.as_object() {
            Some(obj) => {
                check_fields(obj, fields, path, out);
                let defined = defined_count(obj, fields);
                if defined < *min_defined {
                    out.push(Violation::TooFewDefined {
                        path: path.to_string(),
                        defined,
                        min: *min_defined,
                    });
                }
            }
            None => wrong_type(out),
        },
    }
}

/// Fields of `fields` present in `obj` with a non-null value.
pub fn defined_count(obj: &Map<String, Value>, fields: &[FieldSpec]) -> usize {
    fields
        .iter()
        .filter(|f| obj.get(f.name).is_some_and(|v| !v.is_null()))
        .count()
}

fn check_rule(obj: &Map<String, Value>, rule: &CrossFieldRule, out: &mut Vec<Violation>) {
    match rule {
        CrossFieldRule::AtLeastMultiple {
            primary,
            secondary,
            factor,
        } => {
            let p = obj.get(*primary).and_then(Value::as_f64);
            let s = obj.get(*secondary).and_then(Value::as_f64);
            if let (Some(p), Some(s)) = (p, s) {
                if s + CROSS_FIELD_EPSILON < p * factor {
                    out.push(Violation::CrossField {
                        rule: rule.describe(),
                    });
                }
            }
        }
    }
}

fn fields_well_formed(fields: &[FieldSpec]) -> bool {
    let mut names = BTreeSet::new();
    fields.iter().all(|f| {
        let own_values_ok = [&f.default, &f.fixed].iter().all(|v| match v {
            Some(v) => {
                let mut out = Vec::new();
                check_value(v, &f.kind, f.name, &mut out);
                out.is_empty()
            }
            None => true,
        });
        names.insert(f.name) && !f.name.is_empty() && kind_well_formed(&f.kind) && own_values_ok
    })
}

fn kind_well_formed(kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Text { max_len } => max_len.map_or(true, |m| m > 0),
        FieldKind::Integer { min, max } => min <= max,
        FieldKind::Number { min, max, .. } => {
            min.is_finite() && max.map_or(true, |m| m.is_finite() && *min <= m)
        }
        FieldKind::Bool => true,
        FieldKind::Enum(values) => !values.is_empty(),
        FieldKind::Identifier { prefix } => !prefix.is_empty(),
        FieldKind::Array {
            item,
            min_items,
            max_items,
        } => max_items.map_or(true, |m| *min_items <= m) && kind_well_formed(item),
        FieldKind::Object {
            fields,
            min_defined,
        } => *min_defined <= fields.len() && fields_well_formed(fields),
    }
}

fn object_schema(fields: &[FieldSpec], min_defined: usize) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for f in fields {
        let mut prop = kind_schema(&f.kind);
        if let Some(fixed) = &f.fixed {
            prop["const"] = fixed.clone();
        }
        properties.insert(f.name.to_string(), prop);
        if f.required {
            required.push(f.name);
        }
    }
    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "required": required,
    });
    if min_defined > 0 {
        schema["minProperties"] = json!(min_defined);
    }
    schema
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text { max_len } => {
            let mut s = json!({ "type": "string", "minLength": 1 });
            if let Some(max) = max_len {
                s["maxLength"] = json!(max);
            }
            s
        }
        FieldKind::Integer { min, max } => {
            json!({ "type": "integer", "minimum": min, "maximum": max })
        }
        FieldKind::Number { min, max, .. } => {
            let mut s = json!({ "type": "number", "minimum": min });
            if let Some(max) = max {
                s["maximum"] = json!(max);
            }
            s
        }
        FieldKind::Bool => json!({ "type": "boolean" }),
        FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
        FieldKind::Identifier { prefix } => json!({
            "type": "string",
            "pattern": format!("^{prefix}[A-Za-z0-9]{{{ID_MIN_SUFFIX},}}$"),
        }),
        FieldKind::Array {
            item,
            min_items,
            max_items,
        } => {
            let mut s = json!({
                "type": "array",
                "items": kind_schema(item),
                "minItems": min_items,
            });
            if let Some(max) = max_items {
                s["maxItems"] = json!(max);
            }
            s
        }
        FieldKind::Object {
            fields,
            min_defined,
        } => object_schema(fields, *min_defined),
    }
}
