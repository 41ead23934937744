//! Field schemas for structured extraction.
//!
//! A schema drives two things: the field list rendered into the instruction,
//! and the conformance pass that runs on the model's JSON before it is
//! deserialized into a typed record.

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Number,
    TextList,
    ObjectList(&'static [FieldSpec]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    fn describe(&self) -> String {
        if self.required {
            format!("{} ({})", self.name, self.kind.describe())
        } else {
            format!("{} ({}, optional)", self.name, self.kind.describe())
        }
    }
}

impl FieldKind {
    fn describe(&self) -> String {
        match self {
            FieldKind::Text => "string".to_string(),
            FieldKind::Number => "number".to_string(),
            FieldKind::TextList => "list of strings".to_string(),
            FieldKind::ObjectList(fields) => format!(
                "list of objects with fields: {}",
                fields
                    .iter()
                    .map(FieldSpec::describe)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

#[derive(Debug)]
pub struct FieldSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl FieldSchema {
    /// Renders the field list as instruction lines, one `- field (type)` per field.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("- {}", f.describe()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Checks a parsed response against the schema and coerces near-misses:
    /// numeric strings ("85", "85%") become numbers, scalars become strings
    /// where text is expected, a lone string becomes a one-element list, and
    /// `null` optional fields are dropped. Unknown fields are kept.
    pub fn conform(&self, value: Value) -> Result<Value, String> {
        conform_object(self.fields, value)
    }
}

/// A typed record the gateway can extract. Each record names its schema.
pub trait StructuredRecord: DeserializeOwned + Send {
    fn schema() -> &'static FieldSchema;
}

fn conform_object(fields: &[FieldSpec], value: Value) -> Result<Value, String> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Err(format!("expected a JSON object, got {}", type_name(&other))),
    };

    for spec in fields {
        match map.remove(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(format!("missing required field `{}`", spec.name));
                }
            }
            Some(v) => {
                let conformed =
                    conform_kind(spec.kind, v).map_err(|e| format!("field `{}`: {e}", spec.name))?;
                map.insert(spec.name.to_string(), conformed);
            }
        }
    }

    Ok(Value::Object(map))
}

fn conform_kind(kind: FieldKind, value: Value) -> Result<Value, String> {
    match kind {
        FieldKind::Text => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(format!("expected string, got {}", type_name(&other))),
        },
        FieldKind::Number => match value {
            Value::Number(_) => Ok(value),
            Value::String(s) => {
                let trimmed = s.trim().trim_end_matches('%').trim();
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("expected number, got \"{s}\""))
            }
            other => Err(format!("expected number, got {}", type_name(&other))),
        },
        FieldKind::TextList => match value {
            Value::Array(items) => items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| conform_kind(FieldKind::Text, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::String(_) => Ok(Value::Array(vec![value])),
            other => Err(format!("expected list of strings, got {}", type_name(&other))),
        },
        FieldKind::ObjectList(fields) => match value {
            Value::Array(items) => items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| conform_object(fields, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(_) => Ok(Value::Array(vec![conform_object(fields, value)?])),
            other => Err(format!("expected list of objects, got {}", type_name(&other))),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
