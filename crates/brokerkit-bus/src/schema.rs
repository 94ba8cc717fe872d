//! Payload validation.
//!
//! A [`Validator`] checks an arbitrary JSON value and returns the value
//! listeners should see, which may differ from the input (unknown object
//! keys are stripped by non-strict [`Schema::Object`]s, for instance).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<Value, ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<Value, ValidationError> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Location of the offending value, `$` being the payload root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }
}

/// Structural schema for JSON payloads, loadable from contract files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    Any,
    Null,
    Bool,
    Number,
    Integer,
    String,
    Literal {
        value: Value,
    },
    Array {
        items: Box<Schema>,
    },
    Object {
        #[serde(default)]
        fields: BTreeMap<String, Schema>,
        /// Reject keys not listed in `fields` instead of dropping them.
        #[serde(default)]
        strict: bool,
    },
    Optional {
        of: Box<Schema>,
    },
    OneOf {
        variants: Vec<Schema>,
    },
}

impl Schema {
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            strict: false,
        }
    }

    pub fn strict(self) -> Self {
        match self {
            Schema::Object { fields, .. } => Schema::Object { fields, strict: true },
            other => other,
        }
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
        }
    }

    pub fn optional(of: Schema) -> Self {
        Schema::Optional { of: Box::new(of) }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Schema::Literal {
            value: value.into(),
        }
    }

    pub fn one_of(variants: impl IntoIterator<Item = Schema>) -> Self {
        Schema::OneOf {
            variants: variants.into_iter().collect(),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Schema::Any => "any value",
            Schema::Null => "null",
            Schema::Bool => "boolean",
            Schema::Number => "number",
            Schema::Integer => "integer",
            Schema::String => "string",
            Schema::Literal { .. } => "literal",
            Schema::Array { .. } => "array",
            Schema::Object { .. } => "object",
            Schema::Optional { .. } => "optional value",
            Schema::OneOf { .. } => "one of the variants",
        }
    }

    /// Returns the coerced value when this node and all its children pass.
    fn check(&self, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
        let ok = match (self, value) {
            (Schema::Any, _) => true,
            (Schema::Null, Value::Null) => true,
            (Schema::Bool, Value::Bool(_)) => true,
            (Schema::Number, Value::Number(_)) => true,
            (Schema::Integer, Value::Number(n)) => {
                n.is_i64()
                    || n.is_u64()
                    || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            (Schema::String, Value::String(_)) => true,
            (Schema::Literal { value: expected }, actual) => {
                if expected != actual {
                    issues.push(issue(path, format!("expected literal {expected}, got {actual}")));
                    return None;
                }
                true
            }
            (Schema::Optional { of }, value) => {
                if value.is_null() {
                    return Some(Value::Null);
                }
                return of.check(value, path, issues);
            }
            (Schema::Array { items }, Value::Array(values)) => {
                let mut out = Vec::with_capacity(values.len());
                let before = issues.len();
                for (i, item) in values.iter().enumerate() {
                    if let Some(v) = items.check(item, &format!("{path}[{i}]"), issues) {
                        out.push(v);
                    }
                }
                return (issues.len() == before).then_some(Value::Array(out));
            }
            (Schema::Object { fields, strict }, Value::Object(map)) => {
                return check_object(fields, *strict, map, path, issues);
            }
            (Schema::OneOf { variants }, value) => {
                for variant in variants {
                    let mut scratch = Vec::new();
                    if let Some(v) = variant.check(value, path, &mut scratch) {
                        return Some(v);
                    }
                }
                issues.push(issue(path, "value did not match any variant"));
                return None;
            }
            _ => false,
        };

        if ok {
            Some(value.clone())
        } else {
            issues.push(issue(
                path,
                format!("expected {}, got {}", self.expected(), kind_of(value)),
            ));
            None
        }
    }
}

fn check_object(
    fields: &BTreeMap<String, Schema>,
    strict: bool,
    map: &Map<String, Value>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let before = issues.len();
    let mut out = Map::new();

    for (name, schema) in fields {
        let field_path = format!("{path}.{name}");
        match map.get(name) {
            Some(value) => {
                if let Some(v) = schema.check(value, &field_path, issues) {
                    out.insert(name.clone(), v);
                }
            }
            None if matches!(schema, Schema::Optional { .. } | Schema::Any) => {}
            None => issues.push(issue(&field_path, "required field is missing")),
        }
    }

    if strict {
        for key in map.keys().filter(|k| !fields.contains_key(*k)) {
            issues.push(issue(&format!("{path}.{key}"), "unknown field"));
        }
    }

    (issues.len() == before).then_some(Value::Object(out))
}

fn issue(path: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        path: path.to_string(),
        message: message.into(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Validator for Schema {
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        match self.check(value, "$", &mut issues) {
            Some(v) if issues.is_empty() => Ok(v),
            _ => Err(ValidationError { issues }),
        }
    }
}

/// Validates by deserializing into `T`; listeners see `T` re-serialized.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator for TypedSchema<T>
where
    T: DeserializeOwned + Serialize,
{
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let typed = T::deserialize(value).map_err(|e| ValidationError::new("$", e.to_string()))?;
        serde_json::to_value(&typed).map_err(|e| ValidationError::new("$", e.to_string()))
    }
}
