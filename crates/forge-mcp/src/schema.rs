//! Declared input schemas
//!
//! Every capability declares its parameters up front. Arguments are checked
//! against the declaration before any handler runs, so handlers read typed
//! values from [`Arguments`] instead of probing raw JSON.

use serde_json::{Map, Value, json};
use thiserror::Error;

/// Type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// Non-negative integer; numeric strings are accepted and normalised.
    Integer,
    StringArray,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
}

impl FieldType {
    fn describe(self) -> String {
        match self {
            Self::String => "a string".to_string(),
            Self::Integer => "a non-negative integer".to_string(),
            Self::StringArray => "an array of strings".to_string(),
            Self::Enum(values) => format!("one of: {}", values.join(", ")),
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub description: &'static str,
}

impl Field {
    pub const fn required(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            description,
        }
    }
}

/// Arguments rejected at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("missing required argument '{field}'")]
    Missing { field: String },

    #[error("argument '{field}' must not be empty")]
    Empty { field: String },

    #[error("argument '{field}' must be {expected}")]
    WrongType { field: String, expected: String },

    /// A cross-field rule the schema cannot express.
    #[error("{0}")]
    Rule(String),
}

/// The parameters a capability accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSchema {
    fields: &'static [Field],
}

impl InputSchema {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    /// Check `arguments` and keep only declared, normalised values.
    ///
    /// `null` counts as an empty object. Undeclared keys are ignored.
    pub fn validate(&self, arguments: &Value) -> Result<Arguments, ValidationError> {
        let empty = Map::new();
        let object = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(ValidationError::NotAnObject),
        };

        let mut accepted = Map::new();
        for field in self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(ValidationError::Missing {
                            field: field.name.to_string(),
                        });
                    }
                }
                Some(value) => {
                    let value = check(field, value)?;
                    accepted.insert(field.name.to_string(), value);
                }
            }
        }

        Ok(Arguments(accepted))
    }

    /// JSON Schema object advertised in `tools/list`.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            let mut property = match field.ty {
                FieldType::String => json!({ "type": "string" }),
                FieldType::Integer => json!({ "type": "integer", "minimum": 0 }),
                FieldType::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
                FieldType::Enum(values) => json!({ "type": "string", "enum": values }),
            };
            property["description"] = json!(field.description);
            properties.insert(field.name.to_string(), property);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Argument list advertised in `prompts/list`.
    pub fn to_prompt_arguments(&self) -> Value {
        Value::Array(
            self.fields
                .iter()
                .map(|f| {
                    json!({
                        "name": f.name,
                        "description": f.description,
                        "required": f.required,
                    })
                })
                .collect(),
        )
    }
}

fn check(field: &Field, value: &Value) -> Result<Value, ValidationError> {
    let wrong_type = || ValidationError::WrongType {
        field: field.name.to_string(),
        expected: field.ty.describe(),
    };

    match field.ty {
        FieldType::String => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if field.required && s.trim().is_empty() {
                return Err(ValidationError::Empty {
                    field: field.name.to_string(),
                });
            }
            Ok(value.clone())
        }
        FieldType::Integer => {
            let n = match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => None,
            };
            n.map(Value::from).ok_or_else(wrong_type)
        }
        FieldType::StringArray => {
            let items = value.as_array().ok_or_else(wrong_type)?;
            if items.iter().all(Value::is_string) {
                Ok(value.clone())
            } else {
                Err(wrong_type())
            }
        }
        FieldType::Enum(values) => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if values.contains(&s) {
                Ok(value.clone())
            } else {
                Err(wrong_type())
            }
        }
    }
}

/// Arguments that passed schema validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Like [`get_str`](Self::get_str), treating blank strings as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get_str(name).filter(|s| !s.trim().is_empty())
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ValidationError> {
        self.get_str(name).ok_or_else(|| ValidationError::Missing {
            field: name.to_string(),
        })
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.0.get(name).and_then(Value::as_u64)
    }

    pub fn require_u64(&self, name: &str) -> Result<u64, ValidationError> {
        self.get_u64(name).ok_or_else(|| ValidationError::Missing {
            field: name.to_string(),
        })
    }

    pub fn get_str_list(&self, name: &str) -> Option<Vec<String>> {
        self.0.get(name).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }
}
