//! Declarative output shapes for structured generation calls
//!
//! A `SchemaDescriptor` is used twice per call: rendered into the request
//! as the capability's response-schema constraint, then used to validate
//! the returned text before anything typed is built from it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use log::{debug, trace};
use crate::error::Error;

/// Shape of one value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaKind
{   String
  , Number
  , Integer
  , Boolean
  , Array(Box<SchemaDescriptor>)
  , Object(Vec<FieldSpec>)
}

/// A described shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor
{   pub kind: SchemaKind
  , pub description: Option<String>
}

/// One named field of an object shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec
{   pub name: String
  , pub schema: SchemaDescriptor
  , pub required: bool
}

impl FieldSpec
{   pub fn required(name: &str, schema: SchemaDescriptor) -> Self
    {   FieldSpec
        {   name: name.to_string()
          , schema
          , required: true
        }
    }

    pub fn optional(name: &str, schema: SchemaDescriptor) -> Self
    {   FieldSpec
        {   name: name.to_string()
          , schema
          , required: false
        }
    }
}

impl SchemaDescriptor
{   fn of(kind: SchemaKind) -> Self
    {   SchemaDescriptor
        {   kind
          , description: None
        }
    }

    pub fn string() -> Self
    {   Self::of(SchemaKind::String)
    }

    pub fn number() -> Self
    {   Self::of(SchemaKind::Number)
    }

    pub fn integer() -> Self
    {   Self::of(SchemaKind::Integer)
    }

    pub fn boolean() -> Self
    {   Self::of(SchemaKind::Boolean)
    }

    pub fn array(items: SchemaDescriptor) -> Self
    {   Self::of(SchemaKind::Array(Box::new(items)))
    }

    pub fn object(fields: Vec<FieldSpec>) -> Self
    {   Self::of(SchemaKind::Object(fields))
    }

    pub fn described(mut self, description: &str) -> Self
    {   self.description = Some(description.to_string());
        self
    }

    /// Response-schema JSON in the capability's OpenAPI subset
    pub fn to_wire(&self) -> Value
    {   let mut out = Map::new();
        let type_name = match &self.kind
        {   SchemaKind::String => "STRING"
          , SchemaKind::Number => "NUMBER"
          , SchemaKind::Integer => "INTEGER"
          , SchemaKind::Boolean => "BOOLEAN"
          , SchemaKind::Array(_) => "ARRAY"
          , SchemaKind::Object(_) => "OBJECT"
        };
        out.insert("type".to_string(), json!(type_name));
        if let Some(description) = &self.description
        {   out.insert("description".to_string(), json!(description));
        }
        match &self.kind
        {   SchemaKind::Array(items) => {
              out.insert("items".to_string(), items.to_wire());
            }
          , SchemaKind::Object(fields) => {
              let mut properties = Map::new();
              for field in fields
              {   properties.insert(
                    field.name.clone(),
                    field.schema.to_wire()
                  );
              }
              let required: Vec<&str> = fields.iter()
                .filter(|f| f.required)
                .map(|f| f.name.as_str())
                .collect();
              let ordering: Vec<&str> = fields.iter()
                .map(|f| f.name.as_str())
                .collect();
              out.insert(
                "properties".to_string(),
                Value::Object(properties)
              );
              if !required.is_empty()
              {   out.insert("required".to_string(), json!(required));
              }
              out.insert("propertyOrdering".to_string(), json!(ordering));
            }
          , _ => {}
        }
        Value::Object(out)
    }

    /// Check `value` against this shape. Required fields that are
    /// absent or null are rejected.
    pub fn validate(&self, value: &Value) -> Result<(), Error>
    {   self.validate_at("$", value)
    }

    fn validate_at(&self, path: &str, value: &Value)
      -> Result<(), Error>
    {   let mismatch = |expected: &str| {
          Error::SchemaValidation(format!(
            "{}: expected {}, found {}",
            path, expected, type_label(value)
          ))
        };
        match &self.kind
        {   SchemaKind::String => {
              value.as_str()
                .map(|_| ())
                .ok_or_else(|| mismatch("string"))
            }
          , SchemaKind::Number => {
              if value.is_number()
              {   Ok(())
              } else
              {   Err(mismatch("number"))
              }
            }
          , SchemaKind::Integer => {
              if value.is_i64() || value.is_u64()
              {   Ok(())
              } else
              {   Err(mismatch("integer"))
              }
            }
          , SchemaKind::Boolean => {
              if value.is_boolean()
              {   Ok(())
              } else
              {   Err(mismatch("boolean"))
              }
            }
          , SchemaKind::Array(items) => {
              let elements = value.as_array()
                .ok_or_else(|| mismatch("array"))?;
              for (index, element) in elements.iter().enumerate()
              {   items.validate_at(
                    &format!("{}[{}]", path, index),
                    element
                  )?;
              }
              Ok(())
            }
          , SchemaKind::Object(fields) => {
              let map = value.as_object()
                .ok_or_else(|| mismatch("object"))?;
              for field in fields
              {   let field_path = format!("{}.{}", path, field.name);
                  match map.get(&field.name)
                  {   None | Some(Value::Null) => {
                        if field.required
                        {   return Err(Error::SchemaValidation(format!(
                              "{}: missing required field",
                              field_path
                            )));
                        }
                      }
                    , Some(inner) => {
                        field.schema.validate_at(&field_path, inner)?;
                      }
                  }
              }
              Ok(())
            }
        }
    }

    /// Parse returned text as data of this shape.
    /// A Markdown code fence around the JSON is tolerated.
    pub fn parse_text(&self, text: &str) -> Result<Value, Error>
    {   let body = strip_code_fence(text);
        trace!("Parsing structured reply: {}", body);
        let value: Value = serde_json::from_str(body).map_err(|e| {
          debug!("Structured reply is not JSON: {}", e);
          Error::SchemaValidation(format!("malformed JSON: {}", e))
        })?;
        self.validate(&value)?;
        Ok(value)
    }
}

fn type_label(value: &Value) -> &'static str
{   match value
    {   Value::Null => "null"
      , Value::Bool(_) => "boolean"
      , Value::Number(_) => "number"
      , Value::String(_) => "string"
      , Value::Array(_) => "array"
      , Value::Object(_) => "object"
    }
}

fn strip_code_fence(text: &str) -> &str
{   let trimmed = text.trim();
    let Some(opened) = trimmed.strip_prefix("```") else
    {   return trimmed;
    };
    let Some(closed) = opened.strip_suffix("```") else
    {   return trimmed;
    };
    // drop the info string, e.g. ```json
    match closed.find('\n')
    {   Some(newline) => closed[newline + 1..].trim()
      , None => closed.trim()
    }
}

/// A Rust type that can be requested from a structured call
pub trait Structured: DeserializeOwned
{   fn schema() -> SchemaDescriptor;

    /// Build the typed value from already-validated data
    fn from_validated(value: Value) -> Result<Self, Error>
    {   serde_json::from_value(value).map_err(|e| {
          Error::SchemaValidation(e.to_string())
        })
    }
}

impl Structured for String
{   fn schema() -> SchemaDescriptor
    {   SchemaDescriptor::string()
    }
}

impl<T: Structured> Structured for Vec<T>
{   fn schema() -> SchemaDescriptor
    {   SchemaDescriptor::array(T::schema())
    }
}
