use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Closed set of parameter types a tool may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl SchemaType {
    /// Resolve a declared type name.
    ///
    /// Accepts both the JSON Schema names and the short annotation spellings
    /// (`str`, `int`, `float`, `bool`, `list`, `dict`, `None`). Returns `None`
    /// for anything outside the closed set.
    pub fn from_annotation(annotation: &str) -> Option<Self> {
        match annotation.trim() {
            "str" | "string" => Some(SchemaType::String),
            "int" | "integer" => Some(SchemaType::Integer),
            "float" | "number" => Some(SchemaType::Number),
            "bool" | "boolean" => Some(SchemaType::Boolean),
            "list" | "array" => Some(SchemaType::Array),
            "dict" | "object" => Some(SchemaType::Object),
            "None" | "null" => Some(SchemaType::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
            SchemaType::Null => "null",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub schema_type: SchemaType,
    /// Closed set of accepted values, in declaration order.
    pub enum_values: Option<Vec<String>>,
    pub required: bool,
    /// Only set for optional parameters. `Some(Value::Null)` is a null default.
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, schema_type: SchemaType) -> Self {
        Self {
            name: name.into(),
            schema_type,
            enum_values: None,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, schema_type: SchemaType, default: Value) -> Self {
        Self {
            name: name.into(),
            schema_type,
            enum_values: None,
            required: false,
            default: Some(default),
        }
    }

    /// Closed-choice parameters are always strings.
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = Vec::new();
        for choice in choices {
            let choice = choice.into();
            if !values.contains(&choice) {
                values.push(choice);
            }
        }
        self.schema_type = SchemaType::String;
        self.enum_values = Some(values);
        self
    }

    /// The property schema without the default: `{type, enum?}`.
    pub fn type_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.schema_type.as_str()));
        if let Some(ref values) = self.enum_values {
            property.insert("enum".to_string(), json!(values));
        }
        Value::Object(property)
    }

    /// The property schema as sent to the model: `{type, enum?, default?}`.
    pub fn property_schema(&self) -> Value {
        let mut property = self.type_schema();
        if !self.required {
            if let (Some(map), Some(default)) = (property.as_object_mut(), self.default.as_ref()) {
                map.insert("default".to_string(), default.clone());
            }
        }
        property
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// The `parameters` object of the wire schema.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(param.name.clone(), param.property_schema());
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_names(),
        })
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema(),
            }
        })
    }
}
