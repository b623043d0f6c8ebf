use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A tool invocation requested by the model.
///
/// Stored in the server's shape, `{"function": {"name", "arguments"}}`, so
/// transcripts round-trip through the model unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.function.arguments
    }
}

// Some servers send arguments as a JSON-encoded string instead of an object.
fn deserialize_arguments<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(serde::de::Error::custom(format!(
                "tool call arguments are not a JSON object: {}",
                raw
            ))),
        },
        other => Err(serde::de::Error::custom(format!(
            "tool call arguments must be an object, got {}",
            other
        ))),
    }
}
