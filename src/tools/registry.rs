use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::schema::{ParameterSpec, SchemaType, ToolDefinition};
use crate::error::Result;

/// Invoked with the coerced, filtered arguments of a call.
pub type ToolHandler = Box<dyn Fn(&Map<String, Value>) -> std::result::Result<Value, String> + Send + Sync>;

pub struct Tool {
    pub definition: ToolDefinition,
    pub handler: ToolHandler,
}

#[cfg(test)]
impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("definition", &self.definition.name).finish_non_exhaustive()
    }
}

impl Tool {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// Declarative registration of a single tool.
pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    handler: Option<ToolHandler>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            handler: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(self, name: &str, schema_type: SchemaType) -> Self {
        self.param(ParameterSpec::required(name, schema_type))
    }

    pub fn optional(self, name: &str, schema_type: SchemaType, default: Value) -> Self {
        self.param(ParameterSpec::optional(name, schema_type, default))
    }

    pub fn required_choice(self, name: &str, choices: &[&str]) -> Self {
        self.param(ParameterSpec::required(name, SchemaType::String).with_choices(choices.iter().copied()))
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> std::result::Result<Tool, String> {
        if self.name.trim().is_empty() {
            return Err("tool name must be non-empty".to_string());
        }

        let handler = self
            .handler
            .ok_or_else(|| format!("Tool '{}' has no handler", self.name))?;

        let mut parameters: Vec<ParameterSpec> = Vec::with_capacity(self.parameters.len());
        for mut spec in self.parameters {
            if spec.name.trim().is_empty() {
                return Err(format!("Tool '{}' declares a parameter without a name", self.name));
            }
            if parameters.iter().any(|p| p.name == spec.name) {
                return Err(format!(
                    "Tool '{}' declares parameter '{}' more than once",
                    self.name, spec.name
                ));
            }
            if spec.required {
                spec.default = None;
            } else {
                spec.default = Some(checked_default(&self.name, &spec));
            }
            parameters.push(spec);
        }

        let definition = ToolDefinition {
            name: self.name,
            description: self.description,
            parameters,
        };

        let parameters_schema = definition.parameters_schema();
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&parameters_schema)
            .map_err(|e| format!("Tool '{}' has an invalid schema: {}", definition.name, e))?;

        Ok(Tool {
            definition,
            handler,
        })
    }
}

// A default that does not satisfy its own type becomes null.
fn checked_default(tool_name: &str, spec: &ParameterSpec) -> Value {
    let default = match spec.default {
        Some(ref value) if !value.is_null() => value.clone(),
        _ => return Value::Null,
    };

    let type_schema = spec.type_schema();
    let valid = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&type_schema)
        .map(|schema| schema.is_valid(&default))
        .unwrap_or(false);

    if valid {
        default
    } else {
        tracing::warn!(
            tool = tool_name,
            parameter = %spec.name,
            "default {} does not match type {}, using null",
            default,
            spec.schema_type
        );
        Value::Null
    }
}

/// A provider of tool registrations.
pub trait ToolSource {
    /// Human-readable origin, used in diagnostics.
    fn label(&self) -> String;

    /// Produce the tools of this source. Per-tool failures are skipped by the
    /// source itself; an `Err` means the source as a whole is unusable.
    fn load(&self) -> Result<Vec<Tool>>;
}

/// Tools in discovery order plus a name index.
#[derive(Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sources(sources: &[&dyn ToolSource]) -> Result<Self> {
        let mut catalog = Self::new();
        for source in sources {
            catalog.load_source(*source)?;
        }
        Ok(catalog)
    }

    /// Returns the number of tools that were registered from `source`.
    pub fn load_source(&mut self, source: &dyn ToolSource) -> Result<usize> {
        let tools = source.load()?;
        let mut added = 0;
        for tool in tools {
            if self.register(tool) {
                added += 1;
            }
        }
        tracing::debug!(source = %source.label(), added, "loaded tool source");
        Ok(added)
    }

    /// First registration of a name wins; later duplicates are skipped.
    pub fn register(&mut self, tool: Tool) -> bool {
        if self.index.contains_key(tool.name()) {
            tracing::warn!(tool = tool.name(), "duplicate tool name, keeping the first registration");
            return false;
        }
        self.index.insert(tool.name().to_string(), self.tools.len());
        self.tools.push(tool);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn list(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub fn format_tools_for_llm(catalog: &ToolCatalog) -> Vec<Value> {
    catalog.list().map(|tool| tool.definition.to_wire()).collect()
}

/// The wire schemas as one JSON string, for embedding in a raw prompt.
pub fn tools_as_prompt_text(catalog: &ToolCatalog) -> String {
    Value::Array(format_tools_for_llm(catalog)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop(name: &str) -> Tool {
        ToolBuilder::new(name)
            .handler(|_| Ok(Value::Null))
            .build()
            .unwrap()
    }

    struct FixedSource(Vec<&'static str>);

    impl ToolSource for FixedSource {
        fn label(&self) -> String {
            "fixed".to_string()
        }

        fn load(&self) -> Result<Vec<Tool>> {
            Ok(self.0.iter().map(|name| noop(name)).collect())
        }
    }

    #[test]
    fn test_build_requires_handler() {
        let result = ToolBuilder::new("nothing").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_duplicate_parameters() {
        let result = ToolBuilder::new("dup")
            .required("a", SchemaType::Number)
            .required("a", SchemaType::String)
            .handler(|_| Ok(Value::Null))
            .build();
        assert!(result.unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_mismatched_default_becomes_null() {
        let tool = ToolBuilder::new("t")
            .optional("count", SchemaType::Integer, json!("many"))
            .handler(|_| Ok(Value::Null))
            .build()
            .unwrap();
        assert_eq!(tool.definition.parameters[0].default, Some(Value::Null));
    }

    #[test]
    fn test_default_outside_choices_becomes_null() {
        let tool = ToolBuilder::new("t")
            .param(
                ParameterSpec::optional("unit", SchemaType::String, json!("pb"))
                    .with_choices(["kb", "mb"]),
            )
            .handler(|_| Ok(Value::Null))
            .build()
            .unwrap();
        assert_eq!(tool.definition.parameters[0].default, Some(Value::Null));
    }

    #[test]
    fn test_matching_default_is_kept() {
        let tool = ToolBuilder::new("add")
            .required("a", SchemaType::Number)
            .optional("b", SchemaType::Integer, json!(5))
            .handler(|_| Ok(Value::Null))
            .build()
            .unwrap();
        assert_eq!(tool.definition.parameters[1].default, Some(json!(5)));
        assert_eq!(tool.definition.required_names(), vec!["a"]);
    }

    #[test]
    fn test_catalog_keeps_first_duplicate_and_order() {
        let first = FixedSource(vec!["b", "a"]);
        let second = FixedSource(vec!["a", "c"]);
        let catalog = ToolCatalog::from_sources(&[&first, &second]).unwrap();
        assert_eq!(catalog.names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_prompt_text_is_json_array() {
        let mut catalog = ToolCatalog::new();
        catalog.register(noop("ping"));
        let parsed: Value = serde_json::from_str(&tools_as_prompt_text(&catalog)).unwrap();
        assert_eq!(parsed[0]["function"]["name"], "ping");
    }
}
