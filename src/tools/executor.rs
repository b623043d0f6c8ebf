use serde_json::{Map, Number, Value};
use std::cell::Cell;
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::sync::Once;

use super::registry::{Tool, ToolCatalog};
use super::schema::SchemaType;

/// Coerce a model-supplied value to the declared parameter type.
pub fn coerce(value: &Value, schema_type: SchemaType) -> Result<Value, String> {
    let fail = || format!("cannot convert {} to {}", value, schema_type);

    match schema_type {
        SchemaType::Null => Ok(Value::Null),
        SchemaType::String => Ok(match value {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }),
        SchemaType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| Value::from(f.trunc() as i64))
                .ok_or_else(fail),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| fail()),
            Value::Bool(b) => Ok(Value::from(*b as i64)),
            _ => Err(fail()),
        },
        SchemaType::Number => match value {
            Value::Number(n) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail),
            Value::Bool(b) => Ok(Value::from(if *b { 1.0 } else { 0.0 })),
            _ => Err(fail()),
        },
        SchemaType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        SchemaType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Array(_)) => Ok(parsed),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        SchemaType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => Ok(parsed),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
    }
}

/// Render a tool's return value as the text fed back to the model.
pub fn render_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

thread_local! {
    static CONTAINING_PANIC: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

// Panics inside a tool handler are logged instead of printed by the default
// hook. Panics anywhere else still reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAINING_PANIC.with(|flag| flag.get()) {
                tracing::debug!("tool handler panicked: {}", info);
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f`, turning a panic into an `Err` carrying its message.
pub fn run_contained<F>(f: F) -> Result<Value, String>
where
    F: FnOnce() -> Result<Value, String>,
{
    install_quiet_hook();
    CONTAINING_PANIC.with(|flag| flag.set(true));
    let outcome = catch_unwind(AssertUnwindSafe(f));
    CONTAINING_PANIC.with(|flag| flag.set(false));
    outcome.unwrap_or_else(|payload| Err(panic_message(payload)))
}

/// Runs tools by name. Every outcome, including failures, is returned as text.
pub struct ToolExecutor {
    catalog: ToolCatalog,
}

impl ToolExecutor {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Coerce, filter and complete the supplied arguments for `tool`.
    ///
    /// Declared arguments are coerced to their type, keeping the original
    /// value when that fails. `null` counts as absent. Undeclared arguments
    /// are dropped and absent optional parameters receive their default.
    pub fn prepare_arguments(tool: &Tool, arguments: &Map<String, Value>) -> Map<String, Value> {
        let mut prepared = Map::new();

        for spec in &tool.definition.parameters {
            match arguments.get(&spec.name) {
                Some(value) if !value.is_null() => {
                    let coerced = coerce(value, spec.schema_type).unwrap_or_else(|e| {
                        tracing::debug!(
                            tool = %tool.definition.name,
                            parameter = %spec.name,
                            "keeping original value: {}",
                            e
                        );
                        value.clone()
                    });
                    prepared.insert(spec.name.clone(), coerced);
                }
                _ => {
                    if let Some(ref default) = spec.default {
                        if !spec.required && !default.is_null() {
                            prepared.insert(spec.name.clone(), default.clone());
                        }
                    }
                }
            }
        }

        for name in arguments.keys() {
            if tool.definition.parameter(name).is_none() {
                tracing::debug!(tool = %tool.definition.name, argument = %name, "dropping undeclared argument");
            }
        }

        prepared
    }

    pub fn execute(&self, name: &str, arguments: &Map<String, Value>) -> String {
        let tool = match self.catalog.get(name) {
            Some(tool) => tool,
            None => return format!("Tool \"{}\" not found.", name),
        };

        let prepared = Self::prepare_arguments(tool, arguments);
        tracing::debug!(tool = name, arguments = %serde_json::Value::Object(prepared.clone()), "executing tool");

        let outcome = run_contained(|| (tool.handler)(&prepared));

        match outcome {
            Ok(value) => render_result(&value),
            Err(e) => format!(
                "Tool \"{}\" failed with error {}. Arguments: {}",
                name,
                e,
                Value::Object(prepared)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::ToolBuilder;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn executor() -> ToolExecutor {
        let mut catalog = ToolCatalog::new();
        catalog.register(
            ToolBuilder::new("add")
                .required("a", SchemaType::Number)
                .optional("b", SchemaType::Integer, json!(5))
                .handler(|args| {
                    let a = args.get("a").and_then(|v| v.as_f64()).ok_or("a must be a number")?;
                    let b = args.get("b").and_then(|v| v.as_f64()).ok_or("b must be a number")?;
                    Ok(json!(a + b))
                })
                .build()
                .unwrap(),
        );
        catalog.register(
            ToolBuilder::new("echo_args")
                .required("text", SchemaType::String)
                .optional("flag", SchemaType::Boolean, Value::Null)
                .handler(|args| Ok(Value::Object(args.clone())))
                .build()
                .unwrap(),
        );
        catalog.register(
            ToolBuilder::new("explode")
                .required("x", SchemaType::Integer)
                .handler(|_| panic!("boom"))
                .build()
                .unwrap(),
        );
        ToolExecutor::new(catalog)
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce(&json!("42"), SchemaType::Integer).unwrap(), json!(42));
        assert_eq!(coerce(&json!(3.7), SchemaType::Integer).unwrap(), json!(3));
        assert_eq!(coerce(&json!(true), SchemaType::Integer).unwrap(), json!(1));
        assert!(coerce(&json!("four"), SchemaType::Integer).is_err());
        assert!(coerce(&json!([1]), SchemaType::Integer).is_err());
    }

    #[test]
    fn test_coerce_number_and_string() {
        assert_eq!(coerce(&json!("2.5"), SchemaType::Number).unwrap(), json!(2.5));
        assert_eq!(coerce(&json!(2), SchemaType::Number).unwrap(), json!(2.0));
        assert_eq!(coerce(&json!(12), SchemaType::String).unwrap(), json!("12"));
        assert_eq!(coerce(&json!("x"), SchemaType::String).unwrap(), json!("x"));
    }

    #[test]
    fn test_coerce_boolean() {
        assert_eq!(coerce(&json!("Yes"), SchemaType::Boolean).unwrap(), json!(true));
        assert_eq!(coerce(&json!(0), SchemaType::Boolean).unwrap(), json!(false));
        assert!(coerce(&json!("maybe"), SchemaType::Boolean).is_err());
    }

    #[test]
    fn test_coerce_collections_from_json_text() {
        assert_eq!(coerce(&json!("[1, 2]"), SchemaType::Array).unwrap(), json!([1, 2]));
        assert_eq!(coerce(&json!("{\"k\": 1}"), SchemaType::Object).unwrap(), json!({"k": 1}));
        assert!(coerce(&json!("{\"k\": 1}"), SchemaType::Array).is_err());
    }

    #[test]
    fn test_unknown_tool_returns_message() {
        let result = executor().execute("nonexistent", &Map::new());
        assert_eq!(result, "Tool \"nonexistent\" not found.");
    }

    #[test]
    fn test_execute_coerces_and_applies_default() {
        let result = executor().execute("add", &args(json!({"a": "2.5"})));
        assert_eq!(result, "7.5");
    }

    #[test]
    fn test_execute_drops_undeclared_arguments() {
        let result = executor().execute("echo_args", &args(json!({"text": 1, "extra": true})));
        assert_eq!(result, "{\"text\":\"1\"}");
    }

    #[test]
    fn test_null_argument_counts_as_absent() {
        let result = executor().execute("add", &args(json!({"a": 1, "b": null})));
        assert_eq!(result, "6.0");
    }

    #[test]
    fn test_failed_coercion_keeps_original_value() {
        let result = executor().execute("add", &args(json!({"a": "lots", "b": 1})));
        assert!(result.starts_with("Tool \"add\" failed with error a must be a number"));
        assert!(result.contains("\"a\":\"lots\""));
        assert!(result.contains("\"b\":1"));
    }

    #[test]
    fn test_panicking_tool_is_contained() {
        let result = executor().execute("explode", &args(json!({"x": "7"})));
        assert!(result.contains("Tool \"explode\" failed with error boom"));
        assert!(result.contains("\"x\":7"));
    }

    #[test]
    fn test_contained_panic_resets_quiet_flag() {
        let outcome = run_contained(|| panic!("kaboom {}", 1));
        assert_eq!(outcome, Err("kaboom 1".to_string()));
        assert!(!CONTAINING_PANIC.with(|flag| flag.get()));

        let outcome = run_contained(|| Ok(json!("fine")));
        assert_eq!(outcome, Ok(json!("fine")));
        assert!(!CONTAINING_PANIC.with(|flag| flag.get()));
    }
}
