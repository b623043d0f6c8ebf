use serde_json::{json, Map, Value};

use super::registry::{Tool, ToolBuilder, ToolSource};
use super::schema::SchemaType;
use crate::error::Result;

const STORAGE_UNITS: &[&str] = &["bytes", "kb", "mb", "gb", "tb"];

fn present_arg<'a>(args: &'a Map<String, Value>, name: &str) -> std::result::Result<&'a Value, String> {
    args.get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| format!("Missing required argument: {}", name))
}

fn number_arg(args: &Map<String, Value>, name: &str) -> std::result::Result<f64, String> {
    let value = present_arg(args, name)?;
    value
        .as_f64()
        .ok_or_else(|| format!("Argument {} is not a number: {}", name, value))
}

/// Any JSON integer, signed or unsigned, widened to `f64` for arithmetic.
fn integer_arg(args: &Map<String, Value>, name: &str) -> std::result::Result<f64, String> {
    let value = present_arg(args, name)?;
    value
        .as_i64()
        .map(|i| i as f64)
        .or_else(|| value.as_u64().map(|u| u as f64))
        .ok_or_else(|| format!("Argument {} is not an integer: {}", name, value))
}

fn string_arg<'a>(args: &'a Map<String, Value>, name: &str) -> std::result::Result<&'a str, String> {
    let value = present_arg(args, name)?;
    value
        .as_str()
        .ok_or_else(|| format!("Argument {} is not a string: {}", name, value))
}

pub fn handle_add(args: &Map<String, Value>) -> std::result::Result<Value, String> {
    let a = number_arg(args, "a")?;
    let b = number_arg(args, "b")?;
    Ok(json!(a + b))
}

pub fn handle_format_bytes(args: &Map<String, Value>) -> std::result::Result<Value, String> {
    const LABELS: [&str; 5] = ["", "K", "M", "G", "T"];
    let mut size = integer_arg(args, "size")?;
    let mut power = 0;
    while size > 1024.0 && power < LABELS.len() - 1 {
        size /= 1024.0;
        power += 1;
    }
    Ok(json!(format!("{:.2}{}b", size, LABELS[power])))
}

pub fn handle_convert(args: &Map<String, Value>) -> std::result::Result<Value, String> {
    let number = number_arg(args, "number")?;
    let unit_power = |name: &str| -> std::result::Result<i32, String> {
        let unit = string_arg(args, name)?;
        STORAGE_UNITS
            .iter()
            .position(|u| *u == unit)
            .map(|p| p as i32)
            .ok_or_else(|| format!("Invalid format '{}'. Use 'bytes', 'kb', 'mb', 'gb', or 'tb'.", unit))
    };
    let current = unit_power("current_format")?;
    let desired = unit_power("desired_format")?;

    let bytes = number * 1024f64.powi(current);
    Ok(json!(bytes / 1024f64.powi(desired)))
}

pub fn handle_time_now(_args: &Map<String, Value>) -> std::result::Result<Value, String> {
    Ok(json!(chrono::Local::now().to_rfc3339()))
}

/// Tools compiled into the binary.
pub struct BuiltinSource;

impl BuiltinSource {
    fn registrations() -> Vec<std::result::Result<Tool, String>> {
        vec![
            ToolBuilder::new("add")
                .description("Add a + b.")
                .required("a", SchemaType::Number)
                .optional("b", SchemaType::Number, json!(5.0))
                .handler(handle_add)
                .build(),
            ToolBuilder::new("format_bytes")
                .description(
                    "Format bytes into either: bytes, kilobytes, megabytes, gigabytes, or terabytes.",
                )
                .required("size", SchemaType::Integer)
                .handler(handle_format_bytes)
                .build(),
            ToolBuilder::new("convert")
                .description(
                    "Converts a given number between storage units: 'bytes', 'kb', 'mb', 'gb', or 'tb'.",
                )
                .required("number", SchemaType::Number)
                .required_choice("current_format", STORAGE_UNITS)
                .required_choice("desired_format", STORAGE_UNITS)
                .handler(handle_convert)
                .build(),
            ToolBuilder::new("time_now")
                .description("Get the current local date and time in ISO-8601 format.")
                .handler(handle_time_now)
                .build(),
        ]
    }
}

impl ToolSource for BuiltinSource {
    fn label(&self) -> String {
        "builtin".to_string()
    }

    fn load(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        for registration in Self::registrations() {
            match registration {
                Ok(tool) => tools.push(tool),
                Err(e) => tracing::warn!("skipping builtin tool: {}", e),
            }
        }
        Ok(tools)
    }
}
