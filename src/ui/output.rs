use colored::*;
use serde_json::{Map, Value};

fn boxed(title: &str, body: &str) -> String {
    let body = body.trim_end_matches('\n');
    let width = body
        .lines()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count() + 2))
        .max()
        .unwrap_or(0)
        .min(100);
    let rule = "─".repeat(width);
    format!("┌ {}\n{}\n└{}", title, body, rule)
}

/// Announce a tool invocation requested by the model.
pub fn display_tool_call(name: &str, arguments: &Map<String, Value>) {
    let args = Value::Object(arguments.clone());
    println!("{}", format!("Calling tool: {} {}", name, args).cyan());
}

/// Display a tool result in a boxed format
pub fn display_tool_result(name: &str, result: &str) {
    println!("{}", boxed(&format!("TOOL: {}", name), result).dimmed());
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", "Error:".red(), message);
}

pub fn display_content(content: &str) {
    println!("{}", content.trim_end());
}
