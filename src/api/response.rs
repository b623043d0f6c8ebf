use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Message, Role, ToolCallRequest};

fn parse_tool_calls(value: Option<&Value>) -> Result<Option<Vec<ToolCallRequest>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(calls) => {
            let calls: Vec<ToolCallRequest> = serde_json::from_value(calls.clone())?;
            Ok(Some(calls))
        }
    }
}

/// Parse the body of a `/api/chat` response into an assistant message.
pub fn parse_chat_response(response_json: &Value) -> Result<Message> {
    let message = response_json
        .get("message")
        .ok_or_else(|| AppError::Other("No message in response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string());
    let tool_calls = parse_tool_calls(message.get("tool_calls"))?;

    Ok(Message {
        role: Role::Assistant,
        content,
        tool_calls,
        tool_name: None,
    })
}

/// Parse the body of a `/api/generate` response into an assistant message.
pub fn parse_generate_response(response_json: &Value) -> Result<Message> {
    let content = response_json
        .get("response")
        .and_then(|r| r.as_str())
        .ok_or_else(|| AppError::Other("No response text in generate response".to_string()))?;
    let tool_calls = parse_tool_calls(response_json.get("tool_calls"))?;

    Ok(Message::assistant(Some(content.to_string()), tool_calls))
}

/// Error text reported by the server, or the raw body when it has none.
pub fn extract_error(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(|s| s.to_string()))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Prompt layout used for raw completions with tools available.
pub fn format_raw_prompt(prompt: &str, tools: &str) -> String {
    format!(
        "[AVAILABLE_TOOLS] {}[/AVAILABLE_TOOLS][INST] {} [/INST]",
        tools, prompt
    )
}
