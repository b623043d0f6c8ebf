use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Message, Role};

/// Read a stored transcript.
///
/// A missing path or a directory is an error. Content that is not valid JSON
/// reads as an empty transcript; valid JSON that is not a list of messages,
/// or has a tool message without its tool name, is an error.
pub fn read_transcript(path: &Path) -> Result<Vec<Message>> {
    if !path.exists() {
        return Err(AppError::PathNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(AppError::IsADirectory(path.to_path_buf()));
    }

    let path = path.canonicalize()?;
    let contents = fs::read_to_string(&path)?;

    let stored = match serde_json::from_str::<Value>(&contents) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(file = %path.display(), "unreadable chat history, treating as empty: {}", e);
            Value::Array(Vec::new())
        }
    };

    let entries = match stored {
        Value::Array(entries) => entries,
        other => {
            return Err(AppError::HistoryFormat(format!(
                "expected a list, found {}",
                json_kind(&other)
            )))
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let message = serde_json::from_value::<Message>(entry)
                .map_err(|e| AppError::HistoryFormat(format!("entry {}: {}", i, e)))?;
            if message.role == Role::Tool && message.tool_name.is_none() {
                return Err(AppError::HistoryFormat(format!(
                    "entry {}: tool message without tool_name",
                    i
                )));
            }
            Ok(message)
        })
        .collect()
}

/// Overwrite `path` with the transcript as a pretty-printed JSON list.
pub fn write_transcript(path: &Path, messages: &[Message]) -> Result<()> {
    let content = serde_json::to_string_pretty(messages)?;
    fs::write(path, content)?;
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
