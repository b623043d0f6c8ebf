use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Instant;

use crate::config::{expand_env_var_in_string, expand_env_vars};

/// How a manifest tool is run.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub tool_name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub stdin_json: bool,
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex"))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace `{{name}}` placeholders with argument values.
pub fn template_args(args: &[String], arguments: &Map<String, Value>) -> Result<Vec<String>, String> {
    let re = placeholder_regex();
    let mut rendered = Vec::with_capacity(args.len());

    for arg in args {
        let expanded = expand_env_var_in_string(arg);
        let mut missing: Option<String> = None;
        let replaced = re.replace_all(&expanded, |caps: &regex::Captures| {
            let key = &caps[1];
            match arguments.get(key) {
                Some(value) if !value.is_null() => render_value(value),
                _ => {
                    missing.get_or_insert_with(|| key.to_string());
                    String::new()
                }
            }
        });
        if let Some(key) = missing {
            return Err(format!("Missing argument for placeholder {{{{{}}}}}", key));
        }
        rendered.push(replaced.into_owned());
    }

    Ok(rendered)
}

/// Run the command synchronously and return its trimmed stdout.
pub fn run_command(spec: &CommandSpec, arguments: &Map<String, Value>) -> Result<Value, String> {
    let start_time = Instant::now();
    let args = template_args(&spec.args, arguments)?;
    let env_vars = expand_env_vars(&spec.env);

    tracing::debug!(
        tool = %spec.tool_name,
        command = %spec.command,
        args = ?args,
        "running command tool"
    );

    let mut cmd = Command::new(&spec.command);
    cmd.args(&args)
        .envs(&env_vars)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if spec.stdin_json { Stdio::piped() } else { Stdio::null() });

    if let Some(ref dir) = spec.working_dir {
        cmd.current_dir(dir);
    }

    let payload = if spec.stdin_json {
        Some(
            serde_json::to_string(arguments)
                .map_err(|e| format!("Failed to serialize arguments: {}", e))?,
        )
    } else {
        None
    };

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("Failed to spawn '{}': {}", spec.command, e))?;

    if let (Some(payload), Some(mut stdin)) = (payload, child.stdin.take()) {
        if let Err(e) = stdin.write_all(payload.as_bytes()) {
            drop(stdin);
            // The child is still reaped so it does not linger as a zombie.
            let _ = child.kill();
            let _ = child.wait();
            return Err(format!("Failed to write to stdin: {}", e));
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    tracing::debug!(
        tool = %spec.tool_name,
        exit_code = output.status.code().unwrap_or(-1),
        duration_ms = start_time.elapsed().as_millis() as u64,
        output_size = output.stdout.len(),
        "command tool finished"
    );

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "Command exited with code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        ));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|e| format!("Command output is not valid UTF-8: {}", e))?;
    Ok(Value::String(stdout.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_template_args_substitutes_values() {
        let args = vec!["-n".to_string(), "{{count}}".to_string(), "{{ name }}!".to_string()];
        let rendered = template_args(&args, &args_map(json!({"count": 3, "name": "bob"}))).unwrap();
        assert_eq!(rendered, vec!["-n", "3", "bob!"]);
    }

    #[test]
    fn test_template_args_missing_value() {
        let args = vec!["{{path}}".to_string()];
        let err = template_args(&args, &Map::new()).unwrap_err();
        assert!(err.contains("{{path}}"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_captures_stdout() {
        let spec = CommandSpec {
            tool_name: "say".to_string(),
            command: "echo".to_string(),
            args: vec!["hello".to_string(), "{{who}}".to_string()],
            env: HashMap::new(),
            working_dir: None,
            stdin_json: false,
        };
        let result = run_command(&spec, &args_map(json!({"who": "world"}))).unwrap();
        assert_eq!(result, json!("hello world"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_reads_stdin_json() {
        let spec = CommandSpec {
            tool_name: "cat".to_string(),
            command: "cat".to_string(),
            args: vec![],
            env: HashMap::new(),
            working_dir: None,
            stdin_json: true,
        };
        let result = run_command(&spec, &args_map(json!({"x": 1}))).unwrap();
        assert_eq!(result, json!("{\"x\":1}"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_stdin_write_failure() {
        // `true` exits without reading, so a payload larger than the pipe
        // buffer cannot be delivered.
        let spec = CommandSpec {
            tool_name: "deaf".to_string(),
            command: "true".to_string(),
            args: vec![],
            env: HashMap::new(),
            working_dir: None,
            stdin_json: true,
        };
        let big = "x".repeat(4 * 1024 * 1024);
        let err = run_command(&spec, &args_map(json!({"blob": big}))).unwrap_err();
        assert!(err.starts_with("Failed to write to stdin"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_nonzero_exit() {
        let spec = CommandSpec {
            tool_name: "fail".to_string(),
            command: "false".to_string(),
            args: vec![],
            env: HashMap::new(),
            working_dir: None,
            stdin_json: false,
        };
        let err = run_command(&spec, &Map::new()).unwrap_err();
        assert!(err.contains("exited with code 1"));
    }
}
