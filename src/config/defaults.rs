pub fn default_host() -> String {
    "http://127.0.0.1:11434".to_string()
}

pub fn default_model() -> String {
    "llama3.2".to_string()
}

pub fn default_root_dir() -> String {
    "~/OllamaTerminalIntegration".to_string()
}

pub fn default_history_file() -> String {
    "chat_history_cli.json".to_string()
}

pub fn default_tools_dir() -> String {
    "Tools".to_string()
}

pub fn default_tools_enabled() -> bool {
    true
}

pub fn default_stdin_json() -> bool {
    true
}
