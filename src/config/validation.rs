use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

fn env_var_regex() -> &'static Regex {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"))
}

/// Expand environment variables in a string using ${VAR_NAME} syntax.
/// Unset variables are left as written.
pub fn expand_env_var_in_string(value: &str) -> String {
    env_var_regex()
        .replace_all(value, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expand environment variables in a HashMap
pub fn expand_env_vars(env: &HashMap<String, String>) -> HashMap<String, String> {
    env.iter()
        .map(|(key, value)| (key.clone(), expand_env_var_in_string(value)))
        .collect()
}

/// Expand `${VAR}` references and a leading `~` into a path.
pub fn expand_path(value: &str) -> PathBuf {
    let expanded = expand_env_var_in_string(value);
    if expanded == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(rest) = expanded.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(expanded)
}
