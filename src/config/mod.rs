pub mod defaults;
mod validation;

use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub use validation::{expand_env_var_in_string, expand_env_vars, expand_path};

use defaults::{
    default_history_file, default_host, default_model, default_root_dir, default_tools_dir,
    default_tools_enabled,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub think: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub history_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_tools_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tools_enabled(),
            directory: None,
        }
    }
}

/// Contents of a config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub model: String,
    pub think: bool,
    pub verbose: bool,
    pub tools_enabled: bool,
    pub system_prompt: Option<String>,
    pub root_dir: PathBuf,
    pub history_file: String,
    pub tools_dir: String,
    pub request_timeout: Option<Duration>,
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self, String> {
        let file_config = FileConfig::load().map_err(|e| format!("{:#}", e))?;
        Ok(Self::resolve(args, file_config))
    }

    /// Precedence: CLI args > environment > config file > defaults.
    pub fn resolve(args: &Args, file_config: FileConfig) -> Self {
        let host = args
            .host
            .clone()
            .or_else(|| env::var("OTI_HOST").ok())
            .or(file_config.server.host)
            .unwrap_or_else(default_host);

        let model = args
            .model
            .clone()
            .or_else(|| env::var("OTI_MODEL").ok())
            .or(file_config.model.default_model)
            .unwrap_or_else(default_model);

        let think = args.think
            || env_flag("OTI_THINK")
                .or(file_config.model.think)
                .unwrap_or(false);

        let verbose = args.verbose
            || env_flag("OTI_VERBOSE")
                .or(file_config.session.verbose)
                .unwrap_or(false);

        let tools_enabled = !args.no_tools && file_config.tools.enabled;

        let system_prompt = env::var("OTI_SYSTEM_PROMPT")
            .ok()
            .or(file_config.model.system_prompt);

        let root_dir = env::var("OTI_ROOT")
            .ok()
            .or(file_config.session.root_dir)
            .unwrap_or_else(default_root_dir);

        Config {
            host,
            model,
            think,
            verbose,
            tools_enabled,
            system_prompt,
            root_dir: expand_path(&root_dir),
            history_file: file_config
                .session
                .history_file
                .unwrap_or_else(default_history_file),
            tools_dir: file_config.tools.directory.unwrap_or_else(default_tools_dir),
            request_timeout: file_config.server.request_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn history_path(&self) -> PathBuf {
        self.root_dir.join(expand_path(&self.history_file))
    }

    /// An absolute tools directory is used as is; a relative one lives under the root.
    pub fn tools_path(&self) -> PathBuf {
        self.root_dir.join(expand_path(&self.tools_dir))
    }
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

                let is_yaml = matches!(
                    path.extension().and_then(|s| s.to_str()),
                    Some("yaml") | Some("yml")
                );
                let config: FileConfig = if is_yaml {
                    serde_yaml::from_str(&contents).with_context(|| {
                        format!("Failed to parse YAML config file: {}", path.display())
                    })?
                } else {
                    serde_json::from_str(&contents).with_context(|| {
                        format!("Failed to parse JSON config file: {}", path.display())
                    })?
                };

                return Ok(config);
            }
        }

        Ok(FileConfig::default())
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".ollama-terminal.yaml"),
            PathBuf::from(".ollama-terminal.yml"),
            PathBuf::from(".ollama-terminal.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let config_dir = config_dir.join("ollama-terminal");
            paths.push(config_dir.join("config.yaml"));
            paths.push(config_dir.join("config.yml"));
            paths.push(config_dir.join("config.json"));
        }

        paths
    }
}
