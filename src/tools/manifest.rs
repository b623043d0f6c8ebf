//! Command-backed tools declared in manifest files.
//!
//! A manifest directory is scanned recursively; every `*.yaml`, `*.yml` or
//! `*.json` file is one source unit:
//!
//! ```yaml
//! tools:
//!   - name: disk_usage
//!     description: Report the size of a directory.
//!     command: du
//!     args: ["-sh", "{{path}}"]
//!     stdin_json: false
//!     parameters:
//!       - name: path
//!         type: str
//!       - name: unit
//!         enum: [kb, mb]
//!         default: kb
//! ```
//!
//! A parameter without `default` is required. Files that fail to parse and
//! tools that fail to build are skipped with a warning.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::command::{run_command, CommandSpec};
use super::registry::{Tool, ToolBuilder, ToolSource};
use super::schema::{ParameterSpec, SchemaType};
use crate::config::defaults::default_stdin_json;
use crate::error::{AppError, Result};

/// Directory names never descended into.
pub const SKIPPED_DIRS: &[&str] = &["target", "__pycache__", "node_modules"];

const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

#[derive(Debug, Deserialize)]
struct ToolManifest {
    #[serde(default)]
    tools: Vec<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default = "default_stdin_json")]
    pub stdin_json: bool,
    #[serde(default)]
    pub parameters: Vec<ManifestParameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestParameter {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default, rename = "enum")]
    pub choices: Option<Vec<String>>,
    /// `None` when the key is absent, `Some(Value::Null)` for an explicit null.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub default: Option<Value>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ManifestParameter {
    /// Derive the parameter spec; an unknown type falls back to string.
    pub fn to_spec(&self, tool_name: &str) -> ParameterSpec {
        let schema_type = match self.type_name.as_deref() {
            None => SchemaType::String,
            Some(annotation) => SchemaType::from_annotation(annotation).unwrap_or_else(|| {
                tracing::warn!(
                    tool = tool_name,
                    parameter = %self.name,
                    "unsupported type '{}', falling back to string",
                    annotation
                );
                SchemaType::String
            }),
        };

        let spec = match self.default {
            Some(ref default) => ParameterSpec::optional(self.name.clone(), schema_type, default.clone()),
            None => ParameterSpec::required(self.name.clone(), schema_type),
        };

        match self.choices {
            Some(ref choices) => spec.with_choices(choices.iter().cloned()),
            None => spec,
        }
    }
}

impl ManifestTool {
    /// `base_dir` is the directory of the manifest file; a relative
    /// `working_dir` is resolved against it.
    pub fn into_tool(self, base_dir: &Path) -> std::result::Result<Tool, String> {
        if self.command.trim().is_empty() {
            return Err(format!("Tool '{}' has an empty 'command'", self.name));
        }

        let mut builder =
            ToolBuilder::new(self.name.clone()).description(self.description.clone().unwrap_or_default());
        for param in &self.parameters {
            builder = builder.param(param.to_spec(&self.name));
        }

        let spec = CommandSpec {
            tool_name: self.name,
            command: self.command,
            args: self.args,
            env: self.env,
            working_dir: self.working_dir.map(|dir| base_dir.join(dir)),
            stdin_json: self.stdin_json,
        };

        builder.handler(move |arguments| run_command(&spec, arguments)).build()
    }
}

/// Parse one manifest file. Individual tools that are malformed are skipped.
pub fn load_manifest_file(path: &Path) -> Result<Vec<Tool>> {
    let contents = fs::read_to_string(path)?;
    let manifest: ToolManifest = serde_yaml::from_str(&contents)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tools = Vec::new();
    for (position, raw) in manifest.tools.into_iter().enumerate() {
        let parsed = serde_yaml::from_value::<ManifestTool>(raw)
            .map_err(|e| e.to_string())
            .and_then(|tool| tool.into_tool(base_dir));
        match parsed {
            Ok(tool) => tools.push(tool),
            Err(e) => tracing::warn!(
                file = %path.display(),
                position,
                "skipping malformed tool: {}",
                e
            ),
        }
    }

    Ok(tools)
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
        .unwrap_or(false)
}

fn is_manifest_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| MANIFEST_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// All manifest files under `root`, sorted by path.
pub fn discover_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir.as_path() == root => return Err(e.into()),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "cannot read directory: {}", e);
                continue;
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            // Symlinks are not followed into directories; a link back to an
            // ancestor would otherwise be scanned forever.
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cannot stat entry: {}", e);
                    continue;
                }
            };
            if file_type.is_dir() {
                if !is_skipped_dir(&path) {
                    pending.push(path);
                }
            } else if file_type.is_symlink() && path.is_dir() {
                tracing::debug!(path = %path.display(), "not following directory symlink");
            } else if is_manifest_file(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Tools declared in the manifests of a directory tree.
pub struct ManifestDirSource {
    root: PathBuf,
}

impl ManifestDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ToolSource for ManifestDirSource {
    fn label(&self) -> String {
        self.root.display().to_string()
    }

    fn load(&self) -> Result<Vec<Tool>> {
        if !self.root.exists() {
            return Err(AppError::PathNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(AppError::NotADirectory(self.root.clone()));
        }

        let mut tools = Vec::new();
        for path in discover_manifests(&self.root)? {
            match load_manifest_file(&path) {
                Ok(mut loaded) => tools.append(&mut loaded),
                Err(e) => tracing::warn!(file = %path.display(), "skipping tool manifest: {}", e),
            }
        }
        Ok(tools)
    }
}
