use ollama_terminal::tools::manifest::discover_manifests;
use ollama_terminal::tools::{
    format_tools_for_llm, BuiltinSource, ManifestDirSource, SchemaType, ToolCatalog, ToolExecutor,
    ToolSource,
};
use ollama_terminal::AppError;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) {
    if let Some(parent) = dir.join(name).parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(dir.join(name), contents).unwrap();
}

fn catalog_from(dir: &Path) -> ToolCatalog {
    let manifests = ManifestDirSource::new(dir);
    let sources: [&dyn ToolSource; 1] = [&manifests];
    ToolCatalog::from_sources(&sources).unwrap()
}

#[test]
fn test_broken_manifest_does_not_hide_others() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "broken.yaml", "tools: [ {name: oops");
    write(
        temp_dir.path(),
        "good.yaml",
        r#"
tools:
  - name: shout
    command: echo
    args: ["{{text}}"]
    stdin_json: false
    parameters:
      - name: text
        type: str
"#,
    );

    let catalog = catalog_from(temp_dir.path());
    assert_eq!(catalog.names(), vec!["shout"]);
}

#[test]
fn test_malformed_tool_is_skipped_individually() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "tools.yaml",
        r#"
tools:
  - name: missing_command
  - name: ok
    command: "true"
"#,
    );

    let catalog = catalog_from(temp_dir.path());
    assert_eq!(catalog.names(), vec!["ok"]);
}

#[test]
fn test_parameter_types_and_choices() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "tools.json",
        r#"{"tools": [{
            "name": "resize",
            "description": "Resize an image.",
            "command": "resize",
            "parameters": [
                {"name": "path", "type": "str"},
                {"name": "scale", "type": "complex"},
                {"name": "format", "enum": ["png", "jpg", "png"], "default": "png"},
                {"name": "quality", "type": "int", "default": "high"}
            ]
        }]}"#,
    );

    let catalog = catalog_from(temp_dir.path());
    let definition = &catalog.get("resize").unwrap().definition;

    assert_eq!(definition.parameter("path").unwrap().schema_type, SchemaType::String);
    // Unknown annotations fall back to string.
    assert_eq!(definition.parameter("scale").unwrap().schema_type, SchemaType::String);

    let format = definition.parameter("format").unwrap();
    assert_eq!(format.enum_values, Some(vec!["png".to_string(), "jpg".to_string()]));
    assert_eq!(format.default, Some(json!("png")));

    let quality = definition.parameter("quality").unwrap();
    assert!(!quality.required);
    assert_eq!(quality.default, Some(Value::Null));

    assert_eq!(definition.required_names(), vec!["path", "scale"]);
}

#[test]
fn test_skipped_directories_are_not_scanned() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = "tools:\n  - name: NAME\n    command: \"true\"\n";
    write(temp_dir.path(), "nested/deep/kept.yaml", &manifest.replace("NAME", "kept"));
    write(temp_dir.path(), "target/a.yaml", &manifest.replace("NAME", "in_target"));
    write(temp_dir.path(), "__pycache__/b.yaml", &manifest.replace("NAME", "in_cache"));
    write(temp_dir.path(), ".hidden/c.yaml", &manifest.replace("NAME", "hidden"));
    write(temp_dir.path(), "notes.txt", &manifest.replace("NAME", "not_a_manifest"));

    let catalog = catalog_from(temp_dir.path());
    assert_eq!(catalog.names(), vec!["kept"]);
}

#[cfg(unix)]
#[test]
fn test_directory_symlink_loops_are_not_followed() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "nested/tools.yaml",
        "tools:\n  - name: once\n    command: \"true\"\n",
    );
    std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("nested/back_to_root")).unwrap();
    std::os::unix::fs::symlink(temp_dir.path().join("nested"), temp_dir.path().join("loop")).unwrap();

    let found = discover_manifests(temp_dir.path()).unwrap();
    assert_eq!(found, vec![temp_dir.path().join("nested/tools.yaml")]);

    let catalog = catalog_from(temp_dir.path());
    assert_eq!(catalog.names(), vec!["once"]);
}

#[test]
fn test_missing_and_non_directory_roots() {
    let temp_dir = TempDir::new().unwrap();
    let missing = ManifestDirSource::new(temp_dir.path().join("nope"));
    assert!(matches!(missing.load(), Err(AppError::PathNotFound(_))));

    write(temp_dir.path(), "file.yaml", "tools: []");
    let file = ManifestDirSource::new(temp_dir.path().join("file.yaml"));
    assert!(matches!(file.load(), Err(AppError::NotADirectory(_))));
}

#[test]
fn test_builtins_take_precedence_over_manifests() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "add.yaml",
        "tools:\n  - name: add\n    command: \"false\"\n",
    );

    let manifests = ManifestDirSource::new(temp_dir.path());
    let sources: [&dyn ToolSource; 2] = [&BuiltinSource, &manifests];
    let executor = ToolExecutor::new(ToolCatalog::from_sources(&sources).unwrap());

    assert_eq!(executor.execute("add", &args(json!({"a": 1, "b": 2}))), "3.0");
}

#[test]
fn test_builtin_wire_schema() {
    let sources: [&dyn ToolSource; 1] = [&BuiltinSource];
    let catalog = ToolCatalog::from_sources(&sources).unwrap();
    let schemas = format_tools_for_llm(&catalog);

    let add = schemas
        .iter()
        .find(|s| s["function"]["name"] == "add")
        .unwrap();
    assert_eq!(add["type"], "function");
    assert_eq!(
        add["function"]["parameters"],
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "b": {"type": "number", "default": 5.0}
            },
            "required": ["a"]
        })
    );
}

#[cfg(unix)]
#[test]
fn test_manifest_tool_runs_command() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "tools.yaml",
        r#"
tools:
  - name: greet
    command: echo
    args: ["hello", "{{who}}", "x{{times}}"]
    stdin_json: false
    parameters:
      - name: who
        type: str
      - name: times
        type: int
        default: 2
  - name: always_fails
    command: "false"
    stdin_json: false
"#,
    );

    let executor = ToolExecutor::new(catalog_from(temp_dir.path()));

    assert_eq!(executor.execute("greet", &args(json!({"who": "world"}))), "hello world x2");
    assert_eq!(
        executor.execute("greet", &args(json!({"who": "you", "times": "3"}))),
        "hello you x3"
    );

    let failure = executor.execute("always_fails", &Map::new());
    assert!(failure.starts_with("Tool \"always_fails\" failed with error Command exited with code 1"));
    assert!(failure.ends_with("Arguments: {}"));
}
