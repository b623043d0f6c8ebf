pub mod builtins;
pub mod command;
pub mod executor;
pub mod manifest;
pub mod registry;
pub mod schema;

pub use builtins::BuiltinSource;
pub use executor::{coerce, ToolExecutor};
pub use manifest::ManifestDirSource;
pub use registry::{format_tools_for_llm, tools_as_prompt_text, Tool, ToolBuilder, ToolCatalog, ToolSource};
pub use schema::{ParameterSpec, SchemaType, ToolDefinition};
