mod output;

pub use output::{display_content, display_error, display_tool_call, display_tool_result};
