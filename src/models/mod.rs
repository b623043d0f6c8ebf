mod message;
mod tool;

pub use message::{Message, Role};
pub use tool::{FunctionCall, ToolCallRequest};
