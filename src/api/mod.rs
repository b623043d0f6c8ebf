pub mod client;
pub mod models;
pub mod response;

pub use client::OllamaClient;
pub use models::{ChatRequest, GenerateRequest};

use crate::error::Result;
use crate::models::Message;
use serde_json::Value;

/// Single-turn access to the language model.
pub trait ModelGateway {
    /// Complete a single prompt. With `raw`, `tools` must be given and is
    /// embedded in the prompt text.
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        tools: Option<&str>,
        think: bool,
        raw: bool,
    ) -> Result<Message>;

    /// Continue a multi-turn conversation.
    fn chat(&self, model: &str, messages: &[Message], tools: &[Value], think: bool) -> Result<Message>;
}
