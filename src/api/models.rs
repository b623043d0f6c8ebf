use serde::Serialize;
use serde_json::Value;

use crate::models::Message;

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub think: bool,
    pub tools: &'a [Value],
    pub stream: bool,
}

#[derive(Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: String,
    pub stream: bool,
    pub think: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub raw: bool,
}
