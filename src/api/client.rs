use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::models::{ChatRequest, GenerateRequest};
use super::response::{extract_error, format_raw_prompt, parse_chat_response, parse_generate_response};
use super::ModelGateway;
use crate::error::{AppError, Result};
use crate::models::Message;

const GENERATE_ROUTE: &str = "/api/generate";
const CHAT_ROUTE: &str = "/api/chat";

/// Blocking client for a local Ollama server.
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// `timeout` of `None` waits for the model indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post<B: Serialize>(&self, route: &str, body: &B) -> Result<Value> {
        let url = format!("{}{}", self.base_url, route);
        tracing::debug!(%url, "sending request");

        let response = self.client.post(&url).json(body).send()?;
        let status = response.status();
        tracing::debug!(%url, status = status.as_u16(), "received response");

        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ApiError {
                status: status.as_u16(),
                message: extract_error(&body),
            });
        }

        Ok(response.json::<Value>()?)
    }
}

impl ModelGateway for OllamaClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        tools: Option<&str>,
        think: bool,
        raw: bool,
    ) -> Result<Message> {
        let prompt = if raw {
            let tools = tools.ok_or_else(|| {
                AppError::InvalidArgument("You must provide tools for a raw prompt.".to_string())
            })?;
            format_raw_prompt(prompt, tools)
        } else {
            prompt.to_string()
        };

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            think,
            raw,
        };
        let response_json = self.post(GENERATE_ROUTE, &request)?;
        parse_generate_response(&response_json)
    }

    fn chat(&self, model: &str, messages: &[Message], tools: &[Value], think: bool) -> Result<Message> {
        let request = ChatRequest {
            model,
            messages,
            think,
            tools,
            stream: false,
        };
        let response_json = self.post(CHAT_ROUTE, &request)?;
        parse_chat_response(&response_json)
    }
}
