use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ModelGateway;
use crate::error::{AppError, Result};
use crate::history::ConversationHistory;
use crate::models::{Message, ToolCallRequest};
use crate::tools::{format_tools_for_llm, tools_as_prompt_text, ToolExecutor};
use crate::ui::{display_tool_call, display_tool_result};

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub think: bool,
    pub tools_enabled: bool,
    /// Print tool calls and results as they happen.
    pub show_tools: bool,
}

/// Drives one conversation: user turn, model turn, optional tool-call turn and
/// a single follow-up model turn, persisting the transcript after each
/// completed exchange.
pub struct Orchestrator<G: ModelGateway> {
    gateway: G,
    executor: ToolExecutor,
    history: ConversationHistory,
    history_path: PathBuf,
    settings: ChatSettings,
}

pub fn tool_reminder(prompt: &str) -> String {
    format!(
        "Use the output of the previous tool calls to answer the original prompt: \"{}\".",
        prompt
    )
}

pub fn end_of_session_notice(elapsed: Duration) -> String {
    format!(
        "End of Session. Session lasted {:.2} seconds. Do not refer to past sessions unless explicitly stated.",
        elapsed.as_secs_f64()
    )
}

impl<G: ModelGateway> Orchestrator<G> {
    pub fn new(
        gateway: G,
        executor: ToolExecutor,
        history: ConversationHistory,
        history_path: impl Into<PathBuf>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            gateway,
            executor,
            history,
            history_path: history_path.into(),
            settings,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    fn tool_schemas(&self) -> Vec<Value> {
        if self.settings.tools_enabled {
            format_tools_for_llm(self.executor.catalog())
        } else {
            Vec::new()
        }
    }

    fn model_turn(&mut self, tools: &[Value]) -> Result<Message> {
        let reply = self.gateway.chat(
            &self.settings.model,
            self.history.messages(),
            tools,
            self.settings.think,
        )?;
        self.history.append(reply.clone());
        Ok(reply)
    }

    /// Run each requested call in order, appending one tool message per call.
    fn tool_call_turn(&mut self, calls: &[ToolCallRequest]) {
        for call in calls {
            if self.settings.show_tools {
                display_tool_call(call.name(), call.arguments());
            }
            let result = self.executor.execute(call.name(), call.arguments());
            if self.settings.show_tools {
                display_tool_result(call.name(), &result);
            }
            self.history.append(Message::tool(call.name(), result));
        }
    }

    /// One full exchange over the persisted conversation.
    ///
    /// A request-level error from the model server on the first model turn is
    /// returned as the reply text instead of an error; nothing is persisted in
    /// that case.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        self.history.append(Message::user(prompt));
        let tools = self.tool_schemas();

        let mut reply = match self.model_turn(&tools) {
            Ok(reply) => reply,
            Err(e @ AppError::ApiError { .. }) => {
                tracing::warn!("model request failed: {}", e);
                return Ok(format!("Unable to query AI, {}", e));
            }
            Err(e) => return Err(e),
        };

        if reply.has_tool_calls() {
            let calls = reply.tool_calls.clone().unwrap_or_default();
            tracing::debug!(count = calls.len(), "model requested tool calls");
            self.tool_call_turn(&calls);
            self.history.append(Message::system(tool_reminder(prompt)));
            reply = self.model_turn(&tools)?;
        }

        self.history.save(&self.history_path)?;
        Ok(reply.content.unwrap_or_default())
    }

    /// Single raw prompt with the tool schemas embedded in the prompt text.
    /// The conversation is neither read nor written.
    pub fn ask_once(&self, prompt: &str) -> Result<String> {
        let tools_text = if self.settings.tools_enabled {
            Some(tools_as_prompt_text(self.executor.catalog()))
        } else {
            None
        };
        let raw = tools_text.is_some();

        let reply = self.gateway.generate(
            &self.settings.model,
            prompt,
            tools_text.as_deref(),
            self.settings.think,
            raw,
        )?;
        Ok(reply.content.unwrap_or_default())
    }

    /// Add the session's system prompt, if any.
    pub fn start_session(&mut self, system_prompt: Option<&str>) {
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            self.history.append(Message::system(prompt));
        }
    }

    /// Record the end of an interactive session and persist the transcript.
    pub fn end_session(&mut self, elapsed: Duration) -> Result<()> {
        self.history
            .append(Message::system(end_of_session_notice(elapsed)));
        self.history.save(&self.history_path)
    }
}
