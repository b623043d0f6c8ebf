mod filesystem;

pub use filesystem::{read_transcript, write_transcript};

use crate::error::Result;
use crate::models::{Message, Role};
use serde_json::Value;
use std::path::Path;

/// Append-only conversation transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Save the whole transcript. This overwrites any content at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_transcript(path, &self.messages)
    }

    /// Extend the transcript with the messages stored at `path`.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let stored = read_transcript(path)?;
        tracing::debug!(file = %path.display(), count = stored.len(), "loaded chat history");
        self.messages.extend(stored);
        Ok(())
    }

    /// Empty the transcript and, when given, the file at `path`.
    pub fn clear(&mut self, path: Option<&Path>) -> Result<()> {
        self.messages.clear();
        if let Some(path) = path {
            write_transcript(path, &[])?;
        }
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn by_role(&self, role: Role) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.role == role)
            .cloned()
            .collect()
    }

    pub fn user(&self) -> Vec<Message> {
        self.by_role(Role::User)
    }

    pub fn assistant(&self) -> Vec<Message> {
        self.by_role(Role::Assistant)
    }

    pub fn system(&self) -> Vec<Message> {
        self.by_role(Role::System)
    }

    pub fn tool(&self) -> Vec<Message> {
        self.by_role(Role::Tool)
    }

    /// The transcript in its serialized form.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.messages).unwrap_or_else(|_| Value::Array(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_views_keep_order() {
        let mut history = ConversationHistory::new();
        history.append(Message::user("one"));
        history.append(Message::assistant(Some("reply".to_string()), None));
        history.append(Message::user("two"));
        history.append(Message::tool("add", "3"));

        let users: Vec<String> = history
            .user()
            .into_iter()
            .filter_map(|m| m.content)
            .collect();
        assert_eq!(users, vec!["one", "two"]);
        assert_eq!(history.tool().len(), 1);
        assert_eq!(history.system().len(), 0);
        assert_eq!(history.assistant().len(), 1);
    }

    #[test]
    fn test_clear_without_path() {
        let mut history = ConversationHistory::new();
        history.append(Message::user("hi"));
        history.clear(None).unwrap();
        assert!(history.is_empty());
    }
}
