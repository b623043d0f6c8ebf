pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod ui;

pub use error::{AppError, Result};
pub use history::ConversationHistory;
pub use orchestrator::{ChatSettings, Orchestrator};
