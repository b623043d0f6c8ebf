use clap::Parser;
use colored::*;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use ollama_terminal::api::OllamaClient;
use ollama_terminal::cli::Args;
use ollama_terminal::config::Config;
use ollama_terminal::tools::{
    format_tools_for_llm, BuiltinSource, ManifestDirSource, ToolCatalog, ToolExecutor, ToolSource,
};
use ollama_terminal::ui::{display_content, display_error};
use ollama_terminal::{ChatSettings, ConversationHistory, Orchestrator, Result};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Create the root and tools directories and an empty history file.
fn bootstrap(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.root_dir)?;
    fs::create_dir_all(config.tools_path())?;

    let history_path = config.history_path();
    if !history_path.exists() {
        ConversationHistory::new().save(&history_path)?;
    }
    Ok(())
}

fn build_executor(tools_path: &Path) -> Result<ToolExecutor> {
    let manifests = ManifestDirSource::new(tools_path);
    let sources: [&dyn ToolSource; 2] = [&BuiltinSource, &manifests];
    let catalog = ToolCatalog::from_sources(&sources)?;
    tracing::debug!(tools = ?catalog.names(), "tool catalog ready");
    Ok(ToolExecutor::new(catalog))
}

fn run_interactive(orchestrator: &mut Orchestrator<OllamaClient>, system_prompt: Option<&str>) -> Result<()> {
    orchestrator.start_session(system_prompt);
    let session_start = Instant::now();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", ">>> ".bold());
        io::stdout().flush()?;

        let prompt = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let prompt = prompt.trim();
        if prompt == "exit" {
            println!("Goodbye!");
            break;
        }
        if prompt.is_empty() {
            continue;
        }

        match orchestrator.ask(prompt) {
            Ok(reply) => display_content(&format!("{} {}", "Assistant:".green(), reply)),
            Err(e) => display_error(&e.to_string()),
        }
    }

    orchestrator.end_session(session_start.elapsed())
}

fn run(args: Args, config: Config) -> Result<()> {
    bootstrap(&config)?;
    let history_path = config.history_path();

    if args.clear_history {
        ConversationHistory::new().clear(Some(&history_path))?;
        println!("{}", "Conversation history cleared.".green());
        return Ok(());
    }

    let executor = build_executor(&config.tools_path())?;

    if args.list_tools {
        let schemas = format_tools_for_llm(executor.catalog());
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }

    if !args.interactive && args.prompt.is_empty() {
        eprintln!("{}", "You must have a prompt!".red());
        eprintln!("{}", "Usage: oti [OPTIONS] <prompt>...".dimmed());
        process::exit(1);
    }

    let mut history = ConversationHistory::new();
    history.load(&history_path)?;

    let gateway = OllamaClient::new(&config.host, config.request_timeout)?;
    let settings = ChatSettings {
        model: config.model.clone(),
        think: config.think,
        tools_enabled: config.tools_enabled,
        show_tools: config.verbose,
    };
    tracing::debug!(model = %settings.model, host = %config.host, "starting");

    let mut orchestrator = Orchestrator::new(gateway, executor, history, history_path, settings);

    if args.interactive {
        return run_interactive(&mut orchestrator, config.system_prompt.as_deref());
    }

    let prompt = args.prompt.join(" ");
    let reply = if args.chat {
        orchestrator.ask(&prompt)?
    } else {
        orchestrator.ask_once(&prompt)?
    };
    display_content(&reply);
    Ok(())
}

fn main() {
    let args = Args::parse();

    let config = match Config::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            display_error(&e);
            process::exit(1);
        }
    };

    init_logging(config.verbose);

    if let Err(e) = run(args, config) {
        display_error(&e.to_string());
        process::exit(1);
    }
}
