use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "oti")]
#[command(about = "Ask a local Ollama model, letting it call your tools", long_about = None)]
pub struct Args {
    #[arg(
        short = 'c',
        long = "chat",
        help = "Use the persisted conversation instead of a single raw prompt"
    )]
    pub chat: bool,

    #[arg(
        short = 'i',
        long = "interactive",
        help = "Start an interactive chat session (type 'exit' to quit)"
    )]
    pub interactive: bool,

    #[arg(long = "clear", help = "Clear the stored conversation history")]
    pub clear_history: bool,

    #[arg(long = "list-tools", help = "Print the tool schemas sent to the model")]
    pub list_tools: bool,

    #[arg(long = "no-tools", help = "Do not offer tools to the model")]
    pub no_tools: bool,

    #[arg(short = 'm', long = "model", help = "Model name (e.g. llama3.2)")]
    pub model: Option<String>,

    #[arg(long = "host", help = "Ollama base URL (e.g. http://127.0.0.1:11434)")]
    pub host: Option<String>,

    #[arg(long = "think", help = "Ask the model to think before answering")]
    pub think: bool,

    #[arg(short = 'v', long = "verbose", help = "Show tool calls and debug logging")]
    pub verbose: bool,

    #[arg(help = "Prompt to send to the model")]
    pub prompt: Vec<String>,
}
