//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Routed assistant: classify each message, then answer, translate or refuse
///
/// Works with any OpenAI-compatible endpoint (OpenAI, OpenRouter, Ollama,
/// LM Studio).
#[derive(Parser, Debug)]
#[command(name = "agentflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute (defaults to `chat`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to use instead of the default search path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Language for answers and refusals (overrides the config file)
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    /// Language translation requests are translated into
    #[arg(short, long, global = true)]
    pub target_language: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Send a single message and print the answer
    Ask {
        /// The message to send
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration (API key masked)
    Show,

    /// Write a default configuration file
    Init {
        /// Where to write it (default: ~/.config/agentflow/agentflow.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
