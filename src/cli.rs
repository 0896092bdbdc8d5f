use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "msgtap",
    about = "Tap requests and replies flowing through an RPC service host",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/msgtap/logs/msgtap.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to msgtap.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run calls through the configured host with the tap attached
    Simulate {
        /// Endpoint to call (defaults to the first configured endpoint)
        #[arg(long, short = 'e')]
        endpoint: Option<String>,

        /// Request message text
        #[arg(long, default_value = "REQ")]
        request: String,

        /// Reply message text
        #[arg(long, default_value = "RESP")]
        reply: String,

        /// Make the call one-way (no reply)
        #[arg(long)]
        one_way: bool,

        /// YAML file with a list of calls to replay instead
        #[arg(long, conflicts_with_all = ["endpoint", "one_way"])]
        script: Option<PathBuf>,

        /// Output format for the summary (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Tail the tap log
    Observe {
        /// Only show inbound, outbound, dir:<in|out|request|reply>, or a matching endpoint
        #[arg(long, short = 'f')]
        filter: Option<String>,

        /// Show the last N events before tailing
        #[arg(long, short = 'n', default_value = "10")]
        last: usize,

        /// Print message bodies
        #[arg(long)]
        message: bool,
    },

    /// List registered behavior extensions
    Extensions {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },

    /// Print where the config file is read from
    Path,
}
