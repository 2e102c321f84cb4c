//! SafeSpace CLI
//!
//! Operator tool for the SafeSpace backend: inspect the keyword list, try
//! masking on a document, and drive focus mode.

mod mask;
mod remote;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ss_background::BackgroundConfig;

#[derive(Parser)]
#[command(name = "ss-cli")]
#[command(about = "SafeSpace moderation and focus-mode tools")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "SAFESPACE_BACKEND")]
    backend: Option<String>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the backend keyword list and show the compiled pattern
    Keywords {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mask keywords in a text document
    Mask {
        /// Input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Keywords to use instead of the backend list
        #[arg(short, long)]
        keyword: Vec<String>,

        /// Page URL attached to reports
        #[arg(long, default_value = "file://local")]
        url: String,

        /// Print the masked document as HTML
        #[arg(long)]
        html: bool,
    },

    /// Drive focus mode
    Focus {
        #[command(subcommand)]
        action: FocusAction,
    },

    /// Check whether the current focus state blocks a URL
    Check {
        /// URL to check
        url: String,
    },
}

#[derive(Subcommand)]
pub enum FocusAction {
    /// Start focus mode
    Start {
        /// Sites to block
        #[arg(required = true)]
        sites: Vec<String>,
    },
    /// Stop focus mode
    Stop,
    /// Show focus status
    Status,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = load_config(cli.config.as_ref(), cli.backend).and_then(|config| match cli.command {
        Commands::Keywords { json } => remote::cmd_keywords(&config, json),
        Commands::Mask { input, keyword, url, html } => {
            mask::cmd_mask(&config, input.as_deref(), &keyword, &url, html)
        }
        Commands::Focus { action } => remote::cmd_focus(&config, action),
        Commands::Check { url } => remote::cmd_check(&config, &url),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>, backend: Option<String>) -> Result<BackgroundConfig, String> {
    let mut config = match path {
        Some(path) => BackgroundConfig::from_file(path).map_err(|e| e.to_string())?,
        None => BackgroundConfig::default(),
    };
    if let Some(backend) = backend {
        config.backend_url = backend;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start tokio runtime: {}", e))
}
