//! arXiv Agent CLI: search arXiv from the terminal or run the HTTP service.

mod commands;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// arXiv Agent: browse arXiv by author or by daily category submissions
#[derive(Parser, Debug)]
#[command(name = "arxiv-agent", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (for `.arxiv-agent/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory for profiles, cache and history
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Search papers by author name
    Author {
        /// Author name, e.g. "Geoffrey Hinton"
        name: String,
        /// Number of results (1-100)
        #[arg(short = 'n', long, default_value_t = 10, allow_negative_numbers = true)]
        max_results: i64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Browse recent submissions by category
    Daily {
        /// Category code, repeatable (e.g. -c cs.AI -c stat.ML)
        #[arg(short = 'c', long = "category")]
        categories: Vec<String>,
        /// Date range in arXiv syntax, e.g. "[now-7d TO now]"
        #[arg(short, long)]
        date_range: Option<String>,
        /// Apply this user's hidden categories
        #[arg(short, long)]
        user: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Manage hidden categories for a user
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Show recent searches
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Result display options shared by search commands.
#[derive(clap::Args, Debug, Clone, Default)]
struct OutputArgs {
    /// Sort by: published, updated, title
    #[arg(short, long)]
    sort: Option<String>,
    /// Sort order: asc, desc
    #[arg(short, long)]
    order: Option<String>,
    /// Print raw JSON instead of a listing
    #[arg(long)]
    json: bool,
    /// Print the request URL without fetching
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ProfileAction {
    /// Show a profile
    Show { user_id: String },
    /// Create or update a profile
    Set {
        user_id: String,
        /// Research interest, repeatable
        #[arg(short, long = "interest")]
        interests: Vec<String>,
        /// Favorite author, repeatable
        #[arg(short, long = "author")]
        authors: Vec<String>,
        /// Saved paper id, repeatable
        #[arg(short, long = "save")]
        saved: Vec<String>,
        /// Replace existing lists instead of appending
        #[arg(long)]
        replace: bool,
    },
    /// List stored profile ids
    List,
}

#[derive(clap::Subcommand, Debug)]
enum CategoryAction {
    /// Show hidden categories
    Show { user_id: String },
    /// Hide categories from daily browsing
    Hide {
        user_id: String,
        #[arg(required = true)]
        categories: Vec<String>,
    },
    /// Unhide categories
    Unhide {
        user_id: String,
        #[arg(required = true)]
        categories: Vec<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default workspace configuration file
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("org", "arxiv-agent", "arxiv-agent")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "arxiv-agent.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config =
        arxiv_agent_core::config::load_config(Some(&workspace), cli.config.as_deref(), None)
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    commands::handle_command(cli.command, config, &workspace).await
}
