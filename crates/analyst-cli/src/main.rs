mod noninteractive;
mod output;
mod repl;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "analyst", version, about = "Ask questions about your data from the terminal")]
struct Cli {
    /// Non-interactive mode: ask one question and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Working directory (where analyst.json is looked up)
    #[arg(short = 'c', long = "cwd")]
    working_dir: Option<PathBuf>,

    /// Output format for non-interactive mode
    #[arg(short = 'f', long, default_value = "text")]
    output_format: OutputFormat,

    /// Suppress progress indicators
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Resume a session by ID
    #[arg(long)]
    session: Option<String>,

    /// Analysis service URL (overrides config)
    #[arg(long, env = "ANALYST_API_URL")]
    url: Option<String>,

    /// Print the session list and exit
    #[arg(long)]
    list_sessions: bool,

    /// Print the tables of the current dataset and exit
    #[arg(long)]
    tables: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = analyst_core::config::load_config(cli.working_dir.clone())?;
    if let Some(url) = cli.url {
        config.base_url = url;
        config.validate()?;
    }
    config.debug |= cli.debug;
    tracing::debug!(api_root = %config.api_root(), "configuration loaded");

    let backend = analyst_client::create_backend(&config)?;
    let mut engine = analyst_engine::Engine::new(backend, config);

    if cli.list_sessions {
        engine.refresh_sessions().await?;
        output::print_sessions(engine.state().sessions().list(), None);
        return Ok(());
    }
    if cli.tables {
        let tables = engine.list_tables().await?;
        output::print_tables(&tables);
        return Ok(());
    }

    if let Some(prompt) = cli.prompt {
        noninteractive::run(engine, cli.session, prompt, cli.output_format, cli.quiet).await
    } else {
        repl::run(engine, cli.session).await
    }
}
