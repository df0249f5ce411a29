//! `whisperer`: ingest a repository, then search it or ask questions about it.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use whisperer_retrieval::{RetrievalConfig, RetrievalPipeline};

#[derive(Parser, Debug)]
#[command(name = "whisperer", version, about = "Ask grounded questions about a local repository")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding stored contexts.
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// Print machine-readable JSON where supported.
    #[arg(long, global = true)]
    json: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk, chunk and embed a repository into a named context.
    Ingest {
        path: String,
        /// Context name (defaults to the directory name).
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the fragments of a context most similar to a query.
    Search {
        context: String,
        query: String,
        /// Number of fragments to return.
        #[arg(short)]
        k: Option<usize>,
    },
    /// Answer a question from a context, streaming the reply.
    Ask { context: String, question: String },
    /// Manage stored contexts.
    Contexts {
        #[command(subcommand)]
        action: ContextsAction,
    },
}

#[derive(Subcommand, Debug)]
enum ContextsAction {
    /// List stored contexts.
    List,
    /// Delete a stored context.
    Delete { name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(commands::exit_code(&err))
        }
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RetrievalConfig::load(path)?,
        None => RetrievalConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let top_k = config.query.top_k;
    let pipeline = RetrievalPipeline::new(config).await?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Ingest { path, name } => {
            commands::ingest(&pipeline, &path, name.as_deref(), cli.json, &mut out).await
        }
        Commands::Search { context, query, k } => {
            commands::search(
                &pipeline,
                &context,
                &query,
                k.unwrap_or(top_k),
                cli.json,
                &mut out,
            )
            .await
        }
        Commands::Ask { context, question } => {
            commands::ask(&pipeline, &context, &question, &mut out).await
        }
        Commands::Contexts { action } => match action {
            ContextsAction::List => commands::list_contexts(&pipeline, cli.json, &mut out).await,
            ContextsAction::Delete { name } => {
                commands::delete_context(&pipeline, &name, &mut out).await
            }
        },
    }
}
