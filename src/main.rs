mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use papervec::config::PapervecConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "papervec", version, about = "Embedding index builder for paper abstracts")]
struct Cli {
    /// Config file (default: ~/.papervec/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed the corpus and write the vector matrix and metadata index
    Build(cli::build::BuildArgs),
    /// Embed a single query into the corpus vector space
    Query(cli::query::QueryArgs),
    /// Convert the JSON-lines metadata snapshot into the input CSV
    Convert {
        /// Snapshot file, one JSON object per line
        input: PathBuf,
        /// CSV file to write
        output: PathBuf,
    },
    /// Check that a store's vectors and metadata are row-aligned
    Verify {
        /// Store directory (default: configured output_dir)
        dir: Option<PathBuf>,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the configured model to the model cache
    Download(cli::ModelArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = match &cli.config {
        Some(path) => PapervecConfig::load_from(path)?,
        None => PapervecConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.log.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build(args) => cli::build::build(config, args).await?,
        Command::Query(args) => cli::query::query(config, args).await?,
        Command::Convert { input, output } => cli::convert::convert(&input, &output)?,
        Command::Verify { dir } => cli::verify::verify(&config, dir)?,
        Command::Model { action } => match action {
            ModelAction::Download(args) => {
                let mut config = config;
                args.apply(&mut config.embedding);
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
