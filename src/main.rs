//! graph-ide CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "graph-ide")]
#[command(about = "Dependency graph and architecture model for TypeScript/JavaScript projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the six-stage architecture analysis
    Analyze {
        /// Discard cached stages and recompute everything
        #[arg(short, long)]
        force: bool,

        /// Directory of canned classification responses (implies the static provider)
        #[arg(long)]
        responses: Option<PathBuf>,

        /// Classification provider, overriding graph-ide.toml
        #[arg(long)]
        provider: Option<String>,

        /// Also generate descriptions for symbols without JSDoc
        #[arg(long)]
        describe: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract symbols and symbol-level edges only
    Extract {
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show which pipeline stages are cached and valid
    Status,
    /// Clear the cache
    Clear {
        /// Only clear this stage (1-6) and the stages downstream of it
        #[arg(long)]
        step: Option<u8>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("graph_ide={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("graph-ide v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Project root: {}", cli.root.display());

    match cli.command {
        Commands::Analyze {
            force,
            responses,
            provider,
            describe,
            output,
        } => {
            let options = commands::AnalyzeOptions {
                force,
                responses,
                provider,
                describe,
                output,
            };
            commands::analyze(cli.root, options).await
        }
        Commands::Extract { output } => commands::extract(cli.root, output),
        Commands::Status => commands::status(cli.root),
        Commands::Clear { step } => commands::clear(cli.root, step),
        Commands::Version => {
            println!("graph-ide v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
