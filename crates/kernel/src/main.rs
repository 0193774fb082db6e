//! Faciles command-line tool.
//!
//! Exports pages from a source site, transfers their images, imports them
//! as login-restricted templates, and seeds starter and demo content.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use faciles_kernel::cli::{self, CliContext};
use faciles_kernel::config::Config;
use faciles_kernel::transfer::starter::STARTER_SLUGS;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export pages from the source site into pages_data.json.
    ExportPages {
        /// Source page ids.
        #[arg(long, num_args = 1.., required = true)]
        ids: Vec<String>,
    },

    /// Download the images referenced by exported pages.
    DownloadImages,

    /// Import downloaded images into the local media store.
    ImportImages,

    /// Import exported pages under the templates index.
    ImportPages {
        /// Drop unmapped references instead of failing the page.
        #[arg(long)]
        lenient: bool,
    },

    /// Create starter pages (home, legal notice, accessibility statement).
    CreateStarterPages {
        /// Slugs of the pages to create (default: all).
        #[arg(long, num_args = 1.., value_parser = clap::builder::PossibleValuesParser::new(STARTER_SLUGS.iter().copied()))]
        slug: Vec<String>,
    },

    /// Create a page showing one block of every type.
    CreateDemoPages,

    /// Print the plain text of a page or body JSON file.
    ExtractText {
        file: PathBuf,

        /// Truncate to this many words.
        #[arg(long)]
        max_words: Option<usize>,
    },

    /// Print a block catalog schema as JSON.
    DescribeSchema {
        #[arg(long, default_value = "common")]
        catalog: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        staging = %config.page_templates_dir.display(),
        database = config.database_url.is_some(),
        "Configuration loaded"
    );

    let mut ctx = CliContext::new(config);
    match args.command {
        Command::ExportPages { ids } => cli::cmd_export_pages(&ctx, &ids).await,
        Command::DownloadImages => cli::cmd_download_images(&ctx).await,
        Command::ImportImages => cli::cmd_import_images(&mut ctx).await,
        Command::ImportPages { lenient } => cli::cmd_import_pages(&mut ctx, lenient).await,
        Command::CreateStarterPages { slug } => {
            cli::cmd_create_starter_pages(&mut ctx, &slug).await
        }
        Command::CreateDemoPages => cli::cmd_create_demo_pages(&mut ctx).await,
        Command::ExtractText { file, max_words } => {
            cli::cmd_extract_text(&ctx, &file, max_words).await
        }
        Command::DescribeSchema { catalog } => cli::cmd_describe_schema(&ctx, &catalog),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
